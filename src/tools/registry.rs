//! Tool registry and dispatcher for TaskClaw
//!
//! The registry maps tool names to implementations and schemas, normalizes
//! the name shapes models actually emit, validates arguments against the
//! declared schema, gates destructive tools behind safe-mode confirmation,
//! and converts every failure into a descriptive result string so the model
//! can self-correct in the next round.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::providers::ToolDefinition;

use super::{Tool, ToolContext};

/// A registry that holds, resolves and dispatches tools.
///
/// # Example
///
/// ```rust
/// use taskclaw::tools::{ToolRegistry, ToolContext, EchoTool};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let mut registry = ToolRegistry::new();
/// registry.register(Box::new(EchoTool));
///
/// let ctx = ToolContext::new();
/// let result = registry.dispatch("echo", json!({"message": "hello"}), &ctx).await;
/// assert_eq!(result, "hello");
/// # });
/// ```
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    aliases: HashMap<String, String>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register a new tool. An existing tool with the same name is replaced.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        info!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Register an alternate name for an already-registered tool.
    ///
    /// The alias is normalized the same way incoming call names are, so
    /// `register_alias("ReadFile", "read_file")` also covers `read-file`.
    pub fn register_alias(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(normalize_name(alias), canonical.to_string());
    }

    /// Resolve a raw tool name to the canonical registered name.
    ///
    /// Tries, in order: exact match, normalized match, alias table.
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        if let Some((name, _)) = self.tools.get_key_value(raw) {
            return Some(name.as_str());
        }
        let normalized = normalize_name(raw);
        if let Some((name, _)) = self.tools.get_key_value(&normalized) {
            return Some(name.as_str());
        }
        self.aliases
            .get(&normalized)
            .filter(|canonical| self.tools.contains_key(*canonical))
            .map(|canonical| canonical.as_str())
    }

    /// Dispatch a tool call, folding every failure mode into a result string.
    ///
    /// The returned string is stored verbatim as the tool message content:
    /// unknown names, invalid arguments, declined confirmations and execution
    /// errors all come back as text the model can react to. Dispatch never
    /// panics and never propagates an error to the loop.
    pub async fn dispatch(&self, name: &str, args: Value, ctx: &ToolContext) -> String {
        let Some(canonical) = self.resolve(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return format!("Error: unknown tool '{}'", name);
        };
        // resolve() guarantees presence
        let Some(tool) = self.tools.get(canonical) else {
            return format!("Error: unknown tool '{}'", name);
        };

        if let Err(reason) = validate_args(&tool.parameters(), &args) {
            warn!(tool = %canonical, reason = %reason, "Tool argument validation failed");
            return format!("Error: invalid arguments for '{}': {}", canonical, reason);
        }

        if tool.destructive() && ctx.safe_mode {
            match &ctx.confirm {
                None => {
                    error!(tool = %canonical, "Safe mode active but no confirmation callback supplied");
                    return format!(
                        "Error: safe mode is enabled but no confirmation callback was \
                         configured; refusing destructive tool '{}'",
                        canonical
                    );
                }
                Some(confirm) => {
                    let prompt = format!(
                        "Agent '{}' wants to run destructive tool '{}'. Allow?",
                        ctx.agent_name.as_deref().unwrap_or("unknown"),
                        canonical
                    );
                    if !confirm(&prompt) {
                        info!(tool = %canonical, "Destructive tool declined by confirmation");
                        return format!("Cancelled: destructive tool '{}' was declined", canonical);
                    }
                }
            }
        }

        let start = Instant::now();
        match tool.execute(args, ctx).await {
            Ok(result) => {
                info!(
                    tool = %canonical,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool executed successfully"
                );
                result
            }
            Err(e) => {
                error!(
                    tool = %canonical,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool execution failed"
                );
                format!("Error: {}", e)
            }
        }
    }

    /// Get all tool definitions for use with LLM providers.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Get a tool by exact name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check if a tool exists (exact, normalized or aliased name).
    pub fn has(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Get the names of all registered tools.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a tool name to `snake_case`.
///
/// Accepts the casing/separator conventions models actually emit:
/// `ListFiles`, `list-files`, `list files`, `list.files` all map to
/// `list_files`.
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for c in raw.trim().chars() {
        match c {
            '-' | ' ' | '.' => {
                if !out.ends_with('_') {
                    out.push('_');
                }
                prev_lower = false;
            }
            c if c.is_uppercase() => {
                if prev_lower && !out.ends_with('_') {
                    out.push('_');
                }
                out.extend(c.to_lowercase());
                prev_lower = false;
            }
            c => {
                out.push(c);
                prev_lower = c.is_lowercase() || c.is_ascii_digit();
            }
        }
    }
    out.trim_matches('_').to_string()
}

/// Validate arguments against a JSON-Schema-like object schema.
///
/// Checks that required properties are present and that present properties
/// match their declared primitive type. Anything beyond that (nested
/// schemas, enums, ranges) is left to the tool itself.
pub fn validate_args(schema: &Value, args: &Value) -> std::result::Result<(), String> {
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        // No declared properties: accept any object (or empty) arguments.
        return Ok(());
    };

    let Some(args_obj) = args.as_object() else {
        return Err("arguments must be a JSON object".to_string());
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            match args_obj.get(key) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required property '{}'", key));
                }
                Some(_) => {}
            }
        }
    }

    for (key, value) in args_obj {
        if value.is_null() {
            continue; // optional property explicitly unset
        }
        let Some(expected) = properties
            .get(key)
            .and_then(|p| p.get("type"))
            .and_then(|t| t.as_str())
        else {
            continue; // undeclared or untyped property: pass through
        };
        let ok = match expected {
            "string" => value.is_string(),
            "number" => value.is_number(),
            "integer" => value.is_i64() || value.is_u64(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            _ => true,
        };
        if !ok {
            return Err(format!(
                "property '{}' should be of type {}, got {}",
                key,
                expected,
                json_type_name(value)
            ));
        }
    }

    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
