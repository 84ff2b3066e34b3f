//! Tool types for TaskClaw
//!
//! Defines the `Tool` trait implemented by every callable capability, and
//! `ToolContext`, which carries the invoking agent's identity and the
//! confirmation capability for destructive calls.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Confirmation capability supplied by the caller of a turn.
///
/// Receives a human-readable prompt and returns whether the action may
/// proceed. Passed down the call chain explicitly; never a global.
pub type ConfirmCallback = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Trait that all tools must implement.
///
/// Tools are executable functions the model can call to act on the world.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use taskclaw::tools::{Tool, ToolContext};
/// use taskclaw::error::Result;
///
/// struct MyTool;
///
/// #[async_trait]
/// impl Tool for MyTool {
///     fn name(&self) -> &str { "my_tool" }
///     fn description(&self) -> &str { "Does something useful" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({
///             "type": "object",
///             "properties": {},
///             "required": []
///         })
///     }
///     async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<String> {
///         Ok("Done!".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool name the model uses to request it. Unique within a registry.
    fn name(&self) -> &str;

    /// Description sent to the model so it knows when to use the tool.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's parameters.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// A non-string result must be serialized by the implementation; the
    /// dispatcher stores whatever string comes back as the tool message.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String>;

    /// Whether this tool mutates state in a way that warrants confirmation
    /// under safe mode (file writes/deletes, arbitrary command execution).
    fn destructive(&self) -> bool {
        false
    }
}

/// Context provided to tools during execution.
///
/// Carries the invoking agent (for per-agent state such as the working
/// directory), the safe-mode flag, and the confirmation callback.
#[derive(Clone, Default)]
pub struct ToolContext {
    /// Stable id of the invoking agent
    pub agent_id: Option<String>,
    /// Display name of the invoking agent
    pub agent_name: Option<String>,
    /// The workspace directory for file operations
    pub workspace: Option<String>,
    /// Whether destructive tools require confirmation
    pub safe_mode: bool,
    /// Confirmation capability; required when `safe_mode` is on and a
    /// destructive tool is dispatched
    pub confirm: Option<ConfirmCallback>,
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("agent_id", &self.agent_id)
            .field("agent_name", &self.agent_name)
            .field("workspace", &self.workspace)
            .field("safe_mode", &self.safe_mode)
            .field("confirm", &self.confirm.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ToolContext {
    /// Create a new empty tool context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the invoking agent's id and display name.
    ///
    /// # Example
    /// ```
    /// use taskclaw::tools::ToolContext;
    ///
    /// let ctx = ToolContext::new().with_agent("researcher-1", "Researcher");
    /// assert_eq!(ctx.agent_id.as_deref(), Some("researcher-1"));
    /// assert_eq!(ctx.agent_name.as_deref(), Some("Researcher"));
    /// ```
    pub fn with_agent(mut self, agent_id: &str, agent_name: &str) -> Self {
        self.agent_id = Some(agent_id.to_string());
        self.agent_name = Some(agent_name.to_string());
        self
    }

    /// Set the workspace directory.
    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.workspace = Some(workspace.to_string());
        self
    }

    /// Set the safe-mode flag.
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }

    /// Supply the confirmation capability.
    pub fn with_confirm(mut self, confirm: ConfirmCallback) -> Self {
        self.confirm = Some(confirm);
        self
    }
}
