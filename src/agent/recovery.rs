//! Free-text tool-call recovery.
//!
//! Some models describe the action they want in prose instead of using
//! native tool calling: a fenced JSON block, or a bare JSON object shaped
//! like `{"tool": "...", "args": {...}}`. This module is a best-effort
//! decoder from that untyped text channel into a typed call: try fenced
//! JSON, then bare JSON, then give up. It never fails on malformed input —
//! the worst outcome is `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Keys accepted for the tool name, in priority order.
const NAME_KEYS: [&str; 4] = ["tool", "cmd_type", "function", "name"];

/// Keys accepted for the arguments object, in priority order.
const ARG_KEYS: [&str; 3] = ["args", "arguments", "parameters"];

/// Matches ``` fenced blocks with an optional `json` language tag.
static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fence regex is valid")
});

/// A tool invocation recovered from free text: `(name, arguments)`.
pub type RecoveredCall = (String, Value);

/// Try to extract a tool call from the model's text output.
///
/// Returns the tool name and its arguments object if the text contains a
/// recognizable call shape, `None` otherwise. The caller is responsible for
/// checking that the named tool actually exists.
///
/// # Example
/// ```
/// use taskclaw::agent::recovery::parse_loose_tool_call;
///
/// let text = r#"I'll run {"tool": "list_files", "args": {"path": "/tmp"}} now."#;
/// let (name, args) = parse_loose_tool_call(text).unwrap();
/// assert_eq!(name, "list_files");
/// assert_eq!(args["path"], "/tmp");
/// ```
pub fn parse_loose_tool_call(text: &str) -> Option<RecoveredCall> {
    // 1. Fenced JSON blocks, first match wins
    for captures in FENCE_RE.captures_iter(text) {
        if let Some(block) = captures.get(1) {
            if let Ok(value) = serde_json::from_str::<Value>(block.as_str()) {
                if let Some(call) = extract_call(&value) {
                    return Some(call);
                }
            }
        }
    }

    // 2. The whole text as a bare JSON object
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        if let Some(call) = extract_call(&value) {
            return Some(call);
        }
    }

    // 3. The outermost brace-delimited slice of the text
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
            if let Some(call) = extract_call(&value) {
                return Some(call);
            }
        }
    }

    None
}

/// Duck-typed extraction of `(name, args)` from a parsed JSON value.
fn extract_call(value: &Value) -> Option<RecoveredCall> {
    let obj = value.as_object()?;

    let name = NAME_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(|v| v.as_str()))?
        .to_string();

    let args = ARG_KEYS
        .iter()
        .find_map(|key| obj.get(*key))
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));

    // Some models stringify the arguments object
    let args = match args {
        Value::String(raw) => serde_json::from_str::<Value>(&raw)
            .ok()
            .filter(|v| v.is_object())
            .unwrap_or(Value::String(raw)),
        other => other,
    };

    Some((name, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json_with_tag() {
        let text = "Let me check.\n```json\n{\"tool\": \"list_files\", \"args\": {\"path\": \"/tmp\"}}\n```";
        let (name, args) = parse_loose_tool_call(text).unwrap();
        assert_eq!(name, "list_files");
        assert_eq!(args, json!({"path": "/tmp"}));
    }

    #[test]
    fn test_fenced_json_without_tag() {
        let text = "```\n{\"name\": \"echo\", \"arguments\": {\"message\": \"hi\"}}\n```";
        let (name, args) = parse_loose_tool_call(text).unwrap();
        assert_eq!(name, "echo");
        assert_eq!(args["message"], "hi");
    }

    #[test]
    fn test_bare_json_object() {
        let text = r#"{"cmd_type": "shell", "parameters": {"command": "ls"}}"#;
        let (name, args) = parse_loose_tool_call(text).unwrap();
        assert_eq!(name, "shell");
        assert_eq!(args["command"], "ls");
    }

    #[test]
    fn test_embedded_json_object() {
        let text = r#"I will now run {"function": "fetch", "args": {"url": "http://x"}} for you."#;
        let (name, args) = parse_loose_tool_call(text).unwrap();
        assert_eq!(name, "fetch");
        assert_eq!(args["url"], "http://x");
    }

    #[test]
    fn test_name_key_priority() {
        // "tool" wins over "name" when both are present
        let text = r#"{"tool": "primary", "name": "secondary", "args": {}}"#;
        let (name, _) = parse_loose_tool_call(text).unwrap();
        assert_eq!(name, "primary");
    }

    #[test]
    fn test_missing_args_defaults_to_empty_object() {
        let text = r#"{"tool": "status"}"#;
        let (name, args) = parse_loose_tool_call(text).unwrap();
        assert_eq!(name, "status");
        assert_eq!(args, json!({}));
    }

    #[test]
    fn test_stringified_args_parsed() {
        let text = r#"{"tool": "echo", "arguments": "{\"message\": \"hi\"}"}"#;
        let (_, args) = parse_loose_tool_call(text).unwrap();
        assert_eq!(args["message"], "hi");
    }

    #[test]
    fn test_plain_prose_gives_none() {
        assert!(parse_loose_tool_call("The answer is 42.").is_none());
        assert!(parse_loose_tool_call("").is_none());
    }

    #[test]
    fn test_json_without_call_shape_gives_none() {
        assert!(parse_loose_tool_call(r#"{"result": "done", "count": 3}"#).is_none());
    }

    #[test]
    fn test_malformed_json_never_panics() {
        for text in [
            "{not json",
            "```json\n{broken\n```",
            "{{{}}}",
            "{\"tool\": }",
            "text with a stray } and a { later",
        ] {
            let _ = parse_loose_tool_call(text);
        }
    }

    #[test]
    fn test_non_string_name_ignored() {
        assert!(parse_loose_tool_call(r#"{"tool": 42, "args": {}}"#).is_none());
    }

    #[test]
    fn test_first_fenced_block_wins() {
        let text = "```json\n{\"tool\": \"first\", \"args\": {}}\n```\n\
                    ```json\n{\"tool\": \"second\", \"args\": {}}\n```";
        let (name, _) = parse_loose_tool_call(text).unwrap();
        assert_eq!(name, "first");
    }

    #[test]
    fn test_fenced_block_without_call_falls_through_to_bare() {
        // The fenced block is not a call; the surrounding text is not JSON;
        // the brace-slice spans both blocks and fails to parse — give up.
        let text = "```json\n{\"data\": 1}\n```";
        assert!(parse_loose_tool_call(text).is_none());
    }
}
