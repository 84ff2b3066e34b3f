//! Tools module - Tool definitions and execution for LLM function calling
//!
//! Provides the infrastructure for defining and dispatching tools callable
//! by the model during a conversation turn.
//!
//! # Overview
//!
//! - `Tool` trait: the interface all tools implement
//! - `ToolContext`: execution context (agent identity, workspace, safe mode,
//!   confirmation capability)
//! - `ToolRegistry`: resolution, validation, safe-mode gating and dispatch
//! - Built-ins: `EchoTool` (testing), `RecallTool` (checkpoint retrieval),
//!   `DelegateTool` (multi-agent delegation)
//!
//! # Example
//!
//! ```rust
//! use taskclaw::tools::{ToolContext, ToolRegistry, EchoTool};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let mut registry = ToolRegistry::new();
//! registry.register(Box::new(EchoTool));
//!
//! let result = registry.dispatch("echo", json!({"message": "Hello!"}), &ToolContext::new()).await;
//! assert_eq!(result, "Hello!");
//! # });
//! ```

pub mod delegate;
pub mod recall;
mod registry;
mod types;

pub use delegate::DelegateTool;
pub use recall::RecallTool;
pub use registry::{normalize_name, validate_args, ToolRegistry};
pub use types::{ConfirmCallback, Tool, ToolContext};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A simple echo tool for testing purposes.
///
/// # Example
///
/// ```rust
/// use taskclaw::tools::{Tool, ToolContext, EchoTool};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let tool = EchoTool;
/// let ctx = ToolContext::new();
/// let result = tool.execute(json!({"message": "Hello"}), &ctx).await;
/// assert_eq!(result.unwrap(), "Hello");
/// # });
/// ```
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the provided message"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to echo"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let message = args
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("(no message)");
        Ok(message.to_string())
    }
}
