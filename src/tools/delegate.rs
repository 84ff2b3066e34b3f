//! Agent delegation tool.
//!
//! Exposes the multi-agent directory as a tool: the model names a target
//! agent and an instruction, the instruction runs as a user turn in the
//! target's own conversation loop, and the target's final answer comes back
//! as this tool's result.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::AgentDirectory;
use crate::error::{Result, TaskError};

use super::{Tool, ToolContext};

/// Tool that delegates an instruction to another registered agent.
///
/// Resolution follows the directory's order (id, then display name, then
/// persona id). Delegation failures — unknown target, self-delegation, a
/// failed target turn — are returned as result text so the calling loop can
/// react; they never abort the caller's turn.
pub struct DelegateTool {
    directory: Arc<AgentDirectory>,
}

impl DelegateTool {
    /// Create a delegate tool routing into the given directory.
    pub fn new(directory: Arc<AgentDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn name(&self) -> &str {
        "delegate"
    }

    fn description(&self) -> &str {
        "Delegate a sub-task to another named agent and get its final answer \
         back. The target agent runs the instruction in its own conversation \
         with its own tools."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent": {
                    "type": "string",
                    "description": "Target agent: id, display name or persona id"
                },
                "task": {
                    "type": "string",
                    "description": "The instruction for the target agent"
                }
            },
            "required": ["agent", "task"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<String> {
        let target = args
            .get("agent")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TaskError::Tool("missing 'agent'".into()))?;
        let task = args
            .get("task")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TaskError::Tool("missing 'task'".into()))?;

        let caller_id = ctx.agent_id.as_deref().unwrap_or("");
        let caller_name = ctx.agent_name.as_deref().unwrap_or("unknown");

        Ok(self
            .directory
            .delegate(caller_id, caller_name, target, task)
            .await)
    }
}
