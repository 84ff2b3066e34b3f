//! Checkpoint recall tool.
//!
//! Compaction replaces old messages with a summary that names the checkpoint
//! holding the verbatim history; this tool lets the model pull that history
//! back when the summary is not enough.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Result, TaskError};
use crate::memory::CheckpointStore;
use crate::session::Role;
use crate::utils::string::preview;

use super::{Tool, ToolContext};

/// Per-message preview budget in the rendered transcript.
const MESSAGE_PREVIEW_CHARS: usize = 600;

/// Tool that retrieves an archived checkpoint as a readable transcript.
pub struct RecallTool {
    checkpoints: Arc<CheckpointStore>,
}

impl RecallTool {
    /// Create a recall tool backed by the given checkpoint store.
    pub fn new(checkpoints: Arc<CheckpointStore>) -> Self {
        Self { checkpoints }
    }
}

#[async_trait]
impl Tool for RecallTool {
    fn name(&self) -> &str {
        "recall"
    }

    fn description(&self) -> &str {
        "Retrieve the full archived messages behind a conversation summary. \
         Pass the checkpoint id referenced in the summary."
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "checkpoint_id": {
                    "type": "string",
                    "description": "Id of the checkpoint to retrieve"
                }
            },
            "required": ["checkpoint_id"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let id = args
            .get("checkpoint_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TaskError::Tool("missing 'checkpoint_id'".into()))?;

        let checkpoint = self
            .checkpoints
            .load(id)
            .await?
            .ok_or_else(|| TaskError::NotFound(format!("checkpoint '{}'", id)))?;

        let mut out = format!(
            "Checkpoint {} ({} archived messages, taken {}):\n{}\n\n",
            checkpoint.id,
            checkpoint.original_message_count,
            checkpoint.timestamp.to_rfc3339(),
            checkpoint.summary
        );
        for message in &checkpoint.messages {
            let line = match message.role {
                Role::Tool => format!(
                    "tool({}): {}",
                    message.tool_name.as_deref().unwrap_or("?"),
                    preview(&message.content, MESSAGE_PREVIEW_CHARS)
                ),
                _ => format!(
                    "{}: {}",
                    message.role,
                    preview(&message.content, MESSAGE_PREVIEW_CHARS)
                ),
            };
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}
