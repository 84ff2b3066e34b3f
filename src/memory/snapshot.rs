//! Plain-text active-task-state snapshots.
//!
//! A low-level safeguard that runs immediately before every compaction,
//! independent of the model-generated summary: the goal, the first user
//! message and recent tool activity are written as plain text to durable
//! storage, so the task state survives even if summary generation fails.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::session::{Conversation, Role};
use crate::utils::string::preview;

/// How many trailing tool results to include in the snapshot.
const RECENT_TOOL_LINES: usize = 5;

/// Per-line preview budget for tool activity.
const TOOL_LINE_CHARS: usize = 160;

/// Render the conversation's active task state as plain text.
pub fn render_task_state(conversation: &Conversation) -> String {
    let mut out = String::new();
    out.push_str(&format!("agent: {}\n", conversation.agent_id));
    out.push_str(&format!("updated: {}\n", conversation.updated_at.to_rfc3339()));
    out.push_str(&format!("messages: {}\n", conversation.message_count()));

    match conversation.first_user_message() {
        Some(goal) => out.push_str(&format!("\ngoal (first user message):\n{}\n", goal)),
        None => out.push_str("\ngoal (first user message): <none>\n"),
    }

    let tool_lines: Vec<String> = conversation
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .rev()
        .take(RECENT_TOOL_LINES)
        .map(|m| {
            format!(
                "- {}: {}",
                m.tool_name.as_deref().unwrap_or("?"),
                preview(&m.content, TOOL_LINE_CHARS).replace('\n', " ")
            )
        })
        .collect();

    if !tool_lines.is_empty() {
        out.push_str("\nrecent tool activity (newest first):\n");
        for line in &tool_lines {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

/// Write the task-state snapshot for this conversation under `dir`.
///
/// The file is named after the agent id and overwritten on each call — only
/// the latest pre-compaction state matters.
pub async fn write_task_state(dir: &Path, conversation: &Conversation) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.task.txt", conversation.agent_id.replace('/', "_")));
    tokio::fs::write(&path, render_task_state(conversation)).await?;
    Ok(path)
}
