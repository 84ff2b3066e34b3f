//! Bounded-context compaction for conversation windows.
//!
//! `ContextCompactor::maybe_compact` keeps an unbounded task history inside a
//! fixed size budget: when the estimated window size crosses the threshold,
//! the "cold" middle of the window is archived verbatim to a checkpoint and
//! replaced by one generated summary message that restates the user's
//! original goal. The leading system message and the hot tail of recent
//! messages are kept byte-for-byte.
//!
//! The core failure mode of compaction is goal drift; two mechanisms guard
//! against it. The summary prompt orders the model to quote the goal
//! verbatim, and the synthetic summary message restates the goal itself, so
//! the goal survives even a sloppy summary. A plain-text task snapshot is
//! additionally written before any model call.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::providers::LLMProvider;
use crate::session::{Conversation, Message, Role};
use crate::utils::string::truncate_marked;

use super::checkpoint::CheckpointStore;
use super::estimator::{CharEstimator, SizeEstimator};
use super::snapshot::write_task_state;

/// Maximum characters of the goal restated verbatim in the summary message.
const GOAL_EXCERPT_CHARS: usize = 2000;

/// Outcome of a compaction pass.
#[derive(Debug, Clone)]
pub struct CompactionReport {
    /// Id of the checkpoint holding the archived cold region
    pub checkpoint_id: String,
    /// Number of messages archived
    pub archived: usize,
    /// Window length before compaction
    pub before: usize,
    /// Window length after compaction
    pub after: usize,
}

/// The context/memory manager.
///
/// Owns the size threshold, the hot-region size, the (pluggable) size
/// estimator, the checkpoint archive and the snapshot directory.
pub struct ContextCompactor {
    threshold_tokens: usize,
    keep_recent: usize,
    estimator: Box<dyn SizeEstimator>,
    checkpoints: Arc<CheckpointStore>,
    snapshot_dir: Option<PathBuf>,
}

impl ContextCompactor {
    /// Create a compactor from config with the default character estimator.
    pub fn new(config: &MemoryConfig, checkpoints: Arc<CheckpointStore>) -> Self {
        Self {
            threshold_tokens: config.compaction_threshold_tokens,
            keep_recent: config.keep_recent,
            estimator: Box::new(CharEstimator::new(config.chars_per_token)),
            checkpoints,
            snapshot_dir: None,
        }
    }

    /// Substitute a custom size estimation strategy.
    pub fn with_estimator(mut self, estimator: Box<dyn SizeEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Enable plain-text task-state snapshots under `dir`.
    pub fn with_snapshot_dir(mut self, dir: PathBuf) -> Self {
        self.snapshot_dir = Some(dir);
        self
    }

    /// Estimated size of a message list, using the configured estimator.
    pub fn estimate(&self, messages: &[Message]) -> usize {
        self.estimator.estimate(messages)
    }

    /// The checkpoint store backing this compactor.
    pub fn checkpoints(&self) -> &Arc<CheckpointStore> {
        &self.checkpoints
    }

    /// Compact the conversation if its estimated size crosses the threshold.
    ///
    /// Returns `Ok(None)` when nothing was done (below threshold, or not
    /// enough cold history to be worth archiving). On compaction the window
    /// becomes `[system, summary, hot...]`; the hot region is never
    /// reordered and the system message is untouched.
    ///
    /// # Errors
    /// Propagates summary-generation and checkpoint-write failures. In both
    /// cases the window is left exactly as it was.
    pub async fn maybe_compact(
        &self,
        conversation: &mut Conversation,
        provider: &dyn LLMProvider,
    ) -> Result<Option<CompactionReport>> {
        let estimated = self.estimator.estimate(&conversation.messages);
        if estimated < self.threshold_tokens {
            return Ok(None);
        }

        let messages = &conversation.messages;
        let has_system = conversation.has_system_prefix();
        let body_start = usize::from(has_system);
        let body = &messages[body_start..];

        let mut cold_len = body.len().saturating_sub(self.keep_recent);
        // Never open the hot region with an orphaned tool result
        while body
            .get(cold_len)
            .map(|m| m.is_tool_result())
            .unwrap_or(false)
        {
            cold_len += 1;
        }
        // Replacing fewer than two messages with a summary would not shrink
        // the window
        if cold_len < 2 {
            return Ok(None);
        }

        let cold: Vec<Message> = body[..cold_len].to_vec();
        let hot: Vec<Message> = body[cold_len..].to_vec();

        // Low-level safeguard first: the goal must survive even if summary
        // generation fails below
        if let Some(ref dir) = self.snapshot_dir {
            if let Err(e) = write_task_state(dir, conversation).await {
                warn!(error = %e, "Failed to write task-state snapshot");
            }
        }

        let goal = conversation.first_user_message().unwrap_or("").to_string();
        let prompt = build_summary_prompt(&cold, &goal);
        let generated = provider.generate(&prompt, None).await?;

        // Archive verbatim before mutating the window; compaction must never
        // be the only copy of history
        let checkpoint_id = self.checkpoints.create(cold, &generated).await?;

        let summary_message = build_summary_message(&generated, &goal, &checkpoint_id);

        let before = conversation.messages.len();
        let mut rebuilt = Vec::with_capacity(2 + hot.len());
        if has_system {
            rebuilt.push(conversation.messages[0].clone());
        }
        rebuilt.push(summary_message);
        rebuilt.extend(hot);
        let after = rebuilt.len();
        conversation.replace_messages(rebuilt);

        info!(
            agent = %conversation.agent_id,
            checkpoint = %checkpoint_id,
            before,
            after,
            estimated_tokens = estimated,
            "Compacted conversation window"
        );

        Ok(Some(CompactionReport {
            checkpoint_id,
            archived: cold_len,
            before,
            after,
        }))
    }
}

/// Build the summarization prompt for the cold region.
///
/// The goal-preservation instruction is non-negotiable: the original
/// multi-part goal must be quoted back verbatim, and completed vs. remaining
/// sub-tasks enumerated.
pub fn build_summary_prompt(messages: &[Message], goal: &str) -> String {
    let mut transcript = String::new();
    for message in messages {
        match message.role {
            Role::Tool => transcript.push_str(&format!(
                "tool({}): {}\n",
                message.tool_name.as_deref().unwrap_or("?"),
                message.content
            )),
            _ => {
                transcript.push_str(&format!("{}: {}\n", message.role, message.content));
                if let Some(tool_calls) = &message.tool_calls {
                    for call in tool_calls {
                        transcript
                            .push_str(&format!("  -> called {}({})\n", call.name, call.arguments));
                    }
                }
            }
        }
    }

    format!(
        "You are compacting an agent's working memory. Summarize the transcript \
         below into a handoff note for the same agent.\n\
         \n\
         Non-negotiable requirements:\n\
         1. Quote the user's original goal VERBATIM, do not paraphrase it: \"{}\"\n\
         2. Enumerate sub-tasks already completed.\n\
         3. Enumerate sub-tasks still remaining.\n\
         4. Record key decisions, tool outcomes and discovered constraints.\n\
         Be concise everywhere except the verbatim goal.\n\
         \n\
         Transcript:\n{}",
        truncate_marked(goal, GOAL_EXCERPT_CHARS),
        transcript
    )
}

/// Build the synthetic summary message inserted in place of the cold region.
///
/// Restates the goal verbatim itself rather than trusting the generated
/// summary to have done so, and points at the checkpoint for full recall.
fn build_summary_message(generated: &str, goal: &str, checkpoint_id: &str) -> Message {
    Message::system(&format!(
        "[Conversation Summary]\n{}\n\n\
         Active goal (verbatim): {}\n\n\
         The summarized messages are archived as checkpoint {} and can be \
         retrieved with the recall tool.",
        generated,
        truncate_marked(goal, GOAL_EXCERPT_CHARS),
        checkpoint_id
    ))
}
