//! Transcript size estimation.
//!
//! The compaction algorithm only needs a cheap, monotone proxy for "how big
//! is this window", so the estimator is a seam: the default counts
//! characters, and a real tokenizer can be swapped in without touching the
//! compaction logic.

use crate::session::Message;

/// Pluggable transcript size estimation strategy.
pub trait SizeEstimator: Send + Sync {
    /// Estimated token count for the given messages.
    fn estimate(&self, messages: &[Message]) -> usize;
}

/// Character-count estimator: total characters of message contents and
/// serialized tool-call payloads, divided by a characters-per-token divisor.
///
/// Deliberately crude — it trades accuracy for zero dependencies and O(n)
/// cost, which is all the threshold check needs.
#[derive(Debug, Clone)]
pub struct CharEstimator {
    chars_per_token: usize,
}

impl CharEstimator {
    /// Create an estimator with the given characters-per-token divisor.
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl SizeEstimator for CharEstimator {
    fn estimate(&self, messages: &[Message]) -> usize {
        let chars: usize = messages
            .iter()
            .map(|m| {
                let mut count = m.content.chars().count();
                if let Some(tool_calls) = &m.tool_calls {
                    for call in tool_calls {
                        count += call.name.chars().count() + call.arguments.chars().count();
                    }
                }
                count
            })
            .sum();
        chars / self.chars_per_token
    }
}
