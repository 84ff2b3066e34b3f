//! Memory module - bounded-context management for conversation windows.
//!
//! - `ContextCompactor`: threshold-triggered compaction with goal-preserving
//!   summaries
//! - `CheckpointStore`: immutable archives of compacted history
//! - `SizeEstimator` / `CharEstimator`: pluggable transcript size estimation
//! - task-state snapshots: plain-text safeguard written before compaction

pub mod checkpoint;
pub mod compactor;
pub mod estimator;
pub mod snapshot;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use compactor::{build_summary_prompt, CompactionReport, ContextCompactor};
pub use estimator::{CharEstimator, SizeEstimator};
pub use snapshot::{render_task_state, write_task_state};
