//! Agent module - the turn-taking conversation core.
//!
//! - `AgentLoop`: drives model-call/tool-execution rounds for one agent
//! - `AgentDirectory` / `AgentIdentity`: the registry delegation resolves
//!   against
//! - `ContextBuilder` / `assemble_window`: persona seeding and the sliding
//!   call-payload cap
//! - `recovery`: best-effort decoding of free-text tool calls
//!
//! # Architecture
//!
//! ```text
//! run_turn ──> ContextCompactor (maybe_compact)
//!     │
//!     ├──> LLMProvider (chat) ──> recovery (free-text tool calls)
//!     │
//!     └──> ToolRegistry (dispatch) ──> delegate ──> AgentDirectory
//!                                                        │
//!                                                        └──> another AgentLoop.run_turn
//! ```

mod context;
mod directory;
mod r#loop;
pub mod recovery;

pub use context::{assemble_window, ContextBuilder};
pub use directory::{AgentDirectory, AgentIdentity};
pub use r#loop::AgentLoop;
