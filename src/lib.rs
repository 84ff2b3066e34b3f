//! TaskClaw - Autonomous LLM task-agent orchestration runtime

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod memory;
pub mod providers;
pub mod rpc;
pub mod session;
pub mod tools;
pub mod utils;

pub use agent::{AgentDirectory, AgentIdentity, AgentLoop, ContextBuilder};
pub use config::Config;
pub use error::{ProviderError, Result, TaskError};
pub use memory::{CheckpointStore, ContextCompactor};
pub use providers::{
    ChatOptions, ClaudeProvider, LLMProvider, LLMResponse, LLMToolCall, ToolDefinition, Usage,
};
pub use session::{Conversation, ConversationStore, Message, Role, ToolCall};
