//! Providers module - LLM provider trait and adapters.
//!
//! The orchestration core consumes an opaque "generate a completion,
//! possibly with tool calls" capability through the [`LLMProvider`] trait.
//! `ClaudeProvider` is the bundled concrete adapter; additional backends
//! implement the same trait.

pub mod claude;
mod types;

pub use claude::ClaudeProvider;
pub use types::{
    ChatOptions, LLMProvider, LLMResponse, LLMToolCall, TokenSink, ToolDefinition, Usage,
};

use crate::error::ProviderError;

/// Parse an HTTP status code and response body into a structured [`ProviderError`].
///
/// Centralizes the status mapping so every adapter produces consistent typed
/// errors. Context-overflow detection matters most: the conversation loop
/// keys its shrink-and-retry behaviour off that classification.
pub fn parse_provider_error(status: u16, body: &str) -> ProviderError {
    if status == 413 || (status == 400 && looks_like_context_overflow(body)) {
        return ProviderError::ContextTooLarge(body.to_string());
    }
    match status {
        401 | 403 => ProviderError::Auth(body.to_string()),
        429 => ProviderError::RateLimit(body.to_string()),
        400 => ProviderError::InvalidRequest(body.to_string()),
        529 => ProviderError::Overloaded(body.to_string()),
        500..=599 => ProviderError::ServerError(body.to_string()),
        _ => ProviderError::Unknown(format!("HTTP {}: {}", status, body)),
    }
}

/// Heuristic match for "the input exceeded the model's context window" error
/// bodies across providers.
fn looks_like_context_overflow(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("prompt is too long")
        || lower.contains("context length")
        || lower.contains("context window")
        || lower.contains("too many tokens")
        || lower.contains("input is too long")
        || lower.contains("maximum context")
}
