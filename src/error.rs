//! Error types for TaskClaw
//!
//! This module defines all error types used throughout the runtime.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Provider Error Classification
// ============================================================================

/// Structured provider error classification.
///
/// Provides fine-grained categorization of LLM provider HTTP errors so the
/// conversation loop can make retry decisions without string matching. The
/// one classification the loop acts on specially is [`ContextTooLarge`]:
/// that triggers a single retry with a smaller sliding window.
///
/// [`ContextTooLarge`]: ProviderError::ContextTooLarge
#[derive(Debug)]
pub enum ProviderError {
    /// 401 — Invalid API key or authentication failure
    Auth(String),
    /// 429 — Rate limit or quota exceeded
    RateLimit(String),
    /// 400 — Bad request, invalid JSON, malformed parameters
    InvalidRequest(String),
    /// 400/413 — the assembled window exceeds the provider's input limit
    ContextTooLarge(String),
    /// 500/502/503/504 — Server-side errors
    ServerError(String),
    /// Provider is overloaded — retry with backoff
    Overloaded(String),
    /// Connection or read timeout
    Timeout(String),
    /// Catch-all for unrecognized errors
    Unknown(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            ProviderError::RateLimit(msg) => write!(f, "Rate limit error: {}", msg),
            ProviderError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ProviderError::ContextTooLarge(msg) => write!(f, "Context too large: {}", msg),
            ProviderError::ServerError(msg) => write!(f, "Server error: {}", msg),
            ProviderError::Overloaded(msg) => write!(f, "Overloaded error: {}", msg),
            ProviderError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ProviderError::Unknown(msg) => write!(f, "Unknown provider error: {}", msg),
        }
    }
}

impl ProviderError {
    /// Returns `true` if this error is transient and the request may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimit(_)
                | ProviderError::ServerError(_)
                | ProviderError::Overloaded(_)
                | ProviderError::Timeout(_)
        )
    }

    /// Returns `true` if this error means the request payload exceeded the
    /// provider's input-size limit. The loop retries such requests once with
    /// a halved sliding window.
    pub fn is_context_overflow(&self) -> bool {
        matches!(self, ProviderError::ContextTooLarge(_))
    }

    /// Returns the HTTP status code associated with this error, if applicable.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProviderError::Auth(_) => Some(401),
            ProviderError::RateLimit(_) => Some(429),
            ProviderError::InvalidRequest(_) => Some(400),
            ProviderError::ContextTooLarge(_) => Some(413),
            ProviderError::ServerError(_) => Some(500),
            ProviderError::Overloaded(_) => Some(503),
            ProviderError::Timeout(_) => None,
            ProviderError::Unknown(_) => None,
        }
    }
}

impl From<ProviderError> for TaskError {
    fn from(err: ProviderError) -> Self {
        TaskError::ProviderTyped(err)
    }
}

// ============================================================================
// Primary Error Type
// ============================================================================

/// The primary error type for TaskClaw operations.
#[derive(Error, Debug)]
pub enum TaskError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider errors without a useful classification.
    /// New code should prefer `ProviderTyped`.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured provider error with classification for retry decisions.
    #[error("Provider error: {0}")]
    ProviderTyped(ProviderError),

    /// Tool execution errors (invalid parameters, execution failures, etc.)
    #[error("Tool error: {0}")]
    Tool(String),

    /// Conversation/session errors (invalid state, persistence failures, etc.)
    #[error("Session error: {0}")]
    Session(String),

    /// Delegation errors (unknown target agent, delegation cycle, etc.)
    #[error("Delegation error: {0}")]
    Delegation(String),

    /// Stdio JSON-RPC errors (spawn failure, framing, timeout, server error)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found (conversations, checkpoints, tools, etc.)
    #[error("Not found: {0}")]
    NotFound(String),
}

/// A specialized `Result` type for TaskClaw operations.
pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TaskError::Config("missing API key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing API key");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let task_err: TaskError = io_err.into();
        assert!(matches!(task_err, TaskError::Io(_)));
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_variants() {
        let _ = TaskError::Config("test".into());
        let _ = TaskError::Provider("test".into());
        let _ = TaskError::ProviderTyped(ProviderError::Auth("test".into()));
        let _ = TaskError::Tool("test".into());
        let _ = TaskError::Session("test".into());
        let _ = TaskError::Delegation("test".into());
        let _ = TaskError::Rpc("test".into());
        let _ = TaskError::NotFound("test".into());
    }

    // ====================================================================
    // ProviderError tests
    // ====================================================================

    #[test]
    fn test_provider_error_display() {
        assert!(ProviderError::Auth("bad key".into())
            .to_string()
            .contains("Authentication error"));
        assert!(ProviderError::RateLimit("quota".into())
            .to_string()
            .contains("Rate limit error"));
        assert!(ProviderError::ContextTooLarge("200k".into())
            .to_string()
            .contains("Context too large"));
        assert!(ProviderError::ServerError("500".into())
            .to_string()
            .contains("Server error"));
        assert!(ProviderError::Timeout("30s".into())
            .to_string()
            .contains("Timeout"));
    }

    #[test]
    fn test_provider_error_is_retryable() {
        assert!(ProviderError::RateLimit("429".into()).is_retryable());
        assert!(ProviderError::ServerError("500".into()).is_retryable());
        assert!(ProviderError::Overloaded("busy".into()).is_retryable());
        assert!(ProviderError::Timeout("timeout".into()).is_retryable());

        assert!(!ProviderError::Auth("401".into()).is_retryable());
        assert!(!ProviderError::InvalidRequest("400".into()).is_retryable());
        assert!(!ProviderError::ContextTooLarge("413".into()).is_retryable());
        assert!(!ProviderError::Unknown("???".into()).is_retryable());
    }

    #[test]
    fn test_provider_error_is_context_overflow() {
        assert!(ProviderError::ContextTooLarge("too long".into()).is_context_overflow());
        assert!(!ProviderError::InvalidRequest("bad json".into()).is_context_overflow());
        assert!(!ProviderError::ServerError("500".into()).is_context_overflow());
    }

    #[test]
    fn test_provider_error_status_code() {
        assert_eq!(ProviderError::Auth("x".into()).status_code(), Some(401));
        assert_eq!(
            ProviderError::RateLimit("x".into()).status_code(),
            Some(429)
        );
        assert_eq!(
            ProviderError::ContextTooLarge("x".into()).status_code(),
            Some(413)
        );
        assert_eq!(ProviderError::Timeout("x".into()).status_code(), None);
    }

    #[test]
    fn test_provider_error_into_task_error() {
        let pe = ProviderError::RateLimit("too fast".into());
        let te: TaskError = pe.into();
        assert!(matches!(te, TaskError::ProviderTyped(_)));
        assert!(te.to_string().contains("Rate limit error"));
    }
}
