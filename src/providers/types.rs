//! Provider types for TaskClaw
//!
//! Defines the `LLMProvider` trait and the request/response types the
//! orchestration core exchanges with any model backend. Provider-specific
//! request translation lives in the concrete adapters.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::Message;

/// Callback invoked with each incremental text fragment while a response
/// streams. Threaded through [`ChatOptions`]; providers that do not stream
/// may invoke it once with the full text.
pub type TokenSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Definition of a tool that can be called by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The name of the tool (must be unique)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    ///
    /// # Example
    /// ```
    /// use taskclaw::providers::ToolDefinition;
    /// use serde_json::json;
    ///
    /// let tool = ToolDefinition::new(
    ///     "list_files",
    ///     "List files in a directory",
    ///     json!({
    ///         "type": "object",
    ///         "properties": {
    ///             "path": { "type": "string", "description": "Directory path" }
    ///         },
    ///         "required": ["path"]
    ///     }),
    /// );
    /// assert_eq!(tool.name, "list_files");
    /// ```
    pub fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Trait for LLM providers.
///
/// The orchestration core treats every backend uniformly through this shape;
/// implement it to add a new provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages` - The conversation window to replay
    /// * `tools` - Available tools the model may call
    /// * `model` - Optional model override (uses the provider default if None)
    /// * `options` - Sampling options and the optional `on_token` stream sink
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse>;

    /// One-shot text generation without tools.
    ///
    /// Used by the memory manager for summaries. The default implementation
    /// routes through [`chat`](Self::chat).
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system_text) = system {
            messages.push(Message::system(system_text));
        }
        messages.push(Message::user(prompt));
        let response = self
            .chat(messages, Vec::new(), None, ChatOptions::new())
            .await?;
        Ok(response.content)
    }

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;

    /// Get the provider name (e.g., "claude").
    fn name(&self) -> &str;
}

/// Options for chat completion requests. Built with the builder pattern.
#[derive(Clone, Default)]
pub struct ChatOptions {
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter
    pub top_p: Option<f32>,
    /// Stop sequences that halt generation
    pub stop: Option<Vec<String>>,
    /// Optional incremental-token sink; enables streaming in providers that
    /// support it.
    pub on_token: Option<TokenSink>,
}

impl std::fmt::Debug for ChatOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOptions")
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("stop", &self.stop)
            .field("on_token", &self.on_token.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ChatOptions {
    /// Create new default chat options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the top_p (nucleus sampling) parameter.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set stop sequences that will halt generation.
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Set the incremental-token sink.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use taskclaw::providers::ChatOptions;
    ///
    /// let options = ChatOptions::new().with_on_token(Arc::new(|chunk| {
    ///     print!("{}", chunk);
    /// }));
    /// assert!(options.on_token.is_some());
    /// ```
    pub fn with_on_token(mut self, sink: TokenSink) -> Self {
        self.on_token = Some(sink);
        self
    }
}

/// Response from an LLM chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Text content of the response (empty when only tool calls were emitted)
    pub content: String,
    /// Tool calls requested by the LLM (if any)
    pub tool_calls: Vec<LLMToolCall>,
    /// Token usage information (if available)
    pub usage: Option<Usage>,
}

impl LLMResponse {
    /// Create a simple text response with no tool calls.
    ///
    /// # Example
    /// ```
    /// use taskclaw::providers::LLMResponse;
    ///
    /// let response = LLMResponse::text("Hello, world!");
    /// assert!(!response.has_tool_calls());
    /// ```
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            tool_calls: vec![],
            usage: None,
        }
    }

    /// Create a response with tool calls.
    pub fn with_tools(content: &str, tool_calls: Vec<LLMToolCall>) -> Self {
        Self {
            content: content.to_string(),
            tool_calls,
            usage: None,
        }
    }

    /// Check if this response contains any tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Attach usage information.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool to execute
    pub name: String,
    /// JSON-encoded arguments for the tool
    pub arguments: String,
}

impl LLMToolCall {
    /// Create a new tool call.
    pub fn new(id: &str, name: &str, arguments: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    /// Parse the arguments as a specific type.
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.arguments)
    }
}

/// Token usage information from a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,
    /// Number of tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens used (prompt + completion)
    pub total_tokens: u32,
}

impl Usage {
    /// Create new usage information.
    ///
    /// # Example
    /// ```
    /// use taskclaw::providers::Usage;
    ///
    /// let usage = Usage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_response_text() {
        let response = LLMResponse::text("Hello, world!");
        assert_eq!(response.content, "Hello, world!");
        assert!(!response.has_tool_calls());
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_llm_response_with_tools() {
        let tool_call = LLMToolCall::new("call_1", "list_files", r#"{"path": "/tmp"}"#);
        let response = LLMResponse::with_tools("Listing...", vec![tool_call]);

        assert_eq!(response.content, "Listing...");
        assert!(response.has_tool_calls());
        assert_eq!(response.tool_calls[0].name, "list_files");
    }

    #[test]
    fn test_llm_response_with_usage() {
        let response = LLMResponse::text("Hello").with_usage(Usage::new(100, 50));
        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 100);
        assert_eq!(usage.completion_tokens, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn test_chat_options_builder() {
        let options = ChatOptions::new()
            .with_max_tokens(1000)
            .with_temperature(0.7)
            .with_top_p(0.9)
            .with_stop(vec!["END".to_string()]);
        assert_eq!(options.max_tokens, Some(1000));
        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.top_p, Some(0.9));
        assert_eq!(options.stop.unwrap().len(), 1);
    }

    #[test]
    fn test_chat_options_on_token() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let options = ChatOptions::new().with_on_token(Arc::new(move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let sink = options.on_token.as_ref().unwrap();
        sink("chunk1");
        sink("chunk2");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_chat_options_debug_hides_callback() {
        let options = ChatOptions::new().with_on_token(Arc::new(|_| {}));
        let debug = format!("{:?}", options);
        assert!(debug.contains("<callback>"));
    }

    #[test]
    fn test_tool_definition_new() {
        let tool = ToolDefinition::new(
            "list_files",
            "List files in a directory",
            serde_json::json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }),
        );
        assert_eq!(tool.name, "list_files");
        assert!(tool.parameters.is_object());
    }

    #[test]
    fn test_llm_tool_call_parse_arguments() {
        #[derive(Debug, serde::Deserialize)]
        struct Args {
            path: String,
        }

        let call = LLMToolCall::new("call_1", "list_files", r#"{"path": "/tmp"}"#);
        let args: Args = call.parse_arguments().unwrap();
        assert_eq!(args.path, "/tmp");
    }

    #[test]
    fn test_llm_response_serialization() {
        let response = LLMResponse::text("Hello");
        let json = serde_json::to_string(&response).unwrap();
        let parsed: LLMResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.content, "Hello");
    }

    #[tokio::test]
    async fn test_generate_default_impl_routes_through_chat() {
        struct Fixed;

        #[async_trait]
        impl LLMProvider for Fixed {
            async fn chat(
                &self,
                messages: Vec<Message>,
                _tools: Vec<ToolDefinition>,
                _model: Option<&str>,
                _options: ChatOptions,
            ) -> Result<LLMResponse> {
                // Echo back a digest of what arrived
                let roles: Vec<String> = messages.iter().map(|m| m.role.to_string()).collect();
                Ok(LLMResponse::text(&roles.join(",")))
            }

            fn default_model(&self) -> &str {
                "fixed"
            }

            fn name(&self) -> &str {
                "fixed"
            }
        }

        let out = Fixed.generate("prompt", Some("system")).await.unwrap();
        assert_eq!(out, "system,user");

        let out = Fixed.generate("prompt", None).await.unwrap();
        assert_eq!(out, "user");
    }
}
