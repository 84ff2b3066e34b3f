//! Claude (Anthropic) LLM provider implementation
//!
//! Implements the `LLMProvider` trait for the Anthropic Messages API,
//! handling message conversion, tool calls and response parsing. When the
//! chat options carry an `on_token` sink the request is made with SSE
//! streaming and text deltas are forwarded as they arrive.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TaskError};
use crate::session::{Message, Role};

use super::{
    parse_provider_error, ChatOptions, LLMProvider, LLMResponse, LLMToolCall, ToolDefinition,
    Usage,
};

/// The Claude Messages API endpoint path.
const MESSAGES_PATH: &str = "/v1/messages";

/// The default API base URL.
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// The default Claude model to use.
const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// The Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude/Anthropic LLM provider.
pub struct ClaudeProvider {
    /// API key for authentication
    api_key: String,
    /// Base URL (overridable for proxies and tests)
    api_base: String,
    /// HTTP client for making requests
    client: Client,
}

impl ClaudeProvider {
    /// Create a new Claude provider with the given API key.
    ///
    /// # Example
    /// ```
    /// use taskclaw::providers::{ClaudeProvider, LLMProvider};
    ///
    /// let provider = ClaudeProvider::new("sk-ant-api03-xxx");
    /// assert_eq!(provider.name(), "claude");
    /// ```
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Override the API base URL (for gateways, proxies or test servers).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Create a provider with a custom HTTP client.
    pub fn with_client(api_key: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.api_base, MESSAGES_PATH)
    }

    async fn send(&self, request: &ClaudeRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let body = match serde_json::from_str::<ClaudeErrorResponse>(&error_text) {
                Ok(parsed) => format!("{}: {}", parsed.error.r#type, parsed.error.message),
                Err(_) => error_text,
            };
            return Err(TaskError::from(parse_provider_error(status, &body)));
        }

        Ok(response)
    }
}

#[async_trait]
impl LLMProvider for ClaudeProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let model = model.unwrap_or(DEFAULT_MODEL);
        let (system, claude_messages) = convert_messages(messages);
        let streaming = options.on_token.is_some();

        let request = ClaudeRequest {
            model: model.to_string(),
            max_tokens: options.max_tokens.unwrap_or(8192),
            messages: claude_messages,
            system,
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.into_iter().map(convert_tool).collect())
            },
            temperature: options.temperature,
            top_p: options.top_p,
            stop_sequences: options.stop.clone(),
            stream: if streaming { Some(true) } else { None },
        };

        let response = self.send(&request).await?;

        match options.on_token.as_ref() {
            Some(sink) => collect_stream(response, sink.as_ref()).await,
            None => {
                let parsed: ClaudeResponse = response.json().await?;
                Ok(convert_response(parsed))
            }
        }
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn name(&self) -> &str {
        "claude"
    }
}

// ---- Request conversion ----

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Convert window messages to the Claude wire format, extracting system text.
///
/// System messages are concatenated into the request-level `system` field.
/// Tool results become `tool_result` blocks inside user messages; consecutive
/// results are coalesced into one user message so roles keep alternating.
fn convert_messages(messages: Vec<Message>) -> (Option<String>, Vec<Value>) {
    let mut system_parts: Vec<String> = Vec::new();
    let mut converted: Vec<Value> = Vec::new();

    for message in messages {
        match message.role {
            Role::System => system_parts.push(message.content),
            Role::User => {
                converted.push(json!({
                    "role": "user",
                    "content": [{"type": "text", "text": message.content}],
                }));
            }
            Role::Assistant => {
                let mut blocks: Vec<Value> = Vec::new();
                if !message.content.is_empty() {
                    blocks.push(json!({"type": "text", "text": message.content}));
                }
                if let Some(tool_calls) = &message.tool_calls {
                    for call in tool_calls {
                        let input: Value = serde_json::from_str(&call.arguments)
                            .unwrap_or_else(|_| json!({"_raw": call.arguments}));
                        blocks.push(json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.name,
                            "input": input,
                        }));
                    }
                }
                if blocks.is_empty() {
                    blocks.push(json!({"type": "text", "text": ""}));
                }
                converted.push(json!({"role": "assistant", "content": blocks}));
            }
            Role::Tool => {
                let block = json!({
                    "type": "tool_result",
                    "tool_use_id": message.tool_call_id.clone().unwrap_or_default(),
                    "content": message.content,
                });
                // Coalesce with a preceding tool-result user message
                let coalesced = match converted.last_mut() {
                    Some(last)
                        if last["role"] == "user"
                            && last["content"][0]["type"] == "tool_result" =>
                    {
                        if let Some(blocks) = last["content"].as_array_mut() {
                            blocks.push(block.clone());
                            true
                        } else {
                            false
                        }
                    }
                    _ => false,
                };
                if !coalesced {
                    converted.push(json!({"role": "user", "content": [block]}));
                }
            }
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, converted)
}

fn convert_tool(tool: ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.parameters,
    })
}

// ---- Response conversion ----

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContentBlock>,
    #[serde(default)]
    usage: Option<ClaudeUsage>,
}

/// A content block; untyped enough to tolerate unknown block kinds.
#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
    error: ClaudeErrorBody,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorBody {
    r#type: String,
    message: String,
}

fn convert_response(response: ClaudeResponse) -> LLMResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block.r#type.as_str() {
            "text" => {
                if let Some(text) = block.text {
                    content.push_str(&text);
                }
            }
            "tool_use" => {
                let arguments = block
                    .input
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "{}".to_string());
                tool_calls.push(LLMToolCall::new(
                    &block.id.unwrap_or_default(),
                    &block.name.unwrap_or_default(),
                    &arguments,
                ));
            }
            _ => {}
        }
    }

    let usage = response
        .usage
        .map(|u| Usage::new(u.input_tokens, u.output_tokens));

    LLMResponse {
        content,
        tool_calls,
        usage,
    }
}

// ---- Streaming ----

/// In-progress tool_use block accumulated across input_json_delta events.
#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    input_json: String,
}

/// Consume an SSE response body, forwarding text deltas to `sink` and
/// assembling the final [`LLMResponse`].
async fn collect_stream(
    response: reqwest::Response,
    sink: &(dyn Fn(&str) + Send + Sync),
) -> Result<LLMResponse> {
    let mut stream = response.bytes_stream();
    let mut line_buf = String::new();

    let mut content = String::new();
    let mut tool_calls: Vec<LLMToolCall> = Vec::new();
    let mut partial: Option<PartialToolCall> = None;
    let mut input_tokens = 0u32;
    let mut output_tokens = 0u32;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        line_buf.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline) = line_buf.find('\n') {
            let line: String = line_buf.drain(..=newline).collect();
            let line = line.trim_end();
            let Some(payload) = line.strip_prefix("data: ") else {
                continue;
            };
            let Ok(event) = serde_json::from_str::<Value>(payload) else {
                continue;
            };

            match event["type"].as_str().unwrap_or_default() {
                "message_start" => {
                    input_tokens = event["message"]["usage"]["input_tokens"]
                        .as_u64()
                        .unwrap_or(0) as u32;
                }
                "content_block_start" => {
                    if event["content_block"]["type"] == "tool_use" {
                        partial = Some(PartialToolCall {
                            id: event["content_block"]["id"]
                                .as_str()
                                .unwrap_or_default()
                                .to_string(),
                            name: event["content_block"]["name"]
                                .as_str()
                                .unwrap_or_default()
                                .to_string(),
                            input_json: String::new(),
                        });
                    }
                }
                "content_block_delta" => match event["delta"]["type"].as_str() {
                    Some("text_delta") => {
                        if let Some(text) = event["delta"]["text"].as_str() {
                            sink(text);
                            content.push_str(text);
                        }
                    }
                    Some("input_json_delta") => {
                        if let Some(fragment) = event["delta"]["partial_json"].as_str() {
                            if let Some(p) = partial.as_mut() {
                                p.input_json.push_str(fragment);
                            }
                        }
                    }
                    _ => {}
                },
                "content_block_stop" => {
                    if let Some(p) = partial.take() {
                        let arguments = if p.input_json.is_empty() {
                            "{}".to_string()
                        } else {
                            p.input_json
                        };
                        tool_calls.push(LLMToolCall::new(&p.id, &p.name, &arguments));
                    }
                }
                "message_delta" => {
                    output_tokens = event["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32;
                }
                _ => {}
            }
        }
    }

    Ok(LLMResponse {
        content,
        tool_calls,
        usage: Some(Usage::new(input_tokens, output_tokens)),
    })
}
