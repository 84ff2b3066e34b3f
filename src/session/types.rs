//! Conversation data model.
//!
//! Defines messages, roles, tool calls and the `Conversation` window owned by
//! one agent. Message order is append-only and significant: it is the literal
//! conversation replayed to the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The conversation window owned by one agent.
///
/// Created empty at agent initialization, seeded with the persona's system
/// message, grown by user input and model/tool exchange, and replaced (never
/// appended) by compaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Stable agent identifier this window belongs to.
    pub agent_id: String,
    /// Ordered list of messages.
    pub messages: Vec<Message>,
    /// When this conversation was created.
    pub created_at: DateTime<Utc>,
    /// When this conversation was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation for the given agent.
    ///
    /// # Example
    /// ```
    /// use taskclaw::session::Conversation;
    ///
    /// let conversation = Conversation::new("agent-1");
    /// assert!(conversation.messages.is_empty());
    /// ```
    pub fn new(agent_id: &str) -> Self {
        let now = Utc::now();
        Self {
            agent_id: agent_id.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump `updated_at`.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Replace the full message list (used by compaction) and bump `updated_at`.
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.updated_at = Utc::now();
    }

    /// Get the number of messages in this conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Check if this conversation is empty (no messages).
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the last message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The content of the first user message, if any.
    ///
    /// Treated as the user's original goal by the memory manager.
    pub fn first_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Whether the first message is the persona system message.
    pub fn has_system_prefix(&self) -> bool {
        self.messages
            .first()
            .map(|m| m.role == Role::System)
            .unwrap_or(false)
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// The text content. Empty when the message only carries tool-call requests.
    pub content: String,
    /// Tool calls requested by the assistant (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// ID of the tool call this message answers (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name of the tool that produced this result (tool messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    /// Create a new user message.
    ///
    /// # Example
    /// ```
    /// use taskclaw::session::{Message, Role};
    ///
    /// let msg = Message::user("Hello!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Create a new system message (persona prompt or compaction summary).
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Create a tool result message linked to its requesting call.
    ///
    /// # Example
    /// ```
    /// use taskclaw::session::{Message, Role};
    ///
    /// let msg = Message::tool_result("call_123", "list_files", "a.txt\nb.txt");
    /// assert_eq!(msg.role, Role::Tool);
    /// assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
    /// assert_eq!(msg.tool_name.as_deref(), Some("list_files"));
    /// ```
    pub fn tool_result(tool_call_id: &str, tool_name: &str, content: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.to_string()),
            tool_name: Some(tool_name.to_string()),
        }
    }

    /// Create an assistant message carrying tool calls.
    pub fn assistant_with_tools(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Check if this message has tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|tc| !tc.is_empty())
            .unwrap_or(false)
    }

    /// Check if this is a tool result message.
    pub fn is_tool_result(&self) -> bool {
        self.role == Role::Tool && self.tool_call_id.is_some()
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompts and instructions
    System,
    /// Messages from the user
    User,
    /// Messages from the AI assistant
    Assistant,
    /// Results from tool executions
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A tool call requested by the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// JSON-encoded arguments for the tool
    pub arguments: String,
}

impl ToolCall {
    /// Create a new tool call.
    ///
    /// # Example
    /// ```
    /// use taskclaw::session::ToolCall;
    ///
    /// let call = ToolCall::new("call_123", "list_files", r#"{"path": "/tmp"}"#);
    /// assert_eq!(call.name, "list_files");
    /// ```
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
