//! Context building for agent conversations.
//!
//! `ContextBuilder` produces the persona system message seeded into a fresh
//! conversation. `assemble_window` applies the sliding cap that bounds a
//! single model-call payload; it is distinct from memory compaction, which
//! rewrites the stored window itself.

use crate::session::{Message, Role};

/// Default system prompt for TaskClaw agents
const DEFAULT_SYSTEM_PROMPT: &str = r#"You are TaskClaw, an autonomous task agent.

You have access to tools to help accomplish tasks. Use them when needed, and
keep going until the task is done or you need input from the user.

Be concise but complete. Focus on finishing the user's request."#;

/// Builder for the persona system message.
///
/// # Example
///
/// ```rust
/// use taskclaw::agent::ContextBuilder;
/// use taskclaw::session::Role;
///
/// let builder = ContextBuilder::new().with_system_prompt("You are a researcher.");
/// let system = builder.build_system_message();
/// assert_eq!(system.role, Role::System);
/// assert!(system.content.contains("researcher"));
/// ```
pub struct ContextBuilder {
    /// The persona system prompt
    system_prompt: String,
    /// Optional operating-rules section appended after the persona
    rules_prompt: Option<String>,
}

impl ContextBuilder {
    /// Create a new context builder with the default system prompt.
    pub fn new() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            rules_prompt: None,
        }
    }

    /// Set a custom persona system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Append operating rules under an "Operating Rules" section.
    ///
    /// # Example
    /// ```rust
    /// use taskclaw::agent::ContextBuilder;
    ///
    /// let builder = ContextBuilder::new()
    ///     .with_rules("- Never fabricate file contents.");
    /// let system = builder.build_system_message();
    /// assert!(system.content.contains("Operating Rules"));
    /// ```
    pub fn with_rules(mut self, rules: &str) -> Self {
        self.rules_prompt = Some(rules.to_string());
        self
    }

    /// Build the system message with all configured content.
    pub fn build_system_message(&self) -> Message {
        let mut content = self.system_prompt.clone();
        if let Some(ref rules) = self.rules_prompt {
            content.push_str("\n\n## Operating Rules\n\n");
            content.push_str(rules);
        }
        Message::system(&content)
    }

    /// Get the current system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble the window sent to the model: every system message, then the
/// most recent `max_non_system` non-system messages.
///
/// The cut never lands on a tool result whose requesting assistant message
/// was dropped; such orphans are skipped forward so the payload stays
/// well-formed for providers that pair tool results with tool calls.
pub fn assemble_window(messages: &[Message], max_non_system: usize) -> Vec<Message> {
    let non_system: Vec<&Message> = messages.iter().filter(|m| m.role != Role::System).collect();

    let mut skip = non_system.len().saturating_sub(max_non_system);
    while non_system
        .get(skip)
        .map(|m| m.is_tool_result())
        .unwrap_or(false)
    {
        skip += 1;
    }

    let mut window: Vec<Message> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .cloned()
        .collect();
    window.extend(non_system.into_iter().skip(skip).cloned());
    window
}
