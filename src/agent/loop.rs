//! Agent conversation loop.
//!
//! `AgentLoop::run_turn` drives one user message through model-call/tool-
//! execution rounds until the model stops requesting tools or the round cap
//! is hit. The loop asks the memory manager to compact at turn entry, applies
//! the sliding window cap to every call payload, merges free-text tool-call
//! recovery into the structured path, dispatches tools strictly in order and
//! persists the conversation after every completed round.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Result, TaskError};
use crate::memory::ContextCompactor;
use crate::providers::{ChatOptions, LLMProvider, LLMToolCall};
use crate::session::{ConversationStore, Message, ToolCall};
use crate::tools::{ConfirmCallback, Tool, ToolContext, ToolRegistry};

use super::context::{assemble_window, ContextBuilder};
use super::directory::AgentIdentity;
use super::recovery::parse_loose_tool_call;

/// The turn-taking conversation loop for one agent.
///
/// An agent never runs two turns concurrently with itself: `run_turn` holds
/// the agent's turn lock for its full duration, so delegations targeting
/// this agent serialize with its other activity. Tool calls within one round
/// run strictly sequentially because several tools mutate agent-scoped
/// resources (working directory, open handles).
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use taskclaw::agent::{AgentIdentity, AgentLoop};
/// use taskclaw::config::Config;
/// use taskclaw::memory::{CheckpointStore, ContextCompactor};
/// use taskclaw::session::ConversationStore;
///
/// let config = Config::default();
/// let compactor = ContextCompactor::new(&config.memory, Arc::new(CheckpointStore::new_memory()));
/// let agent = AgentLoop::new(
///     AgentIdentity::new("main"),
///     config,
///     Arc::new(my_provider),
///     Arc::new(ConversationStore::new_memory()),
///     compactor,
/// );
/// let answer = agent.run_turn("List files in /tmp then tell me the count").await?;
/// ```
pub struct AgentLoop {
    /// This agent's identity
    identity: AgentIdentity,
    /// Runtime configuration
    config: Config,
    /// The LLM provider
    provider: Arc<dyn LLMProvider>,
    /// Registered tools
    tools: Arc<RwLock<ToolRegistry>>,
    /// Conversation persistence
    store: Arc<ConversationStore>,
    /// Context/memory manager
    compactor: ContextCompactor,
    /// Persona system-message builder
    context_builder: ContextBuilder,
    /// Confirmation capability threaded into every tool dispatch
    confirm: Option<ConfirmCallback>,
    /// Serializes turns on this agent
    turn_lock: Mutex<()>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        identity: AgentIdentity,
        config: Config,
        provider: Arc<dyn LLMProvider>,
        store: Arc<ConversationStore>,
        compactor: ContextCompactor,
    ) -> Self {
        Self {
            identity,
            config,
            provider,
            tools: Arc::new(RwLock::new(ToolRegistry::new())),
            store,
            compactor,
            context_builder: ContextBuilder::new(),
            confirm: None,
            turn_lock: Mutex::new(()),
        }
    }

    /// Use a custom context builder (persona prompt, operating rules).
    pub fn with_context_builder(mut self, context_builder: ContextBuilder) -> Self {
        self.context_builder = context_builder;
        self
    }

    /// Supply the confirmation capability for destructive tool calls.
    pub fn with_confirm(mut self, confirm: ConfirmCallback) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Register a tool with this agent.
    pub async fn register_tool(&self, tool: Box<dyn Tool>) {
        let mut tools = self.tools.write().await;
        tools.register(tool);
    }

    /// Register an alternate name for an already-registered tool.
    pub async fn register_tool_alias(&self, alias: &str, canonical: &str) {
        let mut tools = self.tools.write().await;
        tools.register_alias(alias, canonical);
    }

    /// Get the number of registered tools.
    pub async fn tool_count(&self) -> usize {
        self.tools.read().await.len()
    }

    /// Check if a tool is registered.
    pub async fn has_tool(&self, name: &str) -> bool {
        self.tools.read().await.has(name)
    }

    /// This agent's identity.
    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// The conversation store backing this agent.
    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// The memory manager backing this agent.
    pub fn compactor(&self) -> &ContextCompactor {
        &self.compactor
    }

    /// Run one user turn to completion and return the final answer.
    ///
    /// The returned string is empty when the model produced neither text nor
    /// a further tool call, or when the round cap fired before any text
    /// arrived — the cap is a fail-safe against runaway loops, not an error.
    ///
    /// # Errors
    /// Propagates provider failures (after one smaller-window retry for
    /// input-too-large) and persistence failures. Individual tool failures
    /// never abort the turn; they are captured as tool-result text.
    pub async fn run_turn(&self, user_text: &str) -> Result<String> {
        let _turn = self.turn_lock.lock().await;

        let defaults = &self.config.agents.defaults;
        let mut conversation = self.store.get_or_create(&self.identity.id).await?;
        if conversation.is_empty() {
            conversation.add_message(self.context_builder.build_system_message());
        }
        conversation.add_message(Message::user(user_text));
        self.store.save(&conversation).await?;

        if let Some(report) = self
            .compactor
            .maybe_compact(&mut conversation, self.provider.as_ref())
            .await?
        {
            info!(
                agent = %self.identity.id,
                checkpoint = %report.checkpoint_id,
                archived = report.archived,
                "Window compacted at turn entry"
            );
            self.store.save(&conversation).await?;
        }

        let model = Some(defaults.model.as_str());
        let options = ChatOptions::new()
            .with_max_tokens(defaults.max_tokens)
            .with_temperature(defaults.temperature);
        let tool_ctx = self.tool_context();

        let mut window_cap = defaults.window_messages.max(1);
        let mut final_text = String::new();

        for round in 1..=defaults.max_rounds {
            let tool_definitions = { self.tools.read().await.definitions() };
            let window = assemble_window(&conversation.messages, window_cap);
            debug!(round, window_len = window.len(), "Calling provider");

            let mut response = match self
                .provider
                .chat(window, tool_definitions.clone(), model, options.clone())
                .await
            {
                Ok(response) => response,
                Err(TaskError::ProviderTyped(pe)) if pe.is_context_overflow() && window_cap > 1 => {
                    // One retry with half the sliding cap
                    window_cap = (window_cap / 2).max(1);
                    warn!(
                        round,
                        window_cap,
                        error = %pe,
                        "Provider input too large; retrying with smaller window"
                    );
                    let retry_window = assemble_window(&conversation.messages, window_cap);
                    match self
                        .provider
                        .chat(retry_window, tool_definitions, model, options.clone())
                        .await
                    {
                        Ok(response) => response,
                        Err(e) => {
                            error!(agent = %self.identity.id, error = %e, "Provider call failed");
                            return Err(e);
                        }
                    }
                }
                Err(e) => {
                    error!(agent = %self.identity.id, error = %e, "Provider call failed");
                    return Err(e);
                }
            };

            // Recovery: models that describe the call in prose instead of
            // using native tool calling
            if response.tool_calls.is_empty() && !response.content.is_empty() {
                if let Some((name, args)) = parse_loose_tool_call(&response.content) {
                    let resolved = {
                        let tools = self.tools.read().await;
                        tools.resolve(&name).map(str::to_string)
                    };
                    if let Some(canonical) = resolved {
                        debug!(tool = %canonical, "Recovered tool call from free-text output");
                        let id = format!("recovered-{}", uuid::Uuid::new_v4());
                        response
                            .tool_calls
                            .push(LLMToolCall::new(&id, &canonical, &args.to_string()));
                    }
                }
            }

            if !response.content.is_empty() {
                final_text = response.content.clone();
            }

            if response.tool_calls.is_empty() {
                conversation.add_message(Message::assistant(&response.content));
                self.store.save(&conversation).await?;
                debug!(round, "Turn complete");
                return Ok(final_text);
            }

            let mut assistant = Message::assistant(&response.content);
            assistant.tool_calls = Some(
                response
                    .tool_calls
                    .iter()
                    .map(|tc| ToolCall::new(&tc.id, &tc.name, &tc.arguments))
                    .collect(),
            );
            conversation.add_message(assistant);

            // Strictly sequential, in the order received: tool-result order
            // must be deterministic, and tools share agent-scoped state
            for call in &response.tool_calls {
                info!(tool = %call.name, id = %call.id, "Executing tool");
                let args: Value = serde_json::from_str(&call.arguments).unwrap_or_else(|e| {
                    warn!(tool = %call.name, error = %e, "Invalid JSON in tool arguments");
                    serde_json::json!({"_parse_error": format!("invalid arguments JSON: {}", e)})
                });

                let started = Instant::now();
                let result = {
                    let tools = self.tools.read().await;
                    tools.dispatch(&call.name, args, &tool_ctx).await
                };
                debug!(
                    tool = %call.name,
                    latency_ms = started.elapsed().as_millis() as u64,
                    result_len = result.len(),
                    "Tool finished"
                );
                conversation.add_message(Message::tool_result(&call.id, &call.name, &result));
            }

            self.store.save(&conversation).await?;
        }

        info!(
            agent = %self.identity.id,
            rounds = defaults.max_rounds,
            "Round cap reached; returning best-known answer"
        );
        self.store.save(&conversation).await?;
        Ok(final_text)
    }

    /// Build the per-turn tool context from this agent's identity and config.
    fn tool_context(&self) -> ToolContext {
        let workspace = self.config.workspace_path();
        let mut ctx = ToolContext::new()
            .with_agent(&self.identity.id, &self.identity.name)
            .with_workspace(&workspace.to_string_lossy())
            .with_safe_mode(self.identity.safe_mode);
        if let Some(confirm) = &self.confirm {
            ctx = ctx.with_confirm(Arc::clone(confirm));
        }
        ctx
    }
}
