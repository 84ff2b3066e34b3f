//! Agent identity and the multi-agent directory.
//!
//! `AgentDirectory` is the explicit registry of named agent instances.
//! Delegation routes a tool call from one agent's loop into another agent's
//! loop and returns the final answer as the tool result: recursive reuse of
//! the same turn-taking machine, not a separate execution model.
//!
//! Lifecycle: the directory is created at startup, agents are registered as
//! they are constructed and removed only by explicit `remove` calls. It is
//! passed into the `delegate` tool, never ambient module state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use super::AgentLoop;

/// Identity of one agent instance.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    /// Stable id, used for persistence and delegation lookup
    pub id: String,
    /// Display alias; may differ from the id
    pub name: String,
    /// Which system-prompt profile this agent loaded
    pub persona_id: String,
    /// Whether destructive tool calls are gated behind confirmation
    pub safe_mode: bool,
}

impl AgentIdentity {
    /// Create an identity whose name and persona default to the id.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            persona_id: id.to_string(),
            safe_mode: false,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the persona id.
    pub fn with_persona(mut self, persona_id: &str) -> Self {
        self.persona_id = persona_id.to_string();
        self
    }

    /// Set the safe-mode flag.
    pub fn with_safe_mode(mut self, safe_mode: bool) -> Self {
        self.safe_mode = safe_mode;
        self
    }
}

/// Registry of live agent instances, keyed by agent id.
pub struct AgentDirectory {
    agents: RwLock<HashMap<String, Arc<AgentLoop>>>,
}

impl AgentDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Register an agent. An existing agent with the same id is replaced.
    pub async fn register(&self, agent: Arc<AgentLoop>) {
        let id = agent.identity().id.clone();
        info!(agent = %id, name = %agent.identity().name, "Registering agent");
        let mut agents = self.agents.write().await;
        agents.insert(id, agent);
    }

    /// Remove an agent by id. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let mut agents = self.agents.write().await;
        agents.remove(id).is_some()
    }

    /// Resolve a target reference: exact id first, then display name, then
    /// persona id.
    pub async fn resolve(&self, target_ref: &str) -> Option<Arc<AgentLoop>> {
        let agents = self.agents.read().await;
        if let Some(agent) = agents.get(target_ref) {
            return Some(Arc::clone(agent));
        }
        if let Some(agent) = agents
            .values()
            .find(|a| a.identity().name == target_ref)
        {
            return Some(Arc::clone(agent));
        }
        agents
            .values()
            .find(|a| a.identity().persona_id == target_ref)
            .map(Arc::clone)
    }

    /// All registered agent ids, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let agents = self.agents.read().await;
        let mut ids: Vec<String> = agents.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered agents.
    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Whether the directory is empty.
    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Delegate an instruction from one agent to another.
    ///
    /// The instruction is wrapped with provenance and submitted as a new
    /// user turn into the target's own conversation loop; the target's final
    /// answer is returned as the tool result text. Every failure mode comes
    /// back as an error string, never as an `Err` — the caller's loop always
    /// receives something it can hand to the model.
    ///
    /// Self-delegation is rejected before the target loop is entered. There
    /// is no global depth cap: a chain A→B→C is bounded by each agent's own
    /// round cap, and an indirect cycle (A→B→A) blocks on A's turn
    /// serialization instead of recursing — callers building deep chains
    /// must add their own guard.
    pub async fn delegate(
        &self,
        caller_id: &str,
        caller_name: &str,
        target_ref: &str,
        instruction: &str,
    ) -> String {
        let Some(target) = self.resolve(target_ref).await else {
            warn!(target = %target_ref, "Delegation target not found");
            return format!("Error: no agent matches '{}'", target_ref);
        };

        if target.identity().id == caller_id {
            warn!(agent = %caller_id, "Self-delegation rejected");
            return "Error: an agent cannot delegate to itself".to_string();
        }

        let wrapped = format!("[Request from {}]: {}", caller_name, instruction);
        info!(
            from = %caller_id,
            to = %target.identity().id,
            "Delegating instruction"
        );

        match target.run_turn(&wrapped).await {
            Ok(answer) => answer,
            Err(e) => format!(
                "Error: delegated agent '{}' failed: {}",
                target.identity().name,
                e
            ),
        }
    }
}

impl Default for AgentDirectory {
    fn default() -> Self {
        Self::new()
    }
}
