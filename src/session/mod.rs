//! Conversation state management.
//!
//! Provides the conversation data model and `ConversationStore`, which backs
//! the persistence interface the loop relies on: in-memory caching plus
//! optional JSON-file persistence keyed by agent id.
//!
//! # Example
//!
//! ```
//! use taskclaw::session::{ConversationStore, Message};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = ConversationStore::new_memory();
//!
//!     let mut conversation = store.get_or_create("agent-1").await.unwrap();
//!     conversation.add_message(Message::user("Hello!"));
//!     store.save(&conversation).await.unwrap();
//! }
//! ```

pub mod types;

pub use types::{Conversation, Message, Role, ToolCall};

use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store for conversation windows.
///
/// Cheap to clone and safe to share across tasks (`Arc<RwLock>` internally).
/// With a storage path configured, every save writes the conversation as a
/// pretty-printed JSON file whose name is the percent-encoded agent id.
pub struct ConversationStore {
    /// In-memory cache of conversations keyed by agent id
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
    /// Optional directory for file-based persistence
    storage_path: Option<PathBuf>,
}

impl ConversationStore {
    /// Create a store persisting under `~/.taskclaw/conversations/`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new() -> Result<Self> {
        let storage_path = crate::config::Config::dir().join("conversations");
        std::fs::create_dir_all(&storage_path)?;
        Ok(Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
            storage_path: Some(storage_path),
        })
    }

    /// Create an in-memory store without persistence.
    ///
    /// Useful for tests, ephemeral sub-agents and REPL experiments.
    pub fn new_memory() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
            storage_path: None,
        }
    }

    /// Create a store with a custom storage directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
            storage_path: Some(path),
        })
    }

    /// Get an existing conversation or create a new empty one.
    ///
    /// Checks the in-memory cache first, then disk (if persistence is
    /// enabled), and finally creates a fresh conversation.
    pub async fn get_or_create(&self, agent_id: &str) -> Result<Conversation> {
        if let Some(found) = self.get(agent_id).await? {
            return Ok(found);
        }

        let conversation = Conversation::new(agent_id);
        let mut conversations = self.conversations.write().await;
        conversations.insert(agent_id.to_string(), conversation.clone());
        Ok(conversation)
    }

    /// Get a conversation by agent id without creating it.
    pub async fn get(&self, agent_id: &str) -> Result<Option<Conversation>> {
        {
            let conversations = self.conversations.read().await;
            if let Some(conversation) = conversations.get(agent_id) {
                return Ok(Some(conversation.clone()));
            }
        }

        if let Some(ref storage_path) = self.storage_path {
            let file_path = storage_path.join(format!("{}.json", encode_key(agent_id)));
            if file_path.exists() {
                let content = tokio::fs::read_to_string(&file_path).await?;
                let conversation: Conversation = serde_json::from_str(&content)?;

                let mut conversations = self.conversations.write().await;
                conversations.insert(agent_id.to_string(), conversation.clone());
                return Ok(Some(conversation));
            }
        }

        Ok(None)
    }

    /// Save a conversation to memory and disk (if persistence is enabled).
    pub async fn save(&self, conversation: &Conversation) -> Result<()> {
        {
            let mut conversations = self.conversations.write().await;
            conversations.insert(conversation.agent_id.clone(), conversation.clone());
        }

        if let Some(ref storage_path) = self.storage_path {
            let file_path =
                storage_path.join(format!("{}.json", encode_key(&conversation.agent_id)));
            let content = serde_json::to_string_pretty(conversation)?;
            tokio::fs::write(&file_path, content).await?;
        }

        Ok(())
    }

    /// Delete a conversation from memory and disk.
    pub async fn delete(&self, agent_id: &str) -> Result<()> {
        {
            let mut conversations = self.conversations.write().await;
            conversations.remove(agent_id);
        }

        if let Some(ref storage_path) = self.storage_path {
            let file_path = storage_path.join(format!("{}.json", encode_key(agent_id)));
            if file_path.exists() {
                tokio::fs::remove_file(&file_path).await?;
            }
        }

        Ok(())
    }

    /// List all known agent ids, from memory and disk.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        {
            let conversations = self.conversations.read().await;
            ids.extend(conversations.keys().cloned());
        }

        // Files carry the real agent id inside, so read them rather than
        // decoding filenames.
        if let Some(ref storage_path) = self.storage_path {
            let mut dir_entries = tokio::fs::read_dir(storage_path).await?;
            while let Some(entry) = dir_entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    if let Ok(content) = tokio::fs::read_to_string(&path).await {
                        if let Ok(conversation) = serde_json::from_str::<Conversation>(&content) {
                            if !ids.contains(&conversation.agent_id) {
                                ids.push(conversation.agent_id);
                            }
                        }
                    }
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// Check whether a conversation exists in memory or on disk.
    pub async fn exists(&self, agent_id: &str) -> bool {
        {
            let conversations = self.conversations.read().await;
            if conversations.contains_key(agent_id) {
                return true;
            }
        }

        if let Some(ref storage_path) = self.storage_path {
            return storage_path
                .join(format!("{}.json", encode_key(agent_id)))
                .exists();
        }

        false
    }
}

/// Percent-encode filename-hostile characters so distinct agent ids never
/// collide on disk. `%` itself is escaped to keep the mapping bijective.
fn encode_key(key: &str) -> String {
    let mut result = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '/' => result.push_str("%2F"),
            '\\' => result.push_str("%5C"),
            ':' => result.push_str("%3A"),
            '*' => result.push_str("%2A"),
            '?' => result.push_str("%3F"),
            '"' => result.push_str("%22"),
            '<' => result.push_str("%3C"),
            '>' => result.push_str("%3E"),
            '|' => result.push_str("%7C"),
            '%' => result.push_str("%25"),
            c => result.push(c),
        }
    }
    result
}

impl Clone for ConversationStore {
    fn clone(&self) -> Self {
        Self {
            conversations: Arc::clone(&self.conversations),
            storage_path: self.storage_path.clone(),
        }
    }
}

impl Default for ConversationStore {
    /// Creates an in-memory store. Use `ConversationStore::new()` for
    /// file-based persistence.
    fn default() -> Self {
        Self::new_memory()
    }
}
