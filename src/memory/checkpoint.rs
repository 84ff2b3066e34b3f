//! Checkpoint archive for compacted conversation history.
//!
//! A checkpoint is an immutable snapshot of the contiguous message slice
//! removed by one compaction. Records are write-once: created before the
//! window is mutated, read back by the `recall` tool, never modified.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::Result;
use crate::session::Message;

/// An immutable archived slice of a conversation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique checkpoint identifier
    pub id: String,
    /// When the checkpoint was taken
    pub timestamp: DateTime<Utc>,
    /// Human-readable summary of the archived slice
    pub summary: String,
    /// Number of messages archived
    pub original_message_count: usize,
    /// Verbatim copy of the removed messages
    pub messages: Vec<Message>,
}

/// Store for checkpoint records.
///
/// Keeps an in-memory map and, when a directory is configured, one JSON file
/// per checkpoint. Files are written once at creation and never rewritten.
pub struct CheckpointStore {
    cache: Arc<RwLock<HashMap<String, Checkpoint>>>,
    dir: Option<PathBuf>,
}

impl CheckpointStore {
    /// Create an in-memory store without persistence.
    pub fn new_memory() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            dir: None,
        }
    }

    /// Create a store persisting one JSON file per checkpoint under `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn with_dir(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            dir: Some(dir),
        })
    }

    /// Archive a message slice, returning the new checkpoint's id.
    pub async fn create(&self, messages: Vec<Message>, summary: &str) -> Result<String> {
        let checkpoint = Checkpoint {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            summary: summary.to_string(),
            original_message_count: messages.len(),
            messages,
        };

        if let Some(ref dir) = self.dir {
            let path = dir.join(format!("{}.json", checkpoint.id));
            let content = serde_json::to_string_pretty(&checkpoint)?;
            tokio::fs::write(&path, content).await?;
        }

        info!(
            checkpoint = %checkpoint.id,
            messages = checkpoint.original_message_count,
            "Created checkpoint"
        );

        let id = checkpoint.id.clone();
        let mut cache = self.cache.write().await;
        cache.insert(id.clone(), checkpoint);
        Ok(id)
    }

    /// Load a checkpoint by id, from memory or disk.
    pub async fn load(&self, id: &str) -> Result<Option<Checkpoint>> {
        {
            let cache = self.cache.read().await;
            if let Some(checkpoint) = cache.get(id) {
                return Ok(Some(checkpoint.clone()));
            }
        }

        if let Some(ref dir) = self.dir {
            let path = dir.join(format!("{}.json", id));
            if path.exists() {
                let content = tokio::fs::read_to_string(&path).await?;
                let checkpoint: Checkpoint = serde_json::from_str(&content)?;
                let mut cache = self.cache.write().await;
                cache.insert(id.to_string(), checkpoint.clone());
                return Ok(Some(checkpoint));
            }
        }

        Ok(None)
    }

    /// List all known checkpoint ids.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = {
            let cache = self.cache.read().await;
            cache.keys().cloned().collect()
        };

        if let Some(ref dir) = self.dir {
            let mut entries = tokio::fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        if !ids.iter().any(|id| id == stem) {
                            ids.push(stem.to_string());
                        }
                    }
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}

impl Clone for CheckpointStore {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            dir: self.dir.clone(),
        }
    }
}
