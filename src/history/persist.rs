//! Durable snapshot of the conversation set.
//!
//! The whole conversation list is one JSON document under a fixed key; every
//! store mutation rewrites it in full. There is no merging across processes:
//! last write wins.

use std::fs;
use std::path::{Path, PathBuf};

use super::error::StoreError;
use super::types::Conversation;
use crate::services::paths;

/// Fixed key the conversation set is stored under.
pub const STORAGE_KEY: &str = "chatConversations";

#[derive(Debug, Clone)]
pub struct ConversationStorage {
    path: PathBuf,
}

impl ConversationStorage {
    /// Storage under the default data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let dir = paths::data_dir().map_err(StoreError::persistence)?;
        Ok(Self::at(dir))
    }

    /// Storage rooted at an explicit directory.
    pub fn at(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted conversation set.
    ///
    /// A missing file is an empty set. A file that fails to parse is
    /// discarded with an error log; it stays on disk untouched until the
    /// next non-empty save overwrites it.
    pub fn load(&self) -> Vec<Conversation> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                log::error!("Failed to read {}: {}", self.path.display(), err);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(conversations) => conversations,
            Err(err) => {
                log::error!(
                    "Discarding malformed conversation snapshot {}: {}",
                    self.path.display(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Persist the full conversation set.
    ///
    /// An empty set is never written: the last non-empty snapshot survives a
    /// full in-session clear.
    pub fn save(&self, conversations: &[Conversation]) -> Result<(), StoreError> {
        if conversations.is_empty() {
            log::debug!("Skipping save of empty conversation set");
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(conversations)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
