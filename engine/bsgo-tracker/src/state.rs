//! Message state store
//!
//! Remembers, per destination, the id of the Discord message that the next
//! cycle should edit. Slots are keyed by a hash of the webhook URL so that
//! reordering destinations never moves state between them.

use crate::config::Destination;
use crate::error::{Result, TrackerError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Stable slot key for a webhook URL
pub fn destination_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Abstract store of last-posted message ids
#[async_trait]
pub trait MessageStateStore: Send + Sync {
    /// Id of the last message posted to `destination`, if any
    async fn get(&self, destination: &Destination) -> Result<Option<String>>;

    /// Record `message_id` as the message to edit next time
    async fn set(&self, destination: &Destination, message_id: &str) -> Result<()>;
}

/// One small file per destination under a state directory
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the slot file for `destination`
    pub fn slot_path(&self, destination: &Destination) -> PathBuf {
        self.dir.join(format!("last_id_{}.txt", destination_key(&destination.url)))
    }
}

#[async_trait]
impl MessageStateStore for FileStateStore {
    async fn get(&self, destination: &Destination) -> Result<Option<String>> {
        let path = self.slot_path(destination);

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let message_id = contents.trim();
                Ok((!message_id.is_empty()).then(|| message_id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TrackerError::state_store(format!("failed to read {}: {e}", path.display()))),
        }
    }

    async fn set(&self, destination: &Destination, message_id: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            TrackerError::state_store(format!("failed to create {}: {e}", self.dir.display()))
        })?;

        let path = self.slot_path(destination);
        tokio::fs::write(&path, message_id)
            .await
            .map_err(|e| TrackerError::state_store(format!("failed to write {}: {e}", path.display())))
    }
}

/// In-memory store (for testing)
#[derive(Default)]
pub struct InMemoryStateStore {
    slots: Mutex<HashMap<String, String>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of destinations with a stored message id
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}

#[async_trait]
impl MessageStateStore for InMemoryStateStore {
    async fn get(&self, destination: &Destination) -> Result<Option<String>> {
        let slots = self.slots.lock().await;
        Ok(slots.get(&destination_key(&destination.url)).cloned())
    }

    async fn set(&self, destination: &Destination, message_id: &str) -> Result<()> {
        let mut slots = self.slots.lock().await;
        slots.insert(destination_key(&destination.url), message_id.to_string());
        Ok(())
    }
}
