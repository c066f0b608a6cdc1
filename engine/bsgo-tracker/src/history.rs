//! Faction history
//!
//! Every successful fetch appends a [`FactionSample`] for its destination.
//! The history feeds the online-over-time chart and the faction-lead line.
//! Only the most recent `max_samples` are kept; older ones are pruned.

use crate::config::{Destination, DEFAULT_HISTORY_SAMPLES};
use crate::error::{Result, TrackerError};
use crate::models::FactionSample;
use crate::state::destination_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, destination: &Destination, sample: FactionSample) -> Result<()>;

    /// Most recent samples for `destination`, oldest first
    async fn load(&self, destination: &Destination) -> Result<Vec<FactionSample>>;
}

/// JSON-lines file per destination
pub struct FileHistoryStore {
    dir: PathBuf,
    max_samples: usize,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_retention(dir, DEFAULT_HISTORY_SAMPLES)
    }

    pub fn with_retention(dir: impl Into<PathBuf>, max_samples: usize) -> Self {
        Self { dir: dir.into(), max_samples: max_samples.max(1) }
    }

    /// Rewrite the history file with only `samples`
    async fn compact(&self, destination: &Destination, samples: &[FactionSample]) -> Result<()> {
        let mut contents = String::new();
        for sample in samples {
            let line = serde_json::to_string(sample)
                .map_err(|e| TrackerError::history(format!("failed to encode sample: {e}")))?;
            contents.push_str(&line);
            contents.push('\n');
        }

        let path = self.history_path(destination);
        let tmp_path = path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp_path, contents).await.map_err(|e| {
            TrackerError::history(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| TrackerError::history(format!("failed to replace {}: {e}", path.display())))
    }

    pub fn history_path(&self, destination: &Destination) -> PathBuf {
        self.dir.join(format!("history_{}.jsonl", destination_key(&destination.url)))
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn append(&self, destination: &Destination, sample: FactionSample) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            TrackerError::history(format!("failed to create {}: {e}", self.dir.display()))
        })?;

        let mut line = serde_json::to_string(&sample)
            .map_err(|e| TrackerError::history(format!("failed to encode sample: {e}")))?;
        line.push('\n');

        let path = self.history_path(destination);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| TrackerError::history(format!("failed to open {}: {e}", path.display())))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| TrackerError::history(format!("failed to write {}: {e}", path.display())))?;
        file.flush()
            .await
            .map_err(|e| TrackerError::history(format!("failed to flush {}: {e}", path.display())))
    }

    async fn load(&self, destination: &Destination) -> Result<Vec<FactionSample>> {
        let path = self.history_path(destination);

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(TrackerError::history(format!("failed to read {}: {e}", path.display())))
            }
        };

        let mut samples = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<FactionSample>(line) {
                Ok(sample) => samples.push(sample),
                // torn write from an interrupted append
                Err(e) => warn!("Skipping corrupt history line {} in {}: {}", line_no + 1, path.display(), e),
            }
        }

        if samples.len() > self.max_samples {
            samples.drain(..samples.len() - self.max_samples);
            if let Err(e) = self.compact(destination, &samples).await {
                warn!("[{}] History pruning failed: {}", destination.label, e);
            }
        }

        Ok(samples)
    }
}

/// In-memory history (for testing)
pub struct InMemoryHistoryStore {
    samples: Mutex<HashMap<String, Vec<FactionSample>>>,
    max_samples: usize,
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::with_retention(DEFAULT_HISTORY_SAMPLES)
    }
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(max_samples: usize) -> Self {
        Self { samples: Mutex::new(HashMap::new()), max_samples: max_samples.max(1) }
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, destination: &Destination, sample: FactionSample) -> Result<()> {
        let mut samples = self.samples.lock().await;
        let kept = samples.entry(destination_key(&destination.url)).or_default();
        kept.push(sample);
        if kept.len() > self.max_samples {
            kept.drain(..kept.len() - self.max_samples);
        }
        Ok(())
    }

    async fn load(&self, destination: &Destination) -> Result<Vec<FactionSample>> {
        let samples = self.samples.lock().await;
        Ok(samples.get(&destination_key(&destination.url)).cloned().unwrap_or_default())
    }
}
