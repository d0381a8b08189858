//! Resume bookkeeping: the run-wide offset and the optional per-file checkpoint

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ImportError, Result};
use crate::settings::ImportSettings;

/// Persisted per-file resume positions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportCheckpoint {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `group/label` -> index of the next message to attempt
    pub files: BTreeMap<String, usize>,
    pub checkpoint_count: usize,
}

impl ImportCheckpoint {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            updated_at: Utc::now(),
            files: BTreeMap::new(),
            checkpoint_count: 0,
        }
    }

    pub fn key(group: &str, label: &str) -> String {
        format!("{}/{}", group, label)
    }

    /// Next index to attempt for a label file, if one was recorded
    pub fn next_index(&self, group: &str, label: &str) -> Option<usize> {
        self.files.get(&Self::key(group, label)).copied()
    }

    pub fn record(&mut self, group: &str, label: &str, next_index: usize) {
        self.files.insert(Self::key(group, label), next_index);
    }

    /// Save checkpoint to disk
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Interrupted saves leave the previous checkpoint intact
        let json = serde_json::to_string_pretty(self)?;
        let staging = staging_path(path);
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, path).await?;
        tracing::debug!("Saved import checkpoint to {:?}", path);
        Ok(())
    }

    /// Load checkpoint from disk, starting fresh if there is none
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No existing checkpoint at {:?}, starting fresh", path);
            return Ok(Self::new());
        }

        let json = tokio::fs::read_to_string(path).await?;
        let checkpoint: Self = serde_json::from_str(&json).map_err(|e| {
            ImportError::CheckpointError(format!("Invalid checkpoint {:?}: {}", path, e))
        })?;

        tracing::info!(
            "Loaded import checkpoint: run_id={}, files={}",
            checkpoint.run_id,
            checkpoint.files.len()
        );

        Ok(checkpoint)
    }

    /// Stamp and persist
    pub async fn checkpoint(&mut self, path: &Path) -> Result<()> {
        self.updated_at = Utc::now();
        self.checkpoint_count += 1;
        self.save(path).await?;
        tracing::debug!(
            "Checkpoint #{}: {} files tracked",
            self.checkpoint_count,
            self.files.len()
        );
        Ok(())
    }
}

impl Default for ImportCheckpoint {
    fn default() -> Self {
        Self::new()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Decides where each label file starts and records progress through it
///
/// Without a checkpoint every file starts at the run-wide `from_message`.
/// With one, a file that has a recorded position starts there instead.
#[derive(Debug)]
pub struct ResumeTracker {
    from_message: usize,
    checkpoint: Option<(ImportCheckpoint, PathBuf)>,
    interval: usize,
    pending: usize,
}

impl ResumeTracker {
    /// Offset-only tracker
    pub fn global(from_message: usize) -> Self {
        Self {
            from_message,
            checkpoint: None,
            interval: 1,
            pending: 0,
        }
    }

    /// Build the tracker for a run, loading the checkpoint file if configured
    pub async fn from_settings(settings: &ImportSettings) -> Result<Self> {
        let checkpoint = match &settings.checkpoint_path {
            Some(path) => Some((ImportCheckpoint::load(path).await?, path.clone())),
            None => None,
        };

        if settings.from_message > 0 {
            tracing::warn!(
                "Resuming from message {} in EVERY mbox file of EVERY group{}",
                settings.from_message,
                if checkpoint.is_some() {
                    " without a checkpoint entry"
                } else {
                    ""
                }
            );
        }

        Ok(Self {
            from_message: settings.from_message,
            checkpoint,
            interval: settings.checkpoint_interval.max(1),
            pending: 0,
        })
    }

    /// Index of the first message to attempt in a label file
    pub fn start_index(&self, group: &str, label: &str) -> usize {
        self.checkpoint
            .as_ref()
            .and_then(|(checkpoint, _)| checkpoint.next_index(group, label))
            .unwrap_or(self.from_message)
    }

    /// Note that every message before `next_index` has been attempted
    pub async fn advance(&mut self, group: &str, label: &str, next_index: usize) -> Result<()> {
        let Some((checkpoint, _)) = self.checkpoint.as_mut() else {
            return Ok(());
        };

        checkpoint.record(group, label, next_index);
        self.pending += 1;
        if self.pending >= self.interval {
            self.flush().await?;
        }
        Ok(())
    }

    /// Persist outstanding progress, if any
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending == 0 {
            return Ok(());
        }
        if let Some((checkpoint, path)) = self.checkpoint.as_mut() {
            checkpoint.checkpoint(path).await?;
        }
        self.pending = 0;
        Ok(())
    }

    pub fn checkpoint(&self) -> Option<&ImportCheckpoint> {
        self.checkpoint.as_ref().map(|(checkpoint, _)| checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_checkpoint_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");

        let mut checkpoint = ImportCheckpoint::new();
        checkpoint.record("g@example.com", "Inbox", 7);
        checkpoint.save(&path).await.unwrap();

        let loaded = ImportCheckpoint::load(&path).await.unwrap();
        assert_eq!(loaded.run_id, checkpoint.run_id);
        assert_eq!(loaded.next_index("g@example.com", "Inbox"), Some(7));
        assert_eq!(loaded.next_index("g@example.com", "Sent"), None);
    }

    #[tokio::test]
    async fn test_checkpoint_save_replaces_file_without_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        let staging = staging_path(&path);
        // Leftover from an interrupted save
        tokio::fs::write(&staging, "{\"run_id\": ").await.unwrap();

        let mut checkpoint = ImportCheckpoint::new();
        checkpoint.record("g@example.com", "Inbox", 1);
        checkpoint.save(&path).await.unwrap();
        checkpoint.record("g@example.com", "Inbox", 2);
        checkpoint.save(&path).await.unwrap();

        assert!(!staging.exists());
        let loaded = ImportCheckpoint::load(&path).await.unwrap();
        assert_eq!(loaded.next_index("g@example.com", "Inbox"), Some(2));
    }

    #[tokio::test]
    async fn test_checkpoint_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = ImportCheckpoint::load(&temp_dir.path().join("none.json"))
            .await
            .unwrap();
        assert!(loaded.files.is_empty());
        assert_eq!(loaded.checkpoint_count, 0);
    }

    #[tokio::test]
    async fn test_checkpoint_load_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let result = ImportCheckpoint::load(&path).await;
        assert!(matches!(result, Err(ImportError::CheckpointError(_))));
    }

    #[tokio::test]
    async fn test_global_tracker_uses_offset_everywhere() {
        let mut tracker = ResumeTracker::global(3);
        assert_eq!(tracker.start_index("a@example.com", "Inbox"), 3);
        assert_eq!(tracker.start_index("b@example.com", "Work/Clients"), 3);

        tracker.advance("a@example.com", "Inbox", 10).await.unwrap();
        assert_eq!(tracker.start_index("a@example.com", "Inbox"), 3);
        assert!(tracker.checkpoint().is_none());
    }

    #[tokio::test]
    async fn test_checkpoint_tracker_saves_on_interval() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("checkpoint.json");
        let settings = ImportSettings::new(temp_dir.path(), "owner@example.com")
            .with_from_message(1)
            .with_checkpoint(&path, 2);

        let mut tracker = ResumeTracker::from_settings(&settings).await.unwrap();
        assert_eq!(tracker.start_index("g@example.com", "Inbox"), 1);

        tracker.advance("g@example.com", "Inbox", 2).await.unwrap();
        assert!(!path.exists());
        tracker.advance("g@example.com", "Inbox", 3).await.unwrap();
        assert!(path.exists());

        tracker.advance("g@example.com", "Inbox", 4).await.unwrap();
        tracker.flush().await.unwrap();

        let reloaded = ResumeTracker::from_settings(&settings).await.unwrap();
        assert_eq!(reloaded.start_index("g@example.com", "Inbox"), 4);
        // Files without an entry fall back to the global offset
        assert_eq!(reloaded.start_index("g@example.com", "Sent"), 1);
    }
}
