//! Persisted run state.
//!
//! One JSON file holding `{stats, seenItemIds, frontier}`, written
//! atomically (temp file + rename) at every persistence tick and at
//! shutdown. A missing or corrupt snapshot is equivalent to a fresh
//! run; the unreadable file is kept aside for inspection instead of
//! being overwritten silently.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use crate::crawl_engine::coordinator::{RunSnapshot, StateStore};

pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read(&self) -> Result<Option<RunSnapshot>> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .await
            .context("Failed to read snapshot file")?;
        let snapshot =
            serde_json::from_str(&content).context("Snapshot file contains invalid JSON")?;
        Ok(Some(snapshot))
    }

    async fn write(&self, snapshot: &RunSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create snapshot directory")?;
        }
        let content =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .context("Failed to write snapshot temp file")?;
        fs::rename(&tmp_path, &self.path)
            .await
            .context("Failed to move snapshot into place")?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for SnapshotStore {
    async fn load(&self) -> Option<RunSnapshot> {
        match self.read().await {
            Ok(Some(snapshot)) => {
                info!(
                    "Loaded snapshot from {:?} (session {}, saved {})",
                    self.path, snapshot.session_id, snapshot.saved_at
                );
                Some(snapshot)
            }
            Ok(None) => None,
            Err(err) => {
                warn!("⚠️  Unreadable snapshot at {:?}, starting fresh: {err:#}", self.path);
                let backup = self.path.with_extension("json.corrupted");
                if let Err(copy_err) = fs::copy(&self.path, &backup).await {
                    warn!("Failed to back up corrupted snapshot: {copy_err}");
                } else {
                    info!("Backed up corrupted snapshot to {:?}", backup);
                }
                None
            }
        }
    }

    async fn save(&self, snapshot: &RunSnapshot) -> Result<()> {
        self.write(snapshot).await
    }
}
