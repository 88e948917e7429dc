//! JSON-lines output sink.
//!
//! Append-only product output, one camelCase JSON object per line —
//! the local stand-in for a dataset push. The ledger already guarantees
//! at-most-once emission per item id, so the sink stays dumb.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::product::ProductRecord;
use crate::domain::services::ProductSink;

pub struct JsonlSink {
    path: PathBuf,
    /// Serializes appends so concurrent emits cannot interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl ProductSink for JsonlSink {
    async fn emit(&self, record: &ProductRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize record")?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create output directory")?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .context("Failed to open output file")?;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to append record")?;
        Ok(())
    }
}
