//! Generation history records.

use crate::generation::client::{GeneratedNotes, TokenUsage};
use crate::types::NormalizedInput;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One completed generation, as handed to a [`HistorySink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub source_filenames: Vec<String>,
    /// Normalized text of each source, in order
    pub transcripts: Vec<String>,
    pub generated_release_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub generated_at: DateTime<Utc>,
}

impl GenerationRecord {
    pub fn new(user_id: Option<String>, inputs: &[NormalizedInput], notes: &GeneratedNotes) -> Self {
        Self {
            user_id,
            source_filenames: inputs.iter().map(|i| i.filename.clone()).collect(),
            transcripts: inputs.iter().map(|i| i.text.clone()).collect(),
            generated_release_notes: notes.content.clone(),
            token_usage: notes.token_usage,
            generated_at: Utc::now(),
        }
    }
}

/// Destination for generation records.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn record(&self, record: &GenerationRecord) -> Result<()>;
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<GenerationRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<GenerationRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl HistorySink for MemoryHistory {
    async fn record(&self, record: &GenerationRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}

/// Appends records to a JSON Lines file.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistorySink for JsonlHistory {
    async fn record(&self, record: &GenerationRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
