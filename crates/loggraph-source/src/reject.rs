//! Unprocessable-line sinks: durable file append and an in-memory double
//! for tests.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use loggraph_types::{RawLogLine, RecordError, RejectSink, SinkError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Appends one timestamped entry per rejected line, carrying the rejection
/// reason and the original raw content for manual triage.
pub struct FileRejectSink {
    path: PathBuf,
}

impl FileRejectSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("LOGGRAPH_REJECT_LOG").unwrap_or_else(|_| "unprocessable.log".to_string()),
        )
    }
}

#[async_trait]
impl RejectSink for FileRejectSink {
    async fn reject(&self, raw: &RawLogLine, reason: &RecordError) -> Result<(), SinkError> {
        let entry = format!(
            "{} {}: {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            reason,
            raw
        );
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(entry.as_bytes()).await?;
        Ok(())
    }
}

/// In-memory reject sink; clones share the entry list.
#[derive(Clone, Default)]
pub struct InMemoryRejectSink {
    entries: Arc<RwLock<Vec<(String, String)>>>,
}

impl InMemoryRejectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejected `(raw, reason)` pairs, in arrival order.
    pub async fn entries(&self) -> Vec<(String, String)> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl RejectSink for InMemoryRejectSink {
    async fn reject(&self, raw: &RawLogLine, reason: &RecordError) -> Result<(), SinkError> {
        self.entries
            .write()
            .await
            .push((raw.to_string(), reason.to_string()));
        Ok(())
    }
}
