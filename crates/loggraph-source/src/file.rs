//! Local-file log source for offline full rebuilds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loggraph_types::{LogSource, RawLogLine, SinkError};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Reads a whole log dump from disk. `.json` files hold an array of record
/// objects; any other extension is treated as plain text, one line per
/// record. The time range is ignored: a file is the full batch by
/// definition.
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_json(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("json")
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn fetch_batch(
        &self,
        _gte: DateTime<Utc>,
        _lte: DateTime<Utc>,
    ) -> Result<Vec<RawLogLine>, SinkError> {
        let content = tokio::fs::read_to_string(&self.path).await?;

        if Self::is_json(&self.path) {
            let parsed: Value =
                serde_json::from_str(&content).map_err(|e| SinkError::Protocol(e.to_string()))?;
            let records = parsed
                .as_array()
                .ok_or_else(|| SinkError::Protocol("expected a JSON array of records".into()))?;
            let mut lines = Vec::with_capacity(records.len());
            for record in records {
                match record {
                    Value::Object(map) => lines.push(RawLogLine::Json(map.clone())),
                    other => {
                        return Err(SinkError::Protocol(format!(
                            "expected a record object, got {}",
                            other
                        )))
                    }
                }
            }
            return Ok(lines);
        }

        Ok(content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| RawLogLine::Text(l.to_string()))
            .collect())
    }
}
