//! Raw input lines, canonical parsed records, and the graph node/edge values
//! derived from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One raw entry pulled from a log source. Text lines come from flat log
/// files, JSON objects from a log shipper; field names inside the JSON shape
/// vary slightly by source and are reconciled by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLogLine {
    Text(String),
    Json(serde_json::Map<String, serde_json::Value>),
}

impl std::fmt::Display for RawLogLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawLogLine::Text(s) => f.write_str(s),
            RawLogLine::Json(map) => {
                let rendered = serde_json::to_string(map).unwrap_or_default();
                f.write_str(&rendered)
            }
        }
    }
}

/// Line-format variant the parser recognized. Selected once per line by a
/// detection predicate; each variant has its own field-extraction rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineFormat {
    /// object-server / container-server / account-server access line.
    TextObject,
    /// proxy-server access line.
    TextProxy,
    /// proxy-server STDERR line (error variant, or its degraded fallback).
    TextProxyError,
    /// JSON-tagged record from a log shipper.
    Json,
}

/// Parser output: either fully populated or the parse attempt failed.
///
/// The one sanctioned exception is the degraded proxy-STDERR fallback, which
/// carries only a best-effort `remote_addr` and the raw message; it can never
/// yield an edge because its method stays undetermined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub format: LineFormat,
    /// Raw address of the caller endpoint. May be the `-` sentinel.
    pub remote_addr: String,
    /// Raw address of the receiving server.
    pub destination_server: String,
    /// Service name of the caller side. For text lines this is a bare,
    /// closed-set name (already stripped of `-server`); for JSON lines it is
    /// the raw user-agent value and may be arbitrary client software.
    pub source_service: String,
    /// Service name of the receiving side (e.g. `object`, `proxy-server`).
    pub program_name: String,
    /// Explicit HTTP method when the line carried one.
    pub method: Option<String>,
    /// RFC-3339 timestamp when one of the recognized embedded patterns
    /// matched; otherwise the source value passed through unchanged.
    pub datetime: String,
    /// Free-text message, `none` for plain access lines.
    pub message: String,
    /// Format-specific fields carried through opaquely as edge properties.
    pub extras: HashMap<String, serde_json::Value>,
    /// Non-fatal normalization warnings accumulated while parsing.
    pub warnings: Vec<String>,
}

impl CanonicalRecord {
    pub fn is_error_line(&self) -> bool {
        self.format == LineFormat::TextProxyError
    }
}

/// Normalized string identifying one graph endpoint, safe for use as a
/// sink-native element name (alphanumeric plus underscore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity(String);

impl NodeIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directed edge: `label` is the `{Source}_{Method}_{Destination}` type
/// discriminator; `properties` carries the record fields, including the
/// `datetime` used for windowed eviction. Parallel instances of the same
/// (node pair, label) are expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub label: String,
    pub properties: HashMap<String, serde_json::Value>,
}

impl GraphEdge {
    /// The edge's `datetime` property, when present and a string.
    pub fn datetime(&self) -> Option<&str> {
        self.properties.get("datetime").and_then(|v| v.as_str())
    }
}
