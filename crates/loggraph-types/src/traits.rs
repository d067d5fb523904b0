//! Collaborator traits and the error taxonomy.

use crate::{GraphEdge, NodeIdentity, RawLogLine};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Line shape unrecognized or a required field absent. Always recoverable:
/// the caller routes the line to the reject sink and continues.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line matches no known format")]
    UnrecognizedShape,
    #[error("line truncated: expected at least {expected} fields after marker, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// An endpoint resolved to the `-` sentinel; no identity available.
#[derive(Debug, thiserror::Error)]
#[error("no address available: {0:?}")]
pub struct IdentityError(pub String);

/// A trusted-format (text-path) service name is not in the abbreviation
/// table. The JSON path never raises this; it falls back to `S`.
#[derive(Debug, thiserror::Error)]
#[error("unknown service name: {0}")]
pub struct UnknownServiceError(pub String);

/// Network or protocol failure talking to the graph store, the log source,
/// or the reject sink. Logged, never retried within the same cycle.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("http error: {0}")]
    Http(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Why one record was rejected. Every variant is recoverable at the batch
/// level; no record failure escapes into the controller loop.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    UnknownService(#[from] UnknownServiceError),
    #[error("edge label carries the none sentinel: {0}")]
    UnlabeledEdge(String),
}

/// External graph store accepting node/edge mutations.
///
/// Node identifiers and edge labels are plain strings already normalized to
/// the sink's identifier grammar. `cutoff` timestamps are RFC-3339 at second
/// precision; eviction removes edges whose RFC-3339 `datetime` is
/// `<= cutoff`, and never touches edges carrying a pass-through datetime.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn create_node(&self, id: &NodeIdentity) -> Result<(), SinkError>;

    async fn create_edge(
        &self,
        from: &NodeIdentity,
        to: &NodeIdentity,
        edge: &GraphEdge,
    ) -> Result<(), SinkError>;

    async fn delete_edges_older_than(&self, cutoff: &str) -> Result<(), SinkError>;

    /// Delete all nodes and edges. Full-rebuild only, never during
    /// incremental windowed updates.
    async fn clear(&self) -> Result<(), SinkError>;
}

/// Pull-based log-batch provider keyed by a half-open time range `[gte, lte)`.
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn fetch_batch(
        &self,
        gte: DateTime<Utc>,
        lte: DateTime<Utc>,
    ) -> Result<Vec<RawLogLine>, SinkError>;
}

/// Append-only, timestamped record of lines that failed parsing or
/// normalization, with enough raw content for manual triage.
#[async_trait]
pub trait RejectSink: Send + Sync {
    async fn reject(&self, raw: &RawLogLine, reason: &RecordError) -> Result<(), SinkError>;
}
