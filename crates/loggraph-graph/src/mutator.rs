//! Idempotent node/edge application with the process-local seen-node set.

use loggraph_types::{GraphEdge, GraphSink, NodeIdentity, SinkError};
use std::collections::HashSet;
use std::sync::Arc;

/// Applies node and edge mutations against the sink.
///
/// One mutator runs per graph instance on a single sequential worker, so the
/// seen-node set needs no locking. The set resets only on `clear` (full
/// rebuild), never implicitly.
pub struct GraphMutator {
    sink: Arc<dyn GraphSink>,
    seen: HashSet<String>,
}

impl GraphMutator {
    pub fn new(sink: Arc<dyn GraphSink>) -> Self {
        Self {
            sink,
            seen: HashSet::new(),
        }
    }

    /// Create the node in the sink unless it was already materialized in
    /// this process lifetime. The id is marked seen even when remote
    /// creation fails, so a flapping sink does not turn every record into a
    /// retry storm; the failure is logged and the next full rebuild heals it.
    pub async fn ensure_node(&mut self, id: &NodeIdentity) {
        if self.seen.contains(id.as_str()) {
            return;
        }
        if let Err(e) = self.sink.create_node(id).await {
            tracing::warn!(node = id.as_str(), error = %e, "node creation failed");
        }
        self.seen.insert(id.as_str().to_string());
    }

    /// Upsert both endpoints, then append the edge. Edges are never
    /// deduplicated here: parallel instances are multigraph semantics.
    pub async fn apply(
        &mut self,
        from: &NodeIdentity,
        to: &NodeIdentity,
        edge: &GraphEdge,
    ) -> Result<(), SinkError> {
        self.ensure_node(from).await;
        self.ensure_node(to).await;
        self.sink.create_edge(from, to, edge).await
    }

    /// Full rebuild entry point: wipe the sink and the seen-node set.
    pub async fn clear(&mut self) -> Result<(), SinkError> {
        self.sink.clear().await?;
        self.seen.clear();
        Ok(())
    }

    /// Evict edges with `datetime <= cutoff`. Nodes are retained
    /// indefinitely; identity is cheap and reused across windows.
    pub async fn evict_older_than(&mut self, cutoff: &str) -> Result<(), SinkError> {
        self.sink.delete_edges_older_than(cutoff).await
    }
}
