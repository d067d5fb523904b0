//! In-memory graph sink, primarily for tests and offline runs.

use loggraph_types::{GraphEdge, GraphSink, NodeIdentity, SinkError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One persisted edge instance. Parallel edges over the same node pair and
/// label each get their own entry.
#[derive(Debug, Clone)]
pub struct StoredEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub properties: HashMap<String, serde_json::Value>,
}

impl StoredEdge {
    fn datetime(&self) -> Option<&str> {
        self.properties.get("datetime").and_then(|v| v.as_str())
    }
}

/// In-memory implementation of `GraphSink`.
///
/// Clones share state, so a test can hold one handle for inspection while
/// the pipeline mutates through another. `create_calls` records every
/// `create_node` invocation, which is how idempotence of the mutator above
/// this sink gets asserted.
#[derive(Clone, Default)]
pub struct InMemoryGraphSink {
    nodes: Arc<RwLock<HashSet<String>>>,
    edges: Arc<RwLock<HashMap<String, StoredEdge>>>,
    create_calls: Arc<RwLock<Vec<String>>>,
}

impl InMemoryGraphSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn node_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.nodes.read().await.iter().cloned().collect();
        names.sort();
        names
    }

    pub async fn edges(&self) -> Vec<StoredEdge> {
        self.edges.read().await.values().cloned().collect()
    }

    pub async fn edge_count(&self) -> usize {
        self.edges.read().await.len()
    }

    /// Every `create_node` call issued against this sink, in order.
    pub async fn create_calls(&self) -> Vec<String> {
        self.create_calls.read().await.clone()
    }
}

#[async_trait]
impl GraphSink for InMemoryGraphSink {
    async fn create_node(&self, id: &NodeIdentity) -> Result<(), SinkError> {
        self.create_calls.write().await.push(id.as_str().to_string());
        self.nodes.write().await.insert(id.as_str().to_string());
        Ok(())
    }

    async fn create_edge(
        &self,
        from: &NodeIdentity,
        to: &NodeIdentity,
        edge: &GraphEdge,
    ) -> Result<(), SinkError> {
        let stored = StoredEdge {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
            label: edge.label.clone(),
            properties: edge.properties.clone(),
        };
        self.edges
            .write()
            .await
            .insert(Uuid::new_v4().to_string(), stored);
        Ok(())
    }

    async fn delete_edges_older_than(&self, cutoff: &str) -> Result<(), SinkError> {
        // RFC-3339 UTC strings at second precision order lexicographically.
        // Only edges whose datetime parses as RFC-3339 participate at all;
        // a pass-through value stays visible for triage no matter how it
        // sorts against the cutoff.
        self.edges.write().await.retain(|_, e| {
            !matches!(e.datetime(), Some(dt)
                if chrono::DateTime::parse_from_rfc3339(dt).is_ok() && dt <= cutoff)
        });
        Ok(())
    }

    async fn clear(&self) -> Result<(), SinkError> {
        self.edges.write().await.clear();
        self.nodes.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_at(datetime: &str) -> GraphEdge {
        let mut properties = HashMap::new();
        properties.insert(
            "datetime".to_string(),
            serde_json::Value::String(datetime.to_string()),
        );
        GraphEdge {
            label: "P_GET_O".to_string(),
            properties,
        }
    }

    #[tokio::test]
    async fn parallel_edges_are_kept_distinct() {
        let sink = InMemoryGraphSink::new();
        let a = NodeIdentity::new("a");
        let b = NodeIdentity::new("b");
        sink.create_edge(&a, &b, &edge_at("2023-01-01T00:00:00Z"))
            .await
            .unwrap();
        sink.create_edge(&a, &b, &edge_at("2023-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(sink.edge_count().await, 2);
    }

    #[tokio::test]
    async fn eviction_boundary_is_inclusive() {
        let sink = InMemoryGraphSink::new();
        let a = NodeIdentity::new("a");
        let b = NodeIdentity::new("b");
        sink.create_edge(&a, &b, &edge_at("2023-01-01T00:10:00Z"))
            .await
            .unwrap();

        // Cutoff just before T keeps the edge.
        sink.delete_edges_older_than("2023-01-01T00:09:59Z")
            .await
            .unwrap();
        assert_eq!(sink.edge_count().await, 1);

        // Cutoff at exactly T removes it (datetime <= cutoff).
        sink.delete_edges_older_than("2023-01-01T00:10:00Z")
            .await
            .unwrap();
        assert_eq!(sink.edge_count().await, 0);
    }

    #[tokio::test]
    async fn eviction_spares_unparseable_datetimes_and_nodes() {
        let sink = InMemoryGraphSink::new();
        let a = NodeIdentity::new("a");
        let b = NodeIdentity::new("b");
        sink.create_node(&a).await.unwrap();
        sink.create_node(&b).await.unwrap();
        // One pass-through value sorting above the cutoff, one below it, and
        // a bare epoch; none of them parses as RFC-3339.
        sink.create_edge(&a, &b, &edge_at("26/Sep/2022 bogus"))
            .await
            .unwrap();
        sink.create_edge(&a, &b, &edge_at("04/Apr/2022 10:00:00"))
            .await
            .unwrap();
        sink.create_edge(&a, &b, &edge_at("1663920000"))
            .await
            .unwrap();

        sink.delete_edges_older_than("2099-01-01T00:00:00Z")
            .await
            .unwrap();
        // All three stay visible for triage; nodes are never evicted at all.
        assert_eq!(sink.edge_count().await, 3);
        assert_eq!(sink.node_names().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let sink = InMemoryGraphSink::new();
        let a = NodeIdentity::new("a");
        sink.create_node(&a).await.unwrap();
        sink.create_edge(&a, &a, &edge_at("2023-01-01T00:00:00Z"))
            .await
            .unwrap();
        sink.clear().await.unwrap();
        assert!(sink.node_names().await.is_empty());
        assert_eq!(sink.edge_count().await, 0);
    }
}
