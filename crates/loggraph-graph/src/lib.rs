//! Graph sink implementations and the idempotent mutator applied on top of
//! them.

mod memory;
mod mutator;
mod neo4j;

pub use loggraph_types::{GraphEdge, GraphSink, NodeIdentity, SinkError};
pub use memory::{InMemoryGraphSink, StoredEdge};
pub use mutator::GraphMutator;
pub use neo4j::Neo4jGraphSink;
