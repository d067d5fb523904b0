//! loggraph daemon: pulls access-log batches and maintains the windowed
//! interaction graph in Neo4j.

use loggraph_graph::Neo4jGraphSink;
use loggraph_runner::{WindowConfig, WindowController};
use loggraph_source::{ElasticLogSource, FileLogSource, FileRejectSink};
use loggraph_types::{GraphSink, IdentityTables, LogSource, RejectSink};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A configured input file replaces the Elasticsearch pull, for offline
    // full rebuilds from a log dump.
    let source: Arc<dyn LogSource> = match std::env::var("LOGGRAPH_INPUT_FILE") {
        Ok(path) => {
            tracing::info!(path, "reading batches from file");
            Arc::new(FileLogSource::new(path))
        }
        Err(_) => Arc::new(ElasticLogSource::from_env()),
    };
    let sink: Arc<dyn GraphSink> = Arc::new(Neo4jGraphSink::from_env());
    let rejects: Arc<dyn RejectSink> = Arc::new(FileRejectSink::from_env());

    let mut controller = WindowController::new(
        source,
        sink,
        rejects,
        IdentityTables::default(),
        WindowConfig::from_env(),
    );
    tracing::info!("starting windowed ingestion");
    controller.run().await;
}
