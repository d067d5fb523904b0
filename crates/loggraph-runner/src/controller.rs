//! Window controller state machine: INITIALIZING, then the STEADY_STATE
//! loop until externally stopped.

use chrono::{Duration, Utc};
use loggraph_graph::GraphMutator;
use loggraph_parse::{LineParser, Normalizer};
use loggraph_types::{
    to_sink_timestamp, GraphSink, IdentityTables, LogSource, RawLogLine, RecordError, RejectSink,
    SinkError, TimeWindow,
};
use std::sync::Arc;

/// Window size and slide increment of the trailing edge-retention interval.
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    pub window: Duration,
    pub slide: Duration,
}

impl WindowConfig {
    pub fn from_env() -> Self {
        let window_secs = env_secs("LOGGRAPH_WINDOW_SECS", 600);
        let slide_secs = env_secs("LOGGRAPH_SLIDE_SECS", 600);
        Self {
            window: Duration::seconds(window_secs),
            slide: Duration::seconds(slide_secs),
        }
    }
}

fn env_secs(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Outcome of pushing one raw line through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Nodes upserted, edge created.
    Applied,
    /// Routed to the unprocessable-line sink.
    Rejected,
    /// The sink refused the edge; logged, not retried.
    SinkFailed,
}

/// Drives the Parser → Normalizer → Mutator pipeline over batches pulled
/// from the log source, advancing a trailing time window each cycle.
///
/// One controller instance writes to a given graph at a time; the loop is a
/// single sequential worker, so ingestion needs no internal locking. No
/// failure of any single record escapes into the loop: forward progress to
/// the next record and the next cycle is a hard invariant.
pub struct WindowController {
    source: Arc<dyn LogSource>,
    rejects: Arc<dyn RejectSink>,
    parser: LineParser,
    normalizer: Normalizer,
    mutator: GraphMutator,
    window: TimeWindow,
}

impl WindowController {
    pub fn new(
        source: Arc<dyn LogSource>,
        sink: Arc<dyn GraphSink>,
        rejects: Arc<dyn RejectSink>,
        tables: IdentityTables,
        config: WindowConfig,
    ) -> Self {
        let window = TimeWindow::initial(Utc::now(), config.window, config.slide);
        Self::with_window(source, sink, rejects, tables, window)
    }

    /// Construct with an explicit initial window; tests pin time with this.
    pub fn with_window(
        source: Arc<dyn LogSource>,
        sink: Arc<dyn GraphSink>,
        rejects: Arc<dyn RejectSink>,
        tables: IdentityTables,
        window: TimeWindow,
    ) -> Self {
        Self {
            source,
            rejects,
            parser: LineParser::new(),
            normalizer: Normalizer::new(tables),
            mutator: GraphMutator::new(sink),
            window,
        }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// INITIALIZING: fetch the full batch for `[gte, lte)`, then rebuild
    /// from scratch (clear, then ingest every record).
    pub async fn initialize(&mut self) -> Result<(), SinkError> {
        let batch = self
            .source
            .fetch_batch(self.window.gte, self.window.lte)
            .await?;
        self.mutator.clear().await?;
        tracing::info!(
            gte = %self.window.gte,
            lte = %self.window.lte,
            records = batch.len(),
            "initial full rebuild"
        );
        self.ingest_batch(batch).await;
        Ok(())
    }

    /// One STEADY_STATE cycle: fetch the incremental batch `[lte, lte+slide)`,
    /// ingest it append-only, advance the window, then evict edges at or
    /// before the new lower bound. Eviction runs only after ingestion, so an
    /// edge stays visible for at least the window size.
    ///
    /// Only a fetch failure leaves the window in place; once a batch has been
    /// ingested the window moves with it, so the same range is never fetched
    /// twice. A failed eviction leaves aged edges lingering until the next
    /// cutoff catches them.
    pub async fn advance(&mut self) -> Result<(), SinkError> {
        let next = self.window.advanced();
        let batch = self.source.fetch_batch(self.window.lte, next.lte).await?;
        tracing::info!(
            gte = %self.window.lte,
            lte = %next.lte,
            records = batch.len(),
            "ingesting incremental batch"
        );
        self.ingest_batch(batch).await;
        self.window = next;
        if let Err(e) = self
            .mutator
            .evict_older_than(&to_sink_timestamp(self.window.gte))
            .await
        {
            tracing::warn!(error = %e, "eviction failed, aged edges linger until the next cutoff");
        }
        Ok(())
    }

    /// Run until externally stopped. The slide sleep is the only intentional
    /// suspension point; a failed cycle is logged and naturally re-attempted
    /// on fresh data next cycle, never busy-retried.
    pub async fn run(&mut self) {
        if let Err(e) = self.initialize().await {
            tracing::error!(error = %e, "initial rebuild failed");
        }
        let slide = self
            .window
            .slide
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(600));
        loop {
            tokio::time::sleep(slide).await;
            if let Err(e) = self.advance().await {
                tracing::error!(error = %e, "ingestion cycle failed");
            }
        }
    }

    async fn ingest_batch(&mut self, batch: Vec<RawLogLine>) {
        let mut applied = 0usize;
        let mut rejected = 0usize;
        for line in &batch {
            match self.ingest_line(line).await {
                IngestOutcome::Applied => applied += 1,
                IngestOutcome::Rejected => rejected += 1,
                IngestOutcome::SinkFailed => {}
            }
        }
        tracing::info!(applied, rejected, "batch ingested");
    }

    /// Push one raw line through the full pipeline. Public so an
    /// already-fetched record (e.g. from a realtime hook) can be applied
    /// outside the windowed loop.
    pub async fn ingest_line(&mut self, raw: &RawLogLine) -> IngestOutcome {
        let record = match self.parser.parse(raw) {
            Ok(record) => record,
            Err(e) => return self.route_reject(raw, e.into()).await,
        };
        for warning in &record.warnings {
            tracing::warn!(warning, "record carried a normalization warning");
        }
        let from = match self.normalizer.normalize_node(&record.remote_addr) {
            Ok(id) => id,
            Err(e) => return self.route_reject(raw, e.into()).await,
        };
        let to = match self.normalizer.normalize_node(&record.destination_server) {
            Ok(id) => id,
            Err(e) => return self.route_reject(raw, e.into()).await,
        };
        let edge = match self.normalizer.normalize_edge(&record) {
            Ok(edge) => edge,
            Err(e) => return self.route_reject(raw, e).await,
        };
        match self.mutator.apply(&from, &to, &edge).await {
            Ok(()) => IngestOutcome::Applied,
            Err(e) => {
                tracing::warn!(label = edge.label, error = %e, "edge creation failed");
                IngestOutcome::SinkFailed
            }
        }
    }

    async fn route_reject(&self, raw: &RawLogLine, reason: RecordError) -> IngestOutcome {
        if let Err(e) = self.rejects.reject(raw, &reason).await {
            tracing::warn!(error = %e, "reject sink write failed");
        }
        IngestOutcome::Rejected
    }
}
