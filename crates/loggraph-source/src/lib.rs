//! Log-batch sources (Elasticsearch, local file) and unprocessable-line
//! sinks (file, in-memory).

mod elastic;
mod file;
mod reject;

pub use elastic::ElasticLogSource;
pub use file::FileLogSource;
pub use loggraph_types::{LogSource, RawLogLine, RejectSink, SinkError};
pub use reject::{FileRejectSink, InMemoryRejectSink};
