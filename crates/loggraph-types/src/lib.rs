//! Core types and traits for the loggraph log-to-graph pipeline.
//!
//! Collaborator contracts (`GraphSink`, `LogSource`, `RejectSink`) live here so
//! implementation crates depend only on this one.

mod record;
mod tables;
mod traits;
mod window;

pub use record::*;
pub use tables::*;
pub use traits::*;
pub use window::*;
