//! Windowed ingestion: the controller driving batch pulls, per-record
//! pipeline runs, and time-based edge eviction.

pub mod controller;

pub use controller::{WindowConfig, WindowController};
