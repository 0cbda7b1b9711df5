//! State module for sources, leases and sweeps
//!
//! This module provides the values that flow through the coordination engine.
//!
//! # Components
//!
//! - `Source`: an immutable feed endpoint, identified by its URL
//! - `SourceState`: which lease partition a source is in (pending, processing, completed)
//! - `LeaseRecord` / `CompletionRecord`: per-sweep lease bookkeeping owned by a coordinator
//! - `SweepSummary`: statistics snapshotted when a sweep is reset
//! - `Article`: the value produced by a source pipeline and handed to a publisher

mod lease;
mod source;

// Re-export main types
pub use lease::{CompletionRecord, LeaseRecord, SourceState, SweepSummary};
pub use source::{Article, Source};
