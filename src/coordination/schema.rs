//! Key layout of the shared coordination store
//!
//! ```text
//! {prefix}:sources:pending       set of Source JSON
//! {prefix}:sources:processing    set of LeaseRecord JSON
//! {prefix}:sources:completed     set of CompletionRecord JSON
//! {prefix}:last_reset            RFC 3339 start of the current sweep
//! {prefix}:reset_claim:{stamp}   claimed by the worker rolling that sweep over
//! {prefix}:workers               set of worker ids
//! {prefix}:workers:{id}          hash of running counters
//! {prefix}:runs                  set of run ids
//! {prefix}:runs:{id}             hash of a finished sweep summary
//! ```

use crate::state::SourceState;

/// Hash fields of a worker's running counters
pub const WORKER_SOURCES_FIELD: &str = "SourcesProcessed";
pub const WORKER_ARTICLES_FIELD: &str = "ArticlesProcessed";
pub const WORKER_ACTIVITY_FIELD: &str = "LastActivity";

/// Builds every key under one prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    prefix: String,
}

impl KeySchema {
    pub fn new(prefix: &str) -> Self {
        let prefix = prefix.trim().trim_end_matches(':');
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The set holding sources in `state`
    pub fn partition(&self, state: SourceState) -> String {
        format!("{}:sources:{}", self.prefix, state.as_str())
    }

    pub fn pending(&self) -> String {
        self.partition(SourceState::Pending)
    }

    pub fn processing(&self) -> String {
        self.partition(SourceState::Processing)
    }

    pub fn completed(&self) -> String {
        self.partition(SourceState::Completed)
    }

    pub fn last_reset(&self) -> String {
        format!("{}:last_reset", self.prefix)
    }

    /// One-shot claim on rolling over the sweep that started at `stamp`
    pub fn reset_claim(&self, stamp: &str) -> String {
        format!("{}:reset_claim:{}", self.prefix, stamp)
    }

    pub fn workers(&self) -> String {
        format!("{}:workers", self.prefix)
    }

    pub fn worker(&self, worker_id: &str) -> String {
        format!("{}:workers:{}", self.prefix, worker_id)
    }

    pub fn runs(&self) -> String {
        format!("{}:runs", self.prefix)
    }

    pub fn run(&self, run_id: &str) -> String {
        format!("{}:runs:{}", self.prefix, run_id)
    }
}

impl Default for KeySchema {
    fn default() -> Self {
        Self::new("crawler")
    }
}
