//! The work coordinator contract shared by every backend

use crate::catalog::CatalogError;
use crate::state::{CompletionRecord, LeaseRecord, Source, SourceState, SweepSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by coordinator backends
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Corrupt value under '{key}': {message}")]
    Corrupt { key: String, message: String },
}

/// Result type for coordination operations
pub type CoordinationResult<T> = Result<T, CoordinationError>;

/// What `initialize` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// A new sweep was seeded with this many sources
    Seeded(usize),
    /// State already existed (or another worker is seeding it)
    AlreadyInitialized,
    /// The catalog returned no sources; the next call retries
    CatalogEmpty,
    /// The catalog could not be reached; the next call retries
    CatalogUnavailable,
}

/// What `report_source_completion` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The matching lease was released
    Released,
    /// No lease matched; the completion was recorded anyway
    Unmatched,
}

/// Partition counts of the current sweep
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoordinatorStatus {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub sweep_started: Option<DateTime<Utc>>,
}

impl CoordinatorStatus {
    /// Number of sources in `state`
    pub fn count(&self, state: SourceState) -> usize {
        match state {
            SourceState::Pending => self.pending,
            SourceState::Processing => self.processing,
            SourceState::Completed => self.completed,
        }
    }

    /// True when no source is pending or leased
    pub fn is_complete(&self) -> bool {
        SourceState::all_states()
            .into_iter()
            .filter(SourceState::is_outstanding)
            .all(|state| self.count(state) == 0)
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed
    }
}

/// Full contents of the three partitions
#[derive(Debug, Clone, Default)]
pub struct PartitionSnapshot {
    pub pending: Vec<Source>,
    pub processing: Vec<LeaseRecord>,
    pub completed: Vec<CompletionRecord>,
}

impl PartitionSnapshot {
    /// Articles reported across every completion record
    pub fn articles_processed(&self) -> u64 {
        self.completed.iter().map(|c| c.article_count).sum()
    }
}

/// Owns the lease state machine over the source set
///
/// Every mutation of the Pending/Processing/Completed partitions goes through
/// this trait. Implementations must never hand the same source to two callers
/// while a lease for it is outstanding.
#[async_trait]
pub trait WorkCoordinator: Send + Sync {
    /// Seeds Pending from the catalog if all partitions are empty
    ///
    /// Idempotent; safe for every worker to call on startup. Catalog failures
    /// degrade to a logged no-op.
    async fn initialize(&self) -> CoordinationResult<InitOutcome>;

    /// Leases up to `batch_size` pending sources to `worker_id`
    ///
    /// Returns fewer (possibly zero) sources when Pending runs out.
    async fn acquire_sources(
        &self,
        batch_size: usize,
        worker_id: &str,
    ) -> CoordinationResult<Vec<Source>>;

    /// Releases the lease on `source` and records its completion
    ///
    /// Leases are matched by source identity, not by worker.
    async fn report_source_completion(
        &self,
        source: &Source,
        article_count: u64,
        worker_id: &str,
    ) -> CoordinationResult<CompletionOutcome>;

    /// True iff Pending and Processing are both empty
    async fn is_work_complete(&self) -> CoordinationResult<bool>;

    /// Snapshots statistics, clears all partitions and re-initializes
    async fn reset(&self) -> CoordinationResult<SweepSummary>;

    /// Resets only if the current sweep is complete and nobody else has
    /// already rolled it over
    async fn reset_if_complete(&self) -> CoordinationResult<Option<SweepSummary>>;

    async fn status(&self) -> CoordinationResult<CoordinatorStatus>;

    async fn snapshot(&self) -> CoordinationResult<PartitionSnapshot>;
}
