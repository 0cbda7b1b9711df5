/// Lease partition and record definitions
///
/// A source is in exactly one partition per sweep. Records in this module are
/// owned by a coordinator; workers only ever hold the `Source` they were handed.
use crate::state::Source;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lease partition a source belongs to within the current sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceState {
    /// Not yet leased in this sweep
    Pending,

    /// Leased by a worker, not yet reported
    Processing,

    /// Reported by a worker
    Completed,
}

impl SourceState {
    /// Returns true if the state still blocks sweep completion
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }

    /// Short name used in store keys and log output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    pub fn all_states() -> [Self; 3] {
        [Self::Pending, Self::Processing, Self::Completed]
    }
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An exclusive, time-stamped claim on a source by one worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    pub source: Source,
    pub worker_id: String,
    pub lease_start: DateTime<Utc>,
}

impl LeaseRecord {
    pub fn new(source: Source, worker_id: &str) -> Self {
        Self {
            source,
            worker_id: worker_id.to_string(),
            lease_start: Utc::now(),
        }
    }

    /// How long the lease has been held at `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.lease_start
    }

    /// Returns true if the lease is older than `timeout`
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.age(now) > timeout
    }
}

/// The outcome a worker reported for one source in the current sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub source: Source,
    pub worker_id: String,
    pub article_count: u64,
    pub completion_time: DateTime<Utc>,
}

impl CompletionRecord {
    pub fn new(source: Source, worker_id: &str, article_count: u64) -> Self {
        Self {
            source,
            worker_id: worker_id.to_string(),
            article_count,
            completion_time: Utc::now(),
        }
    }
}

/// Statistics of a finished sweep, captured at reset time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub run_id: String,
    /// When the sweep was seeded; `None` if it never was (empty catalog)
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    pub sources_completed: u64,
    pub articles_processed: u64,
}

impl SweepSummary {
    /// Wall-clock duration of the sweep, if it had a start
    pub fn duration(&self) -> Option<Duration> {
        self.started_at.map(|start| self.finished_at - start)
    }
}
