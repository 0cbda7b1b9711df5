//! In-process coordinator
//!
//! All three partitions live behind one mutex, so moving a source from
//! Pending to Processing is a single critical section. The catalog is never
//! awaited while the lock is held.

use crate::catalog::SourceCatalog;
use crate::coordination::traits::{
    CompletionOutcome, CoordinationResult, CoordinatorStatus, InitOutcome, PartitionSnapshot,
    WorkCoordinator,
};
use crate::state::{CompletionRecord, LeaseRecord, Source, SweepSummary};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Partitions {
    pending: VecDeque<Source>,
    processing: HashMap<String, LeaseRecord>,
    completed: Vec<CompletionRecord>,
    sweep_started: Option<DateTime<Utc>>,
}

impl Partitions {
    fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.processing.is_empty() && self.completed.is_empty()
    }

    fn is_complete(&self) -> bool {
        self.pending.is_empty() && self.processing.is_empty()
    }

    /// Returns leases older than `timeout` to the back of Pending
    fn reclaim_stale(&mut self, now: DateTime<Utc>, timeout: Duration) -> usize {
        let stale: Vec<String> = self
            .processing
            .iter()
            .filter(|(_, lease)| lease.is_stale(now, timeout))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            if let Some(lease) = self.processing.remove(key) {
                tracing::warn!(
                    "Reclaiming stale lease on {} held by {} since {}",
                    key,
                    lease.worker_id,
                    lease.lease_start
                );
                self.pending.push_back(lease.source);
            }
        }

        stale.len()
    }

    fn take_summary(&mut self) -> SweepSummary {
        let summary = SweepSummary {
            run_id: Uuid::new_v4().to_string(),
            started_at: self.sweep_started,
            finished_at: Utc::now(),
            sources_completed: self.completed.len() as u64,
            articles_processed: self.completed.iter().map(|c| c.article_count).sum(),
        };

        self.pending.clear();
        self.processing.clear();
        self.completed.clear();
        self.sweep_started = None;

        summary
    }
}

/// Coordinator for a single worker process
pub struct LocalCoordinator {
    catalog: Arc<dyn SourceCatalog>,
    lease_timeout: Option<Duration>,
    state: Mutex<Partitions>,
    history: Mutex<Vec<SweepSummary>>,
}

impl LocalCoordinator {
    pub fn new(catalog: Arc<dyn SourceCatalog>) -> Self {
        Self {
            catalog,
            lease_timeout: None,
            state: Mutex::new(Partitions::default()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Enables reclaiming of leases older than `timeout`
    pub fn with_lease_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lease_timeout = timeout;
        self
    }

    /// Summaries of every sweep reset by this coordinator, oldest first
    pub fn history(&self) -> Vec<SweepSummary> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, Partitions> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn finish_reset(&self, summary: SweepSummary) -> CoordinationResult<SweepSummary> {
        tracing::info!(
            "Sweep {} finished: {} sources, {} articles",
            summary.run_id,
            summary.sources_completed,
            summary.articles_processed
        );
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(summary.clone());

        self.initialize().await?;
        Ok(summary)
    }
}

#[async_trait]
impl WorkCoordinator for LocalCoordinator {
    async fn initialize(&self) -> CoordinationResult<InitOutcome> {
        let seeded_already = !self.lock().is_empty();
        if seeded_already {
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let sources = match self.catalog.get_all_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!("Source catalog unavailable, sweep has no sources: {}", e);
                return Ok(InitOutcome::CatalogUnavailable);
            }
        };

        if sources.is_empty() {
            tracing::warn!("Source catalog is empty, nothing to crawl");
            return Ok(InitOutcome::CatalogEmpty);
        }

        let mut state = self.lock();
        // Another task may have seeded while the catalog was in flight
        if !state.is_empty() {
            return Ok(InitOutcome::AlreadyInitialized);
        }

        for source in sources {
            if !state.pending.iter().any(|s| s.key() == source.key()) {
                state.pending.push_back(source);
            }
        }
        state.sweep_started = Some(Utc::now());

        let seeded = state.pending.len();
        tracing::info!("Initialized sweep with {} sources", seeded);
        Ok(InitOutcome::Seeded(seeded))
    }

    async fn acquire_sources(
        &self,
        batch_size: usize,
        worker_id: &str,
    ) -> CoordinationResult<Vec<Source>> {
        let mut state = self.lock();

        if let Some(timeout) = self.lease_timeout {
            state.reclaim_stale(Utc::now(), timeout);
        }

        let mut batch = Vec::with_capacity(batch_size.min(state.pending.len()));
        while batch.len() < batch_size {
            let Some(source) = state.pending.pop_front() else {
                break;
            };
            let lease = LeaseRecord::new(source.clone(), worker_id);
            state.processing.insert(source.key().to_string(), lease);
            batch.push(source);
        }

        if !batch.is_empty() {
            tracing::debug!("Leased {} sources to {}", batch.len(), worker_id);
        }
        Ok(batch)
    }

    async fn report_source_completion(
        &self,
        source: &Source,
        article_count: u64,
        worker_id: &str,
    ) -> CoordinationResult<CompletionOutcome> {
        let mut state = self.lock();

        let outcome = match state.processing.remove(source.key()) {
            Some(_) => CompletionOutcome::Released,
            None => {
                // A reclaimed lease may already be back in Pending; the work is done
                state.pending.retain(|s| s.key() != source.key());
                tracing::warn!(
                    "Completion of {} by {} matched no lease (late or duplicate report)",
                    source.key(),
                    worker_id
                );
                CompletionOutcome::Unmatched
            }
        };

        state
            .completed
            .push(CompletionRecord::new(source.clone(), worker_id, article_count));
        Ok(outcome)
    }

    async fn is_work_complete(&self) -> CoordinationResult<bool> {
        Ok(self.lock().is_complete())
    }

    async fn reset(&self) -> CoordinationResult<SweepSummary> {
        let summary = self.lock().take_summary();
        self.finish_reset(summary).await
    }

    async fn reset_if_complete(&self) -> CoordinationResult<Option<SweepSummary>> {
        let summary = {
            let mut state = self.lock();
            // An empty sweep has nothing to roll over; initialize retries the catalog
            if !state.is_complete() || state.is_empty() {
                return Ok(None);
            }
            state.take_summary()
        };

        self.finish_reset(summary).await.map(Some)
    }

    async fn status(&self) -> CoordinationResult<CoordinatorStatus> {
        let state = self.lock();
        Ok(CoordinatorStatus {
            pending: state.pending.len(),
            processing: state.processing.len(),
            completed: state.completed.len(),
            sweep_started: state.sweep_started,
        })
    }

    async fn snapshot(&self) -> CoordinationResult<PartitionSnapshot> {
        let state = self.lock();
        Ok(PartitionSnapshot {
            pending: state.pending.iter().cloned().collect(),
            processing: state.processing.values().cloned().collect(),
            completed: state.completed.clone(),
        })
    }
}
