//! Coordinator over a shared set store
//!
//! Lets a fleet of worker processes share one sweep. Mutual exclusion rests
//! on the store's atomic pop: a pending member can only be popped once, and
//! only the worker that popped it writes the matching processing entry.

use crate::catalog::SourceCatalog;
use crate::coordination::schema::{
    KeySchema, WORKER_ACTIVITY_FIELD, WORKER_ARTICLES_FIELD, WORKER_SOURCES_FIELD,
};
use crate::coordination::store::SetStore;
use crate::coordination::traits::{
    CompletionOutcome, CoordinationError, CoordinationResult, CoordinatorStatus, InitOutcome,
    PartitionSnapshot, WorkCoordinator,
};
use crate::state::{CompletionRecord, LeaseRecord, Source, SweepSummary};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Running counters of one worker, as stored in the shared store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: String,
    pub sources_processed: u64,
    pub articles_processed: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

pub struct SharedStoreCoordinator<S> {
    store: Arc<S>,
    catalog: Arc<dyn SourceCatalog>,
    keys: KeySchema,
    lease_timeout: Option<Duration>,
}

impl<S: SetStore> SharedStoreCoordinator<S> {
    pub fn new(store: Arc<S>, catalog: Arc<dyn SourceCatalog>, keys: KeySchema) -> Self {
        Self {
            store,
            catalog,
            keys,
            lease_timeout: None,
        }
    }

    /// Enables reclaiming of leases older than `timeout`
    pub fn with_lease_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lease_timeout = timeout;
        self
    }

    pub fn keys(&self) -> &KeySchema {
        &self.keys
    }

    /// Counters of every worker that has reported to this store
    pub async fn worker_stats(&self) -> CoordinationResult<Vec<WorkerStats>> {
        let mut ids = self.store.set_members(&self.keys.workers()).await?;
        ids.sort();

        let mut stats = Vec::with_capacity(ids.len());
        for worker_id in ids {
            let hash = self.store.hash_get_all(&self.keys.worker(&worker_id)).await?;
            let count = |field: &str| {
                hash.get(field)
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0)
            };
            stats.push(WorkerStats {
                sources_processed: count(WORKER_SOURCES_FIELD),
                articles_processed: count(WORKER_ARTICLES_FIELD),
                last_activity: hash
                    .get(WORKER_ACTIVITY_FIELD)
                    .and_then(|v| parse_time(v)),
                worker_id,
            });
        }
        Ok(stats)
    }

    /// Summaries persisted by past resets, oldest first
    pub async fn run_history(&self) -> CoordinationResult<Vec<SweepSummary>> {
        let ids = self.store.set_members(&self.keys.runs()).await?;

        let mut runs = Vec::with_capacity(ids.len());
        for run_id in ids {
            let hash = self.store.hash_get_all(&self.keys.run(&run_id)).await?;
            let Some(finished_at) = hash.get("CompletionTime").and_then(|v| parse_time(v)) else {
                tracing::warn!("Run {} has no completion time, skipping", run_id);
                continue;
            };
            let count = |field: &str| {
                hash.get(field)
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(0)
            };
            runs.push(SweepSummary {
                started_at: hash.get("StartTime").and_then(|v| parse_time(v)),
                finished_at,
                sources_completed: count("CompletedSources"),
                articles_processed: count("ArticlesProcessed"),
                run_id,
            });
        }

        runs.sort_by_key(|r| r.finished_at);
        Ok(runs)
    }

    async fn members<T: DeserializeOwned>(&self, key: &str) -> CoordinationResult<Vec<T>> {
        let raw = self.store.set_members(key).await?;
        let mut values = Vec::with_capacity(raw.len());
        for member in raw {
            match decode(key, &member) {
                Ok(value) => values.push(value),
                Err(e) => tracing::warn!("Ignoring unreadable member: {}", e),
            }
        }
        Ok(values)
    }

    async fn touch_worker(&self, worker_id: &str) -> CoordinationResult<()> {
        self.store
            .set_add(&self.keys.workers(), &[worker_id.to_string()])
            .await?;
        self.store
            .hash_set(
                &self.keys.worker(worker_id),
                &[(WORKER_ACTIVITY_FIELD.to_string(), Utc::now().to_rfc3339())],
            )
            .await
    }

    /// Moves leases older than `timeout` back to Pending
    ///
    /// Removal from Processing decides the winner when several workers
    /// reclaim the same lease.
    async fn reclaim_stale(&self, timeout: Duration) -> CoordinationResult<usize> {
        let processing = self.keys.processing();
        let now = Utc::now();
        let mut reclaimed = 0;

        for member in self.store.set_members(&processing).await? {
            let lease: LeaseRecord = match decode(&processing, &member) {
                Ok(lease) => lease,
                Err(_) => continue,
            };
            if !lease.is_stale(now, timeout) {
                continue;
            }
            if self.store.set_remove(&processing, &member).await? {
                tracing::warn!(
                    "Reclaiming stale lease on {} held by {} since {}",
                    lease.source.key(),
                    lease.worker_id,
                    lease.lease_start
                );
                let source = serde_json::to_string(&lease.source)?;
                self.store.set_add(&self.keys.pending(), &[source]).await?;
                reclaimed += 1;
            }
        }

        Ok(reclaimed)
    }

    /// Drops the sweep stamp if it is still the one this worker claimed
    async fn release_stamp(&self, stamp: &str) -> CoordinationResult<()> {
        let last_reset = self.keys.last_reset();
        if self.store.get(&last_reset).await?.as_deref() == Some(stamp) {
            self.store.delete(&[last_reset]).await?;
        }
        Ok(())
    }

    async fn persist_summary(&self, summary: &SweepSummary) -> CoordinationResult<()> {
        let mut fields = vec![
            ("RunId".to_string(), summary.run_id.clone()),
            ("CompletionTime".to_string(), summary.finished_at.to_rfc3339()),
            (
                "CompletedSources".to_string(),
                summary.sources_completed.to_string(),
            ),
            (
                "ArticlesProcessed".to_string(),
                summary.articles_processed.to_string(),
            ),
        ];
        if let Some(started) = summary.started_at {
            fields.push(("StartTime".to_string(), started.to_rfc3339()));
        }

        self.store
            .hash_set(&self.keys.run(&summary.run_id), &fields)
            .await?;
        self.store
            .set_add(&self.keys.runs(), &[summary.run_id.clone()])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<S: SetStore + 'static> WorkCoordinator for SharedStoreCoordinator<S> {
    async fn initialize(&self) -> CoordinationResult<InitOutcome> {
        let status = self.status().await?;
        if status.total() > 0 {
            return Ok(InitOutcome::AlreadyInitialized);
        }

        // Claiming the sweep stamp first keeps two workers from both seeding
        let last_reset = self.keys.last_reset();
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        if !self.store.set_if_absent(&last_reset, &stamp).await? {
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let sources = match self.catalog.get_all_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!("Source catalog unavailable, sweep has no sources: {}", e);
                self.release_stamp(&stamp).await?;
                return Ok(InitOutcome::CatalogUnavailable);
            }
        };

        let mut seen = HashSet::new();
        let sources: Vec<Source> = sources
            .into_iter()
            .filter(|source| seen.insert(source.key().to_string()))
            .collect();

        if sources.is_empty() {
            tracing::warn!("Source catalog is empty, nothing to crawl");
            self.release_stamp(&stamp).await?;
            return Ok(InitOutcome::CatalogEmpty);
        }

        // A forced reset may have replaced the stamp while the catalog loaded
        if self.store.get(&last_reset).await?.as_deref() != Some(stamp.as_str()) {
            tracing::warn!("Sweep stamp changed during seeding, leaving the sweep to its owner");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let members = sources
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        let seeded = self.store.set_add(&self.keys.pending(), &members).await?;

        tracing::info!("Initialized shared sweep with {} sources", seeded);
        Ok(InitOutcome::Seeded(seeded))
    }

    async fn acquire_sources(
        &self,
        batch_size: usize,
        worker_id: &str,
    ) -> CoordinationResult<Vec<Source>> {
        if let Some(timeout) = self.lease_timeout {
            self.reclaim_stale(timeout).await?;
        }

        let pending = self.keys.pending();
        let processing = self.keys.processing();
        let mut batch = Vec::with_capacity(batch_size);

        while batch.len() < batch_size {
            let Some(member) = self.store.set_pop(&pending).await? else {
                break;
            };
            let source: Source = match decode(&pending, &member) {
                Ok(source) => source,
                Err(e) => {
                    tracing::error!("Dropping unreadable pending entry: {}", e);
                    continue;
                }
            };

            let lease = serde_json::to_string(&LeaseRecord::new(source.clone(), worker_id))?;
            self.store.set_add(&processing, &[lease]).await?;
            batch.push(source);
        }

        if !batch.is_empty() {
            tracing::debug!("Leased {} sources to {}", batch.len(), worker_id);
            self.touch_worker(worker_id).await?;
        }
        Ok(batch)
    }

    async fn report_source_completion(
        &self,
        source: &Source,
        article_count: u64,
        worker_id: &str,
    ) -> CoordinationResult<CompletionOutcome> {
        let processing = self.keys.processing();
        let mut outcome = CompletionOutcome::Unmatched;

        for member in self.store.set_members(&processing).await? {
            let Ok(lease) = decode::<LeaseRecord>(&processing, &member) else {
                continue;
            };
            if lease.source.key() == source.key()
                && self.store.set_remove(&processing, &member).await?
            {
                outcome = CompletionOutcome::Released;
                break;
            }
        }

        if outcome == CompletionOutcome::Unmatched {
            // A reclaimed lease may already be back in Pending; the work is done
            let pending_member = serde_json::to_string(source)?;
            self.store
                .set_remove(&self.keys.pending(), &pending_member)
                .await?;
            tracing::warn!(
                "Completion of {} by {} matched no lease (late or duplicate report)",
                source.key(),
                worker_id
            );
        }

        let record = CompletionRecord::new(source.clone(), worker_id, article_count);
        self.store
            .set_add(&self.keys.completed(), &[serde_json::to_string(&record)?])
            .await?;

        let worker_key = self.keys.worker(worker_id);
        self.store
            .hash_incr(&worker_key, WORKER_SOURCES_FIELD, 1)
            .await?;
        self.store
            .hash_incr(&worker_key, WORKER_ARTICLES_FIELD, article_count as i64)
            .await?;
        self.touch_worker(worker_id).await?;

        Ok(outcome)
    }

    async fn is_work_complete(&self) -> CoordinationResult<bool> {
        let pending = self.store.set_len(&self.keys.pending()).await?;
        let processing = self.store.set_len(&self.keys.processing()).await?;
        Ok(pending == 0 && processing == 0)
    }

    async fn reset(&self) -> CoordinationResult<SweepSummary> {
        let completed: Vec<CompletionRecord> = self.members(&self.keys.completed()).await?;
        let started_at = self
            .store
            .get(&self.keys.last_reset())
            .await?
            .and_then(|v| parse_time(&v));

        let summary = SweepSummary {
            run_id: Uuid::new_v4().to_string(),
            started_at,
            finished_at: Utc::now(),
            sources_completed: completed.len() as u64,
            articles_processed: completed.iter().map(|c| c.article_count).sum(),
        };

        // History first, so a crash mid-reset never loses the summary
        self.persist_summary(&summary).await?;
        self.store
            .delete(&[
                self.keys.pending(),
                self.keys.processing(),
                self.keys.completed(),
                self.keys.last_reset(),
            ])
            .await?;

        tracing::info!(
            "Sweep {} finished: {} sources, {} articles",
            summary.run_id,
            summary.sources_completed,
            summary.articles_processed
        );

        self.initialize().await?;
        Ok(summary)
    }

    async fn reset_if_complete(&self) -> CoordinationResult<Option<SweepSummary>> {
        let Some(stamp) = self.store.get(&self.keys.last_reset()).await? else {
            return Ok(None);
        };

        // A stamp with no completions is a sweep still being seeded
        let status = self.status().await?;
        if !status.is_complete() || status.completed == 0 {
            return Ok(None);
        }

        // Exactly one worker wins the rollover of the sweep started at `stamp`
        let claim = self.keys.reset_claim(&stamp);
        if !self
            .store
            .set_if_absent(&claim, &Utc::now().to_rfc3339())
            .await?
        {
            return Ok(None);
        }

        self.reset().await.map(Some)
    }

    async fn status(&self) -> CoordinationResult<CoordinatorStatus> {
        Ok(CoordinatorStatus {
            pending: self.store.set_len(&self.keys.pending()).await?,
            processing: self.store.set_len(&self.keys.processing()).await?,
            completed: self.store.set_len(&self.keys.completed()).await?,
            sweep_started: self
                .store
                .get(&self.keys.last_reset())
                .await?
                .and_then(|v| parse_time(&v)),
        })
    }

    async fn snapshot(&self) -> CoordinationResult<PartitionSnapshot> {
        Ok(PartitionSnapshot {
            pending: self.members(&self.keys.pending()).await?,
            processing: self.members(&self.keys.processing()).await?,
            completed: self.members(&self.keys.completed()).await?,
        })
    }
}

fn decode<T: DeserializeOwned>(key: &str, member: &str) -> CoordinationResult<T> {
    serde_json::from_str(member).map_err(|e| CoordinationError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
