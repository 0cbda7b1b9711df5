//! Crawler worker loop
//!
//! A worker repeatedly leases batches of sources from the coordinator, runs
//! them through a [`SourceProcessor`] with bounded parallelism, and reports
//! every lease back before asking for more. After each sweep it reports that
//! sweep's totals to the publisher and sleeps the sweep interval.

use crate::config::WorkerConfig;
use crate::coordination::{CompletionOutcome, CoordinationResult, InitOutcome, WorkCoordinator};
use crate::crawler::pipeline::SourceProcessor;
use crate::publish::Publisher;
use crate::state::{Source, SweepSummary};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Sources and articles handled by one worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepTotals {
    pub sources: u64,
    pub articles: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sources: AtomicU64,
    articles: AtomicU64,
}

impl Counters {
    fn record(&self, articles: u64) {
        self.sources.fetch_add(1, Ordering::Relaxed);
        self.articles.fetch_add(articles, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.sources.store(0, Ordering::Relaxed);
        self.articles.store(0, Ordering::Relaxed);
    }

    fn totals(&self) -> SweepTotals {
        SweepTotals {
            sources: self.sources.load(Ordering::Relaxed),
            articles: self.articles.load(Ordering::Relaxed),
        }
    }
}

pub struct Worker {
    worker_id: String,
    coordinator: Arc<dyn WorkCoordinator>,
    processor: Arc<dyn SourceProcessor>,
    publisher: Arc<dyn Publisher>,
    batch_size: usize,
    poll_delay: Duration,
    sweep_interval: Duration,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
}

impl Worker {
    pub fn new(
        config: &WorkerConfig,
        coordinator: Arc<dyn WorkCoordinator>,
        processor: Arc<dyn SourceProcessor>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            worker_id: config.worker_id(),
            coordinator,
            processor,
            publisher,
            batch_size: config.batch_size.max(1),
            poll_delay: Duration::from_secs(config.poll_delay_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            semaphore: Arc::new(Semaphore::new(config.worker_threads.max(1))),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Totals of the current or most recent cycle
    pub fn totals(&self) -> SweepTotals {
        self.counters.totals()
    }

    /// Runs sweeps until `cancel` fires
    ///
    /// Sweep failures are logged and retried after the sweep interval.
    pub async fn run(&self, cancel: &CancellationToken) {
        tracing::info!(worker_id = %self.worker_id, "Worker starting");

        while !cancel.is_cancelled() {
            match self.run_once(cancel).await {
                Ok(totals) => tracing::info!(
                    worker_id = %self.worker_id,
                    "Sweep finished: {} sources, {} articles",
                    totals.sources,
                    totals.articles
                ),
                Err(e) => tracing::warn!(worker_id = %self.worker_id, "Sweep aborted: {}", e),
            }

            tracing::info!(
                worker_id = %self.worker_id,
                "Next sweep in {}s",
                self.sweep_interval.as_secs()
            );
            if !sleep_or_cancel(self.sweep_interval, cancel).await {
                break;
            }
        }

        tracing::info!(worker_id = %self.worker_id, "Worker stopped");
    }

    /// One full cycle: roll over a finished sweep, seed, drain, report stats
    pub async fn run_once(&self, cancel: &CancellationToken) -> CoordinationResult<SweepTotals> {
        self.counters.clear();

        if let Some(summary) = self.coordinator.reset_if_complete().await? {
            log_summary(&summary);
        }

        match self.coordinator.initialize().await? {
            InitOutcome::Seeded(count) => {
                tracing::info!(count, "Seeded new sweep with {} sources", count)
            }
            InitOutcome::AlreadyInitialized => tracing::debug!("Joining sweep in progress"),
            InitOutcome::CatalogEmpty => tracing::warn!("Source catalog is empty"),
            InitOutcome::CatalogUnavailable => {
                tracing::warn!("Source catalog unavailable; retrying next sweep")
            }
        }

        let result = self.run_sweep(cancel).await;
        self.report_stats().await;
        result
    }

    /// Leases and processes batches until the sweep is complete
    ///
    /// When nothing is pending but other workers still hold leases, waits the
    /// poll delay and asks again.
    pub async fn run_sweep(&self, cancel: &CancellationToken) -> CoordinationResult<SweepTotals> {
        let mut totals = SweepTotals::default();

        while !cancel.is_cancelled() {
            let batch = self
                .coordinator
                .acquire_sources(self.batch_size, &self.worker_id)
                .await?;

            if batch.is_empty() {
                if self.coordinator.is_work_complete().await? {
                    tracing::info!(worker_id = %self.worker_id, "Sweep complete");
                    break;
                }
                tracing::debug!("No pending sources; waiting on other workers");
                if !sleep_or_cancel(self.poll_delay, cancel).await {
                    break;
                }
                continue;
            }

            tracing::info!(
                worker_id = %self.worker_id,
                count = batch.len(),
                "Leased {} sources",
                batch.len()
            );
            let batch_totals = self.process_batch(batch).await;
            totals.sources += batch_totals.sources;
            totals.articles += batch_totals.articles;
        }

        Ok(totals)
    }

    /// Runs every leased source and waits for all of them to be reported
    ///
    /// The whole batch is dispatched even if cancellation fires meanwhile, so
    /// no lease is left behind.
    async fn process_batch(&self, batch: Vec<Source>) -> SweepTotals {
        let mut tasks = JoinSet::new();

        for source in batch {
            // Suspends while every slot is busy
            let permit = Arc::clone(&self.semaphore).acquire_owned().await.ok();

            let coordinator = Arc::clone(&self.coordinator);
            let processor = Arc::clone(&self.processor);
            let counters = Arc::clone(&self.counters);
            let worker_id = self.worker_id.clone();

            tasks.spawn(async move {
                let published = run_isolated(processor, source.clone()).await;
                drop(permit);

                report_completion(coordinator.as_ref(), &source, published, &worker_id).await;
                counters.record(published);
                published
            });
        }

        let mut totals = SweepTotals::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(published) => {
                    totals.sources += 1;
                    totals.articles += published;
                }
                Err(e) => tracing::error!("Source task failed: {}", e),
            }
        }
        totals
    }

    async fn report_stats(&self) {
        let totals = self.totals();
        if let Err(e) = self
            .publisher
            .report_stats(&self.worker_id, totals.sources, totals.articles)
            .await
        {
            tracing::warn!(worker_id = %self.worker_id, "Failed to report stats: {}", e);
        }
    }
}

/// Runs the processor on its own task so a panic costs only this source
async fn run_isolated(processor: Arc<dyn SourceProcessor>, source: Source) -> u64 {
    let url = source.url.clone();
    match tokio::spawn(async move { processor.process(&source).await }).await {
        Ok(published) => published,
        Err(e) => {
            tracing::error!(source = %url, "Pipeline crashed: {}", e);
            0
        }
    }
}

async fn report_completion(
    coordinator: &dyn WorkCoordinator,
    source: &Source,
    published: u64,
    worker_id: &str,
) {
    match coordinator
        .report_source_completion(source, published, worker_id)
        .await
    {
        Ok(CompletionOutcome::Released) => {
            tracing::debug!(source = %source.url, count = published, "Reported source")
        }
        // The coordinator logs the anomaly
        Ok(CompletionOutcome::Unmatched) => {}
        Err(e) => tracing::error!(source = %source.url, "Failed to report completion: {}", e),
    }
}

fn log_summary(summary: &SweepSummary) {
    let duration = summary
        .duration()
        .map(|d| format!("{}s", d.num_seconds()))
        .unwrap_or_else(|| "unknown".to_string());
    tracing::info!(
        "Rolled over sweep {}: {} sources, {} articles in {}",
        summary.run_id,
        summary.sources_completed,
        summary.articles_processed,
        duration
    );
}

/// Sleeps for `duration`; returns false if cancelled first
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
