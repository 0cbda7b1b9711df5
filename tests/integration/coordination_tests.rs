//! Lease coordination properties, checked against both backends

use async_trait::async_trait;
use newsweep::catalog::{CatalogResult, SourceCatalog, StaticCatalog};
use newsweep::coordination::{
    CompletionOutcome, InitOutcome, KeySchema, LocalCoordinator, MemoryStore,
    SharedStoreCoordinator, WorkCoordinator,
};
use newsweep::Source;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn source(name: &str) -> Source {
    Source::new(
        name,
        &format!("https://{}.example/rss", name.to_lowercase()),
        &["world"],
        Some("rss"),
    )
    .unwrap()
}

fn sources(names: &[&str]) -> Vec<Source> {
    names.iter().map(|n| source(n)).collect()
}

/// One coordinator per backend over the same catalog
fn backends(names: &[&str]) -> Vec<(&'static str, Arc<dyn WorkCoordinator>)> {
    backends_with(|| Arc::new(StaticCatalog::new(sources(names))))
}

/// One coordinator per backend, each over its own catalog from `catalog`
fn backends_with(
    catalog: impl Fn() -> Arc<dyn SourceCatalog>,
) -> Vec<(&'static str, Arc<dyn WorkCoordinator>)> {
    let local = LocalCoordinator::new(catalog());
    let shared = SharedStoreCoordinator::new(
        Arc::new(MemoryStore::new()),
        catalog(),
        KeySchema::new("test"),
    );

    vec![
        ("local", Arc::new(local) as Arc<dyn WorkCoordinator>),
        ("shared", Arc::new(shared) as Arc<dyn WorkCoordinator>),
    ]
}

/// Answers the first call at once and every later call after `delay`
struct SlowCatalog {
    sources: Vec<Source>,
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowCatalog {
    fn new(names: &[&str], delay: Duration) -> Self {
        Self {
            sources: sources(names),
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    async fn wait_turn(&self) {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl SourceCatalog for SlowCatalog {
    async fn get_all_sources(&self) -> CatalogResult<Vec<Source>> {
        self.wait_turn().await;
        Ok(self.sources.clone())
    }

    async fn get_sources_filtered(
        &self,
        _category: Option<&str>,
        _provider_type: Option<&str>,
        limit: usize,
    ) -> CatalogResult<Vec<Source>> {
        self.wait_turn().await;
        Ok(self.sources.iter().take(limit).cloned().collect())
    }
}

#[tokio::test]
async fn test_three_source_scenario() {
    for (backend, coordinator) in backends(&["A", "B", "C"]) {
        assert_eq!(
            coordinator.initialize().await.unwrap(),
            InitOutcome::Seeded(3),
            "{}",
            backend
        );

        let first = coordinator.acquire_sources(2, "w1").await.unwrap();
        let second = coordinator.acquire_sources(2, "w2").await.unwrap();
        assert_eq!(first.len(), 2, "{}", backend);
        assert_eq!(second.len(), 1, "{}", backend);

        let leased: HashSet<String> = first
            .iter()
            .chain(second.iter())
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(leased.len(), 3, "{}", backend);
        assert!(!coordinator.is_work_complete().await.unwrap());

        let counts: HashMap<&str, u64> = [("A", 5), ("B", 0), ("C", 3)].into_iter().collect();
        for (worker, batch) in [("w1", &first), ("w2", &second)] {
            for source in batch.iter() {
                let outcome = coordinator
                    .report_source_completion(source, counts[source.name.as_str()], worker)
                    .await
                    .unwrap();
                assert_eq!(outcome, CompletionOutcome::Released, "{}", backend);
            }
        }

        assert!(coordinator.is_work_complete().await.unwrap(), "{}", backend);

        let snapshot = coordinator.snapshot().await.unwrap();
        assert!(snapshot.pending.is_empty());
        assert!(snapshot.processing.is_empty());

        let mut completed: Vec<(String, u64)> = snapshot
            .completed
            .iter()
            .map(|c| (c.source.name.clone(), c.article_count))
            .collect();
        completed.sort();
        assert_eq!(
            completed,
            vec![
                ("A".to_string(), 5),
                ("B".to_string(), 0),
                ("C".to_string(), 3)
            ],
            "{}",
            backend
        );
    }
}

#[tokio::test]
async fn test_concurrent_acquire_never_double_leases() {
    let names: Vec<String> = (0..40).map(|i| format!("s{}", i)).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

    for (backend, coordinator) in backends(&name_refs) {
        coordinator.initialize().await.unwrap();

        let mut handles = Vec::new();
        for worker in 0..8 {
            let coordinator = Arc::clone(&coordinator);
            handles.push(tokio::spawn(async move {
                let worker_id = format!("w{}", worker);
                let mut mine = Vec::new();
                loop {
                    let batch = coordinator.acquire_sources(3, &worker_id).await.unwrap();
                    if batch.is_empty() {
                        break;
                    }
                    mine.extend(batch.into_iter().map(|s| s.url));
                    tokio::task::yield_now().await;
                }
                mine
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }

        let distinct: HashSet<&String> = all.iter().collect();
        assert_eq!(all.len(), 40, "{}", backend);
        assert_eq!(distinct.len(), 40, "{}", backend);

        let status = coordinator.status().await.unwrap();
        assert_eq!(status.pending, 0);
        assert_eq!(status.processing, 40);
    }
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    for (backend, coordinator) in backends(&["A", "B", "C"]) {
        assert_eq!(coordinator.initialize().await.unwrap(), InitOutcome::Seeded(3));
        coordinator.acquire_sources(1, "w1").await.unwrap();

        assert_eq!(
            coordinator.initialize().await.unwrap(),
            InitOutcome::AlreadyInitialized,
            "{}",
            backend
        );

        let status = coordinator.status().await.unwrap();
        assert_eq!((status.pending, status.processing), (2, 1), "{}", backend);
    }
}

#[tokio::test]
async fn test_workers_converge_on_completion() {
    for (backend, coordinator) in backends(&["A", "B", "C", "D", "E", "F", "G"]) {
        coordinator.initialize().await.unwrap();

        let mut handles = Vec::new();
        for worker in ["w1", "w2", "w3"] {
            let coordinator = Arc::clone(&coordinator);
            handles.push(tokio::spawn(async move {
                loop {
                    let batch = coordinator.acquire_sources(2, worker).await.unwrap();
                    if batch.is_empty() {
                        if coordinator.is_work_complete().await.unwrap() {
                            break;
                        }
                        tokio::task::yield_now().await;
                        continue;
                    }
                    for source in &batch {
                        coordinator
                            .report_source_completion(source, 1, worker)
                            .await
                            .unwrap();
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.completed.len(), 7, "{}", backend);
        assert_eq!(snapshot.articles_processed(), 7, "{}", backend);
    }
}

#[tokio::test]
async fn test_reset_reseeds_after_summary() {
    for (backend, coordinator) in backends(&["A", "B", "C"]) {
        coordinator.initialize().await.unwrap();
        for source in coordinator.acquire_sources(3, "w1").await.unwrap() {
            coordinator
                .report_source_completion(&source, 2, "w1")
                .await
                .unwrap();
        }

        let summary = coordinator.reset().await.unwrap();
        assert_eq!(summary.sources_completed, 3, "{}", backend);
        assert_eq!(summary.articles_processed, 6, "{}", backend);
        assert!(summary.started_at.is_some());

        let status = coordinator.status().await.unwrap();
        assert_eq!(
            (status.pending, status.processing, status.completed),
            (3, 0, 0),
            "{}",
            backend
        );
    }
}

#[tokio::test]
async fn test_unleased_report_is_recorded() {
    for (backend, coordinator) in backends(&["A", "B"]) {
        coordinator.initialize().await.unwrap();

        let outcome = coordinator
            .report_source_completion(&source("A"), 4, "w9")
            .await
            .unwrap();
        assert_eq!(outcome, CompletionOutcome::Unmatched, "{}", backend);

        let snapshot = coordinator.snapshot().await.unwrap();
        assert_eq!(snapshot.completed.len(), 1, "{}", backend);
        // Never in two partitions at once
        assert_eq!(snapshot.pending.len(), 1, "{}", backend);
        assert_eq!(snapshot.pending[0].name, "B");
    }
}

#[tokio::test]
async fn test_rollover_during_slow_catalog_leases_once() {
    let backends = backends_with(|| {
        Arc::new(SlowCatalog::new(&["A", "B", "C"], Duration::from_millis(300)))
    });

    for (backend, coordinator) in backends {
        coordinator.initialize().await.unwrap();
        for source in coordinator.acquire_sources(3, "w0").await.unwrap() {
            coordinator
                .report_source_completion(&source, 1, "w0")
                .await
                .unwrap();
        }

        let roller = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.reset_if_complete().await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The new sweep is still loading its catalog
        assert!(
            coordinator.reset_if_complete().await.unwrap().is_none(),
            "{}",
            backend
        );
        coordinator.initialize().await.unwrap();
        let second = coordinator.acquire_sources(10, "w2").await.unwrap();

        let summary = roller.await.unwrap().expect("the first worker rolls over");
        assert_eq!(summary.sources_completed, 3, "{}", backend);
        assert_eq!(summary.articles_processed, 3, "{}", backend);

        assert!(
            coordinator.reset_if_complete().await.unwrap().is_none(),
            "{}",
            backend
        );
        let third = coordinator.acquire_sources(10, "w3").await.unwrap();

        let leased: Vec<&str> = second.iter().chain(third.iter()).map(Source::key).collect();
        let distinct: HashSet<&str> = leased.iter().copied().collect();
        assert_eq!(leased.len(), 3, "{}", backend);
        assert_eq!(distinct.len(), 3, "{}", backend);

        let snapshot = coordinator.snapshot().await.unwrap();
        let pending: HashSet<&str> = snapshot.pending.iter().map(Source::key).collect();
        let processing: HashSet<&str> = snapshot.processing.iter().map(|l| l.source.key()).collect();
        assert!(pending.is_disjoint(&processing), "{}", backend);
        assert_eq!(processing.len(), 3, "{}", backend);
        assert!(snapshot.completed.is_empty(), "{}", backend);
    }
}
