//! Full sweeps: coordinator, pipelines and publisher wired together

use newsweep::catalog::StaticCatalog;
use newsweep::classify::RuleClassifier;
use newsweep::config::{UserAgentConfig, WorkerConfig};
use newsweep::coordination::{
    KeySchema, LocalCoordinator, MemoryStore, SharedStoreCoordinator, WorkCoordinator,
};
use newsweep::crawler::{build_http_client, PipelineSettings, SourcePipeline, Worker};
use newsweep::publish::SqlitePublisher;
use newsweep::Source;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    build_http_client(&user_agent, &WorkerConfig::default()).unwrap()
}

fn worker_config(name: &str) -> WorkerConfig {
    WorkerConfig {
        server_name: Some(name.to_string()),
        batch_size: 2,
        worker_threads: 2,
        poll_delay_secs: 1,
        ..WorkerConfig::default()
    }
}

/// Serves `/<feed>.xml` with `count` items linking to unique article URLs
async fn serve_feed(server: &MockServer, feed: &str, count: usize) {
    let items: String = (0..count)
        .map(|i| {
            format!(
                "<item><title>{feed} story {i}</title><link>https://{feed}.example/{i}</link></item>"
            )
        })
        .collect();
    let body = format!("<rss><channel><title>{feed}</title>{items}</channel></rss>");

    Mock::given(method("GET"))
        .and(path(format!("/{}.xml", feed)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Three feeds with 3, 2 and 0 articles, plus one that answers 404
async fn feed_sources(server: &MockServer) -> Vec<Source> {
    serve_feed(server, "alpha", 3).await;
    serve_feed(server, "beta", 2).await;
    serve_feed(server, "gamma", 0).await;
    Mock::given(method("GET"))
        .and(path("/gone.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    ["alpha", "beta", "gamma", "gone"]
        .iter()
        .map(|name| {
            Source::new(
                name,
                &format!("{}/{}.xml", server.uri(), name),
                &["world"],
                Some("rss"),
            )
            .unwrap()
        })
        .collect()
}

fn pipeline(publisher: Arc<SqlitePublisher>) -> Arc<SourcePipeline> {
    let classifier = RuleClassifier::new(vec!["world".to_string()], BTreeMap::new());
    Arc::new(SourcePipeline::new(
        client(),
        Arc::new(classifier),
        publisher,
        PipelineSettings::default(),
    ))
}

#[tokio::test]
async fn test_single_worker_sweep() {
    let server = MockServer::start().await;
    let sources = feed_sources(&server).await;

    let coordinator = Arc::new(LocalCoordinator::new(Arc::new(StaticCatalog::new(sources))));
    let publisher = Arc::new(SqlitePublisher::new_in_memory().unwrap());
    let worker = Worker::new(
        &worker_config("w1"),
        coordinator.clone(),
        pipeline(publisher.clone()),
        publisher.clone(),
    );

    let totals = worker.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(totals.sources, 4);
    assert_eq!(totals.articles, 5);

    assert_eq!(publisher.count_articles().unwrap(), 5);
    assert_eq!(
        publisher.count_by_category().unwrap(),
        vec![("world".to_string(), 5)]
    );
    assert_eq!(publisher.latest_stats("w1").unwrap(), Some((4, 5)));

    let snapshot = coordinator.snapshot().await.unwrap();
    assert_eq!(snapshot.completed.len(), 4);
    assert_eq!(snapshot.articles_processed(), 5);
    let gone = snapshot
        .completed
        .iter()
        .find(|c| c.source.name == "gone")
        .unwrap();
    assert_eq!(gone.article_count, 0);
}

#[tokio::test]
async fn test_next_cycle_rolls_over_the_sweep() {
    let server = MockServer::start().await;
    let sources = feed_sources(&server).await;

    let coordinator = Arc::new(LocalCoordinator::new(Arc::new(StaticCatalog::new(sources))));
    let publisher = Arc::new(SqlitePublisher::new_in_memory().unwrap());
    let worker = Worker::new(
        &worker_config("w1"),
        coordinator.clone(),
        pipeline(publisher.clone()),
        publisher.clone(),
    );

    let cancel = CancellationToken::new();
    worker.run_once(&cancel).await.unwrap();
    worker.run_once(&cancel).await.unwrap();

    let history = coordinator.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sources_completed, 4);
    assert_eq!(history[0].articles_processed, 5);

    // Articles are keyed by link, so the second sweep updates in place
    assert_eq!(publisher.count_articles().unwrap(), 5);
    // Each stats row covers one sweep
    assert_eq!(publisher.latest_stats("w1").unwrap(), Some((4, 5)));
}

#[tokio::test]
async fn test_two_workers_share_one_store() {
    let server = MockServer::start().await;
    let sources = feed_sources(&server).await;

    let coordinator: Arc<dyn WorkCoordinator> = Arc::new(SharedStoreCoordinator::new(
        Arc::new(MemoryStore::new()),
        Arc::new(StaticCatalog::new(sources)),
        KeySchema::new("fleet"),
    ));
    coordinator.initialize().await.unwrap();

    let publisher = Arc::new(SqlitePublisher::new_in_memory().unwrap());
    let mut handles = Vec::new();
    for name in ["w1", "w2"] {
        let worker = Worker::new(
            &worker_config(name),
            Arc::clone(&coordinator),
            pipeline(publisher.clone()),
            publisher.clone(),
        )
        .with_poll_delay(Duration::from_millis(20));

        handles.push(tokio::spawn(async move {
            worker.run_sweep(&CancellationToken::new()).await.unwrap()
        }));
    }

    let mut sources_done = 0;
    let mut articles_done = 0;
    for handle in handles {
        let totals = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap();
        sources_done += totals.sources;
        articles_done += totals.articles;
    }

    assert_eq!(sources_done, 4);
    assert_eq!(articles_done, 5);
    assert!(coordinator.is_work_complete().await.unwrap());

    let snapshot = coordinator.snapshot().await.unwrap();
    assert_eq!(snapshot.completed.len(), 4);
    assert_eq!(publisher.count_articles().unwrap(), 5);
}
