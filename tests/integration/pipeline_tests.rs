//! Source pipeline against wiremock feeds

use async_trait::async_trait;
use newsweep::classify::{Classifier, ClassifyError, ClassifyResult, RuleClassifier};
use newsweep::config::{UserAgentConfig, WorkerConfig};
use newsweep::crawler::{build_http_client, PipelineSettings, SourcePipeline, SourceProcessor};
use newsweep::publish::SqlitePublisher;
use newsweep::Source;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Unavailable;

#[async_trait]
impl Classifier for Unavailable {
    async fn classify(
        &self,
        _title: &str,
        _content: &str,
        _source_name: &str,
        _category_hint: Option<&str>,
    ) -> ClassifyResult<String> {
        Err(ClassifyError::Status(503))
    }
}

/// Records the hint it was given and echoes it back as the label
#[derive(Default)]
struct HintRecorder {
    hints: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl Classifier for HintRecorder {
    async fn classify(
        &self,
        _title: &str,
        _content: &str,
        _source_name: &str,
        category_hint: Option<&str>,
    ) -> ClassifyResult<String> {
        self.hints
            .lock()
            .unwrap()
            .push(category_hint.map(str::to_string));
        Ok(category_hint.unwrap_or("none").to_lowercase())
    }
}

fn client() -> reqwest::Client {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    build_http_client(&user_agent, &WorkerConfig::default()).unwrap()
}

fn rules() -> Arc<dyn Classifier> {
    let mut keywords = BTreeMap::new();
    keywords.insert("technology".to_string(), vec!["chip".to_string()]);
    Arc::new(RuleClassifier::new(
        vec!["world".to_string(), "technology".to_string()],
        keywords,
    ))
}

fn feed_source(server: &MockServer, categories: &[&str]) -> Source {
    Source::new(
        "Daily",
        &format!("{}/feed.xml", server.uri()),
        categories,
        Some("rss"),
    )
    .unwrap()
}

fn rss(items: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Daily</title>{}</channel></rss>"#,
        items
    )
}

async fn serve_feed(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_item_without_link_is_dropped() {
    let server = MockServer::start().await;
    serve_feed(
        &server,
        rss(r#"
            <item><title>Kept one</title><link>/news/1</link><description>&lt;p&gt;First&lt;/p&gt;</description></item>
            <item><title>No link here</title><description>Orphan</description></item>
            <item><title>Kept two</title><link>https://daily.example/news/2</link></item>
        "#),
    )
    .await;

    let publisher = Arc::new(SqlitePublisher::new_in_memory().unwrap());
    let pipeline = SourcePipeline::new(
        client(),
        rules(),
        publisher.clone(),
        PipelineSettings::default(),
    );
    let source = feed_source(&server, &["World"]);

    let outcome = pipeline.run(&source).await;
    assert_eq!(outcome.extracted, 2);
    assert_eq!(outcome.published, 2);
    assert_eq!(publisher.count_articles().unwrap(), 2);

    let articles = pipeline.collect_articles(&source).await.unwrap();
    assert_eq!(articles[0].title, "Kept one");
    assert_eq!(articles[0].url, format!("{}/news/1", server.uri()));
    assert_eq!(articles[0].summary, "First");
    assert_eq!(articles[0].category, "world");
    assert_eq!(articles[1].url, "https://daily.example/news/2");
}

#[tokio::test]
async fn test_classifier_failure_uses_fallback_label() {
    let server = MockServer::start().await;
    serve_feed(
        &server,
        rss("<item><title>Anything</title><link>https://daily.example/a</link></item>"),
    )
    .await;

    let pipeline = SourcePipeline::new(
        client(),
        Arc::new(Unavailable),
        Arc::new(SqlitePublisher::new_in_memory().unwrap()),
        PipelineSettings::default(),
    );

    let articles = pipeline
        .collect_articles(&feed_source(&server, &[]))
        .await
        .unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].category, "uncategorized");
}

#[tokio::test]
async fn test_failed_feed_publishes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let publisher = Arc::new(SqlitePublisher::new_in_memory().unwrap());
    let pipeline = SourcePipeline::new(
        client(),
        rules(),
        publisher.clone(),
        PipelineSettings::default(),
    );

    assert_eq!(pipeline.process(&feed_source(&server, &[])).await, 0);
    assert_eq!(publisher.count_articles().unwrap(), 0);
}

#[tokio::test]
async fn test_not_a_feed_publishes_nothing() {
    let server = MockServer::start().await;
    serve_feed(&server, "<html><body>Moved</body></html>".to_string()).await;

    let pipeline = SourcePipeline::new(
        client(),
        rules(),
        Arc::new(SqlitePublisher::new_in_memory().unwrap()),
        PipelineSettings::default(),
    );

    let source = feed_source(&server, &[]);
    assert!(pipeline.collect_articles(&source).await.is_err());
    assert_eq!(pipeline.process(&source).await, 0);
}

#[tokio::test]
async fn test_full_content_and_item_cap() {
    let server = MockServer::start().await;
    let items: String = (1..=4)
        .map(|i| {
            format!(
                "<item><title>Story {i}</title><link>{}/story/{i}</link><description>Teaser {i}</description></item>",
                server.uri()
            )
        })
        .collect();
    serve_feed(&server, rss(&items)).await;

    Mock::given(method("GET"))
        .and(path("/story/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><nav>Menu</nav><article><p>New chip   announced</p></article></body></html>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/story/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let settings = PipelineSettings {
        max_items: 2,
        fetch_full_content: true,
        ..PipelineSettings::default()
    };
    let pipeline = SourcePipeline::new(
        client(),
        rules(),
        Arc::new(SqlitePublisher::new_in_memory().unwrap()),
        settings,
    );

    let articles = pipeline
        .collect_articles(&feed_source(&server, &[]))
        .await
        .unwrap();

    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].content, "New chip announced");
    assert_eq!(articles[0].category, "technology");
    // Unreachable page falls back to the summary
    assert_eq!(articles[1].content, "Teaser 2");
}

#[tokio::test]
async fn test_item_category_beats_source_hint() {
    let server = MockServer::start().await;
    serve_feed(
        &server,
        rss(r#"
            <item><title>Tagged</title><link>https://daily.example/1</link><category>Technology</category></item>
            <item><title>Untagged</title><link>https://daily.example/2</link></item>
        "#),
    )
    .await;

    let recorder = Arc::new(HintRecorder::default());
    let pipeline = SourcePipeline::new(
        client(),
        recorder.clone(),
        Arc::new(SqlitePublisher::new_in_memory().unwrap()),
        PipelineSettings::default(),
    );

    let articles = pipeline
        .collect_articles(&feed_source(&server, &["world"]))
        .await
        .unwrap();

    assert_eq!(
        *recorder.hints.lock().unwrap(),
        vec![Some("Technology".to_string()), Some("world".to_string())]
    );
    assert_eq!(articles[0].category, "technology");
    assert_eq!(articles[1].category, "world");
}
