//! HTTP fetch transport against a mock server

use ripple_frontier::config::{Config, FetchConfig};
use ripple_frontier::crawler::{append_seeds, create_store, CrawlCycle, FrontierDir, HttpFetcher};
use ripple_frontier::output::SqliteDocumentSink;
use ripple_frontier::processor::{FetchOutcome, FetchResult, FetchTransport};
use ripple_frontier::{FrontierPolicy, Page, PageStore, RunFlag};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

fn fetcher() -> HttpFetcher {
    let mut config = FetchConfig::default();
    config.timeout_secs = 5;
    config.max_concurrent = 2;
    HttpFetcher::new(&config).unwrap()
}

async fn fetch_one(url: String) -> FetchResult {
    let mut results = fetcher().fetch(vec![Page::new(url)]).await.unwrap();
    assert_eq!(results.len(), 1);
    results.pop().unwrap()
}

fn recoverable(result: &FetchResult) -> Option<bool> {
    match &result.outcome {
        FetchOutcome::Success(_) => None,
        FetchOutcome::Failure { recoverable, .. } => Some(*recoverable),
    }
}

#[tokio::test]
async fn test_html_page_is_parsed() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<html><head><title>Home</title></head>
            <body><p>Welcome home</p><a href="/about">About us</a></body></html>"#),
    )
    .await;

    let result = fetch_one(format!("{}/", server.uri())).await;
    assert!(result.page.last_attempt > 0);
    match result.outcome {
        FetchOutcome::Success(doc) => {
            assert_eq!(doc.title.as_deref(), Some("Home"));
            assert!(doc.text.contains("Welcome home"));
            assert_eq!(doc.outlinks.len(), 1);
            assert_eq!(doc.outlinks[0].url, format!("{}/about", server.uri()));
            assert_eq!(doc.outlinks[0].anchor, "About us");
        }
        other => panic!("expected success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;
    mount(&server, "/gone", ResponseTemplate::new(404)).await;
    mount(&server, "/busy", ResponseTemplate::new(503)).await;
    mount(&server, "/slow-down", ResponseTemplate::new(429)).await;
    mount(
        &server,
        "/image",
        ResponseTemplate::new(200).set_body_raw(vec![0u8, 1, 2, 3], "image/png"),
    )
    .await;

    let base = server.uri();
    assert_eq!(recoverable(&fetch_one(format!("{}/gone", base)).await), Some(false));
    assert_eq!(recoverable(&fetch_one(format!("{}/busy", base)).await), Some(true));
    assert_eq!(recoverable(&fetch_one(format!("{}/slow-down", base)).await), Some(true));
    assert_eq!(recoverable(&fetch_one(format!("{}/image", base)).await), Some(false));
}

#[tokio::test]
async fn test_batch_returns_one_result_per_page() {
    let server = MockServer::start().await;
    for route in ["/a", "/b", "/c"] {
        mount(&server, route, html("<p>page</p>")).await;
    }

    let batch: Vec<Page> = ["/a", "/b", "/c", "/missing"]
        .iter()
        .map(|route| Page::new(format!("{}{}", server.uri(), route)))
        .collect();
    let results = fetcher().fetch(batch).await.unwrap();
    assert_eq!(results.len(), 4);

    let failed: Vec<&str> = results
        .iter()
        .filter(|r| recoverable(r).is_some())
        .map(|r| r.page.url.as_str())
        .collect();
    assert_eq!(failed, vec![format!("{}/missing", server.uri())]);
}

#[tokio::test]
async fn test_crawl_cycle_over_http_into_sqlite() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<html><head><title>Root</title></head><body>root text <a href="/leaf">Leaf</a></body></html>"#),
    )
    .await;
    mount(&server, "/leaf", html("<html><body>leaf text</body></html>")).await;

    let dir = TempDir::new().unwrap();
    let config = Config::default();
    let root = format!("{}/", server.uri());
    let leaf = format!("{}/leaf", server.uri());

    let store = PageStore::new(FrontierDir::new(dir.path()).current());
    create_store(&store).unwrap();
    append_seeds(&store, [root.as_str()], &FrontierPolicy::from_config(&config)).unwrap();

    let sink = Arc::new(SqliteDocumentSink::open(&dir.path().join("docs.db")).unwrap());
    let driver = CrawlCycle::new(dir.path(), &config, Arc::new(fetcher()), sink.clone());
    let reports = driver.run(2, &RunFlag::new()).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].scheduled, 1);
    assert_eq!(reports[1].scheduled, 2);

    assert_eq!(sink.document_count().unwrap(), 2);
    assert_eq!(sink.get(&root).unwrap().unwrap().title.as_deref(), Some("Root"));
    let stored_leaf = sink.get(&leaf).unwrap().unwrap();
    assert_eq!(stored_leaf.text, "leaf text");
    assert_eq!(stored_leaf.anchors, "Leaf");

    let pages: Vec<Page> = driver.current().iter().unwrap().map(|p| p.unwrap()).collect();
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|p| p.is_fetched()));
}
