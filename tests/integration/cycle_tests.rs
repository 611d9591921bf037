//! Full crawl cycles over a frontier directory with a scripted transport

use async_trait::async_trait;
use ripple_frontier::config::{Config, FetchConfig};
use ripple_frontier::crawler::{append_seeds, create_store, CrawlCycle, FrontierDir, HttpFetcher};
use ripple_frontier::output::SqliteDocumentSink;
use ripple_frontier::page::now_millis;
use ripple_frontier::processor::{
    DocumentPipeline, FetchResult, FetchTransport, FetchedDocument, NullPipeline, Outlink,
};
use ripple_frontier::{FrontierPolicy, Page, PageStore, RunFlag};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const A: &str = "https://a.example/";
const B: &str = "https://b.example/";

#[derive(Clone)]
enum Scripted {
    Document(FetchedDocument),
    Fail { recoverable: bool },
}

/// Transport answering from a script that tests can change between cycles
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<HashMap<String, Scripted>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn set(&self, url: &str, answer: Scripted) {
        self.script.lock().unwrap().insert(url.to_string(), answer);
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl FetchTransport for ScriptedTransport {
    async fn fetch(&self, batch: Vec<Page>) -> ripple_frontier::Result<Vec<FetchResult>> {
        let script = self.script.lock().unwrap().clone();
        let mut results = Vec::new();
        for mut page in batch {
            self.requested.lock().unwrap().push(page.url.clone());
            page.last_attempt = now_millis();
            let result = match script.get(&page.url) {
                Some(Scripted::Document(doc)) => FetchResult::success(page, doc.clone()),
                Some(Scripted::Fail { recoverable }) => {
                    FetchResult::failure(page, *recoverable, "scripted failure")
                }
                None => FetchResult::failure(page, false, "HTTP 404"),
            };
            results.push(result);
        }
        Ok(results)
    }
}

fn document(text: &str, links: &[&str]) -> Scripted {
    Scripted::Document(FetchedDocument {
        title: None,
        text: text.to_string(),
        outlinks: links.iter().map(|l| Outlink::new(*l, "link")).collect(),
    })
}

fn seed(dir: &TempDir, config: &Config, urls: &[&str]) {
    let store = PageStore::new(FrontierDir::new(dir.path()).current());
    create_store(&store).unwrap();
    append_seeds(&store, urls, &FrontierPolicy::from_config(config)).unwrap();
}

fn driver(
    dir: &TempDir,
    config: &Config,
    transport: Arc<ScriptedTransport>,
    pipeline: Arc<dyn DocumentPipeline>,
) -> CrawlCycle {
    CrawlCycle::new(dir.path(), config, transport, pipeline).with_trimmer_seed(11)
}

fn pages(driver: &CrawlCycle) -> HashMap<String, Page> {
    driver
        .current()
        .iter()
        .unwrap()
        .map(|p| {
            let p = p.unwrap();
            (p.url.clone(), p)
        })
        .collect()
}

fn hotspot_only_a(front_size: u64) -> Config {
    let mut config = Config::default();
    config.frontier.max_distance = 0;
    config.frontier.hotspots = vec![A.to_string()];
    config.frontier.restrict_to_hotspots = true;
    config.discovery.front_size = front_size;
    config
}

#[tokio::test]
async fn test_dangling_hotspot_survives_alone() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.frontier.max_distance = 0;
    config.frontier.hotspots = vec!["*".to_string()];
    seed(&dir, &config, &[A]);

    let transport = Arc::new(ScriptedTransport::default());
    transport.set(A, document("a page with no links", &[]));
    let driver = driver(&dir, &config, transport, Arc::new(NullPipeline));
    driver.run_cycle(&RunFlag::new()).await.unwrap();

    let pages = pages(&driver);
    assert_eq!(pages.len(), 1);
    let a = &pages[A];
    assert_eq!(a.distance, 0);
    assert_eq!(a.retries, 0);
    assert!(a.last_success > 0);
    assert_eq!(driver.current().cycle(), 1);
}

#[tokio::test]
async fn test_discovered_page_needs_front_quota() {
    for (front_size, survives) in [(1, true), (0, false)] {
        let dir = TempDir::new().unwrap();
        let config = hotspot_only_a(front_size);
        seed(&dir, &config, &[A]);

        let transport = Arc::new(ScriptedTransport::default());
        transport.set(A, document("links to b", &[B]));
        let driver = driver(&dir, &config, transport, Arc::new(NullPipeline));
        let report = driver.run_cycle(&RunFlag::new()).await.unwrap();
        assert_eq!(report.discovery_pages, 1);

        let pages = pages(&driver);
        assert_eq!(pages[A].distance, 0);
        match pages.get(B) {
            Some(b) => {
                assert!(survives, "B admitted with front size 0");
                assert_eq!(b.distance, 2);
                assert_eq!(b.num_inlinks, 1);
            }
            None => assert!(!survives, "B rejected with front size {}", front_size),
        }
    }
}

#[tokio::test]
async fn test_recoverable_failure_is_retried_next_cycle() {
    let dir = TempDir::new().unwrap();
    let config = Config::default();
    seed(&dir, &config, &[A]);

    let transport = Arc::new(ScriptedTransport::default());
    transport.set(A, Scripted::Fail { recoverable: true });
    let driver = driver(&dir, &config, transport.clone(), Arc::new(NullPipeline));

    driver.run_cycle(&RunFlag::new()).await.unwrap();
    assert_eq!(pages(&driver)[A].retries, 1);

    driver.run_cycle(&RunFlag::new()).await.unwrap();
    assert_eq!(pages(&driver)[A].retries, 2);
    assert_eq!(transport.requested(), vec![A.to_string(), A.to_string()]);
}

#[tokio::test]
async fn test_documents_flow_to_sqlite_and_are_deleted_on_permanent_failure() {
    let dir = TempDir::new().unwrap();
    let config = Config::default();
    seed(&dir, &config, &[A]);

    let sink = Arc::new(SqliteDocumentSink::open(&dir.path().join("docs.db")).unwrap());
    let transport = Arc::new(ScriptedTransport::default());
    transport.set(A, document("hello world", &[]));
    let driver = driver(&dir, &config, transport.clone(), sink.clone());

    driver.run(1, &RunFlag::new()).await.unwrap();
    assert_eq!(sink.get(A).unwrap().unwrap().text, "hello world");
    assert!(pages(&driver)[A].emitted);

    transport.set(A, Scripted::Fail { recoverable: false });
    driver.run(1, &RunFlag::new()).await.unwrap();
    assert!(sink.get(A).unwrap().is_none());
    assert!(pages(&driver).is_empty());
}

#[tokio::test]
async fn test_multiple_cycles_spread_along_links() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.frontier.max_distance = 2;
    config.frontier.max_retries = vec![3, 3, 3];
    seed(&dir, &config, &[A]);

    let c = "https://c.example/";
    let transport = Arc::new(ScriptedTransport::default());
    transport.set(A, document("a", &[B]));
    transport.set(B, document("b", &[c]));
    transport.set(c, document("c", &[A]));
    let driver = driver(&dir, &config, transport.clone(), Arc::new(NullPipeline));

    let reports = driver.run(3, &RunFlag::new()).await.unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(driver.current().cycle(), 3);

    let pages = pages(&driver);
    assert_eq!(pages.len(), 3);
    assert!(pages.values().all(|p| p.is_fetched()));
    let requested = transport.requested();
    assert!(requested.contains(&B.to_string()));
    assert!(requested.contains(&c.to_string()));
}

#[tokio::test]
async fn test_linked_page_outlasts_retry_budget_orphan_does_not() {
    let server = MockServer::start().await;
    let routes = [
        (
            "/",
            ResponseTemplate::new(200)
                .set_body_raw(r#"<p>root</p><a href="/linked">linked</a>"#, "text/html"),
        ),
        ("/linked", ResponseTemplate::new(503)),
        ("/orphan", ResponseTemplate::new(503)),
    ];
    for (route, response) in routes {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(&server)
            .await;
    }
    let root = format!("{}/", server.uri());
    let linked = format!("{}/linked", server.uri());
    let orphan = format!("{}/orphan", server.uri());

    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.frontier.max_distance = 1;
    config.frontier.max_retries = vec![1, 1];
    seed(&dir, &config, &[root.as_str(), orphan.as_str()]);

    let mut fetch = FetchConfig::default();
    fetch.timeout_secs = 5;
    let transport = Arc::new(HttpFetcher::new(&fetch).unwrap());
    let driver = CrawlCycle::new(dir.path(), &config, transport, Arc::new(NullPipeline));

    driver.run(2, &RunFlag::new()).await.unwrap();
    let after_two = pages(&driver);
    assert!(!after_two.contains_key(&orphan), "orphan kept past its budget");
    assert_eq!(after_two[&linked].retries, 1);

    driver.run(2, &RunFlag::new()).await.unwrap();
    let after_four = pages(&driver);
    let page = &after_four[&linked];
    assert_eq!(page.retries, 3);
    assert!(page.num_inlinks > 0);
    assert!(!page.is_fetched());
    assert!(after_four[&root].is_fetched());
}
