//! Two nodes on localhost sharing one frontier

use async_trait::async_trait;
use ripple_frontier::config::Config;
use ripple_frontier::crawler::{append_seeds, create_store, CrawlCycle, FrontierDir};
use ripple_frontier::distributed::{Cluster, HashRouter, NodeAddress, NodeServer, PageRouter};
use ripple_frontier::page::now_millis;
use ripple_frontier::processor::{
    FetchResult, FetchTransport, FetchedDocument, NullPipeline, Outlink,
};
use ripple_frontier::store::{OpenMode, PageSink};
use ripple_frontier::{FrontierPolicy, Page, PageStore, RunFlag};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(5);

/// First URL of the form `https://host{i}.example/` owned by node `owner`
fn url_owned_by(owner: usize, skip: &[&str]) -> String {
    let router = HashRouter::new(2);
    (0..)
        .map(|i| format!("https://host{}.example/", i))
        .find(|url| !skip.contains(&url.as_str()) && router.route(&Page::new(url.clone())) == owner)
        .unwrap()
}

struct Node {
    cluster: Arc<Cluster>,
    _server: ripple_frontier::distributed::ServerHandle,
}

async fn start_pair(dirs: [&TempDir; 2]) -> [Node; 2] {
    let any: NodeAddress = "127.0.0.1:0".parse().unwrap();
    let first = NodeServer::bind(any).await.unwrap();
    let second = NodeServer::bind(any).await.unwrap();
    let nodes = vec![first.local_addr(), second.local_addr()];

    let mut started = Vec::new();
    for (server, dir) in [first, second].into_iter().zip(dirs) {
        let me = server.local_addr();
        let cluster = Cluster::new(
            me,
            nodes.clone(),
            FrontierDir::new(dir.path()).catcher(),
            TIMEOUT,
        )
        .unwrap();
        let handle = cluster.serve(server);
        started.push(Node {
            cluster: Arc::new(cluster),
            _server: handle,
        });
    }
    let second = started.pop().unwrap();
    let first = started.pop().unwrap();
    [first, second]
}

fn open_raw(dir: &TempDir) -> Arc<PageStore> {
    let raw = Arc::new(PageStore::new(dir.path().join("raw")));
    raw.open(OpenMode::write()).unwrap();
    raw
}

fn urls(store: &PageStore) -> Vec<String> {
    store.iter().unwrap().map(|p| p.unwrap().url).collect()
}

#[tokio::test]
async fn test_page_lands_on_owning_node_after_sync() {
    let dirs = [TempDir::new().unwrap(), TempDir::new().unwrap()];
    let [one, two] = start_pair([&dirs[0], &dirs[1]]).await;

    let raw_one = open_raw(&dirs[0]);
    let raw_two = open_raw(&dirs[1]);
    let store_one = one.cluster.wrap(raw_one.clone()).unwrap();
    let store_two = two.cluster.wrap(raw_two.clone()).unwrap();

    let remote = url_owned_by(1, &[]);
    let local = url_owned_by(0, &[]);
    store_one.add_page(Page::new(remote.clone())).await.unwrap();
    store_one.add_page(Page::new(local.clone())).await.unwrap();
    assert_eq!(store_one.shipped(), 1);

    let (a, b) = tokio::join!(one.cluster.sync(0), two.cluster.sync(0));
    a.unwrap();
    b.unwrap();
    assert_eq!(two.cluster.catcher().caught(), 1);
    store_one.close().unwrap();
    store_two.close().unwrap();

    assert_eq!(urls(&raw_one), vec![local]);
    assert_eq!(urls(&raw_two), vec![remote]);
}

#[tokio::test]
async fn test_unreachable_owner_keeps_page_locally() {
    let dir = TempDir::new().unwrap();
    let me: NodeAddress = "127.0.0.1:7400".parse().unwrap();
    // nothing listens on port 9 of localhost
    let dead: NodeAddress = "127.0.0.1:9".parse().unwrap();
    let cluster = Cluster::new(
        me,
        vec![me, dead],
        dir.path().join("caught"),
        Duration::from_millis(500),
    )
    .unwrap();

    let raw = open_raw(&dir);
    let store = cluster.wrap(raw.clone()).unwrap();
    let remote = url_owned_by(1, &[]);
    store.add_page(Page::new(remote.clone())).await.unwrap();
    assert_eq!(store.fallbacks(), 1);
    store.close().unwrap();

    let kept = raw.iter().unwrap().next().unwrap().unwrap();
    assert_eq!(kept.url, remote);
    assert!(!kept.is_local);
}

/// Serves one document per URL, all links pointing at `links`
struct LinkingTransport {
    links: HashMap<String, Vec<String>>,
}

#[async_trait]
impl FetchTransport for LinkingTransport {
    async fn fetch(&self, batch: Vec<Page>) -> ripple_frontier::Result<Vec<FetchResult>> {
        Ok(batch
            .into_iter()
            .map(|mut page| {
                page.last_attempt = now_millis();
                let outlinks = self
                    .links
                    .get(&page.url)
                    .map(|links| links.iter().map(|l| Outlink::new(l.clone(), "x")).collect())
                    .unwrap_or_default();
                FetchResult::success(
                    page,
                    FetchedDocument {
                        title: None,
                        text: "content".to_string(),
                        outlinks,
                    },
                )
            })
            .collect())
    }
}

#[tokio::test]
async fn test_two_node_crawl_cycle() {
    let dirs = [TempDir::new().unwrap(), TempDir::new().unwrap()];
    let [one, two] = start_pair([&dirs[0], &dirs[1]]).await;

    let seed = url_owned_by(0, &[]);
    let child = url_owned_by(1, &[]);
    let config = Config::default();
    let policy = FrontierPolicy::from_config(&config);
    for (dir, seeds) in [(&dirs[0], vec![seed.clone()]), (&dirs[1], vec![])] {
        let store = PageStore::new(FrontierDir::new(dir.path()).current());
        create_store(&store).unwrap();
        append_seeds(&store, &seeds, &policy).unwrap();
    }

    let transport = Arc::new(LinkingTransport {
        links: HashMap::from([(seed.clone(), vec![child.clone()])]),
    });
    let driver = |dir: &TempDir, node: &Node| {
        CrawlCycle::new(dir.path(), &config, transport.clone(), Arc::new(NullPipeline))
            .with_cluster(node.cluster.clone())
    };
    let driver_one = driver(&dirs[0], &one);
    let driver_two = driver(&dirs[1], &two);

    let (flag_one, flag_two) = (RunFlag::new(), RunFlag::new());
    let (a, b) = tokio::join!(
        driver_one.run_cycle(&flag_one),
        driver_two.run_cycle(&flag_two)
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(urls(&driver_one.current()), vec![seed]);
    assert_eq!(urls(&driver_two.current()), vec![child]);
    assert_eq!(driver_one.current().cycle(), 1);
    assert_eq!(driver_two.current().cycle(), 1);
}
