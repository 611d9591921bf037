//! Store properties: sorting, merging and record round-trips

use ripple_frontier::page::Signature;
use ripple_frontier::store::{OpenMode, PageStore, StoreOptions, SORTED_FILE};
use ripple_frontier::Page;
use tempfile::TempDir;

fn page(i: usize) -> Page {
    let mut page = Page::new(format!("https://site{}.example/path/{}", i % 7, i));
    page.score = i as f64 / 10.0;
    page.priority = (i as f64).sin() * 1000.0;
    page
}

fn write_store(store: &PageStore, pages: impl IntoIterator<Item = Page>) {
    store.open(OpenMode::write()).unwrap();
    for page in pages {
        store.add_page(&page).unwrap();
    }
    store.close().unwrap();
}

fn read_all(store: &PageStore) -> Vec<Page> {
    store.iter().unwrap().map(|p| p.unwrap()).collect()
}

#[test]
fn test_external_sort_across_many_runs() {
    let dir = TempDir::new().unwrap();
    let store = PageStore::with_options(
        dir.path().join("db"),
        StoreOptions {
            sort_chunk_pages: 16,
        },
    );
    write_store(&store, (0..500).map(page));

    let pages = read_all(&store);
    assert_eq!(pages.len(), 500);
    assert!(pages.windows(2).all(|w| w[0].url_hash <= w[1].url_hash));
    assert_eq!(store.size(), 500);

    // no leftover runs next to the store files
    let leftovers: Vec<_> = std::fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name != SORTED_FILE && name != "stats")
        .collect();
    assert!(leftovers.is_empty(), "unexpected files {:?}", leftovers);
}

#[test]
fn test_reclose_without_writes_keeps_sorted_file() {
    let dir = TempDir::new().unwrap();
    let store = PageStore::new(dir.path().join("db"));
    write_store(&store, (0..100).map(page));
    let sorted = store.dir().join(SORTED_FILE);
    let before = std::fs::read(&sorted).unwrap();

    store.open(OpenMode::append()).unwrap();
    store.close().unwrap();

    assert_eq!(std::fs::read(&sorted).unwrap(), before);
    assert_eq!(store.size(), 100);
}

#[test]
fn test_merge_disjoint_sizes_add_up() {
    let dir = TempDir::new().unwrap();
    let a = PageStore::new(dir.path().join("a"));
    let b = PageStore::new(dir.path().join("b"));
    let dest = PageStore::new(dir.path().join("dest"));
    write_store(&a, (0..40).map(page));
    write_store(&b, (40..100).map(page));

    PageStore::merge(&a, &b, &dest).unwrap();
    assert_eq!(dest.size(), a.size() + b.size());
    let pages = read_all(&dest);
    assert_eq!(pages.len(), 100);
    assert!(pages.windows(2).all(|w| w[0].url_hash < w[1].url_hash));
}

#[test]
fn test_merge_overlap_keeps_one_record_per_hash() {
    let dir = TempDir::new().unwrap();
    let a = PageStore::new(dir.path().join("a"));
    let b = PageStore::new(dir.path().join("b"));
    let dest = PageStore::new(dir.path().join("dest"));
    write_store(&a, (0..60).map(page));
    write_store(
        &b,
        (30..90).map(|i| {
            let mut p = page(i);
            p.retries = 9;
            p
        }),
    );

    PageStore::merge(&a, &b, &dest).unwrap();
    let pages = read_all(&dest);
    assert_eq!(pages.len(), 90);
    // the second input wins on shared hashes
    let shared = pages.iter().filter(|p| p.retries == 9).count();
    assert_eq!(shared, 60);
}

#[test]
fn test_round_trip_all_fields() {
    let dir = TempDir::new().unwrap();
    let store = PageStore::new(dir.path().join("db"));

    let mut original = Page::new("https://example.com/full");
    original.score = 0.125;
    original.priority = -42.5;
    original.distance = 3;
    original.retries = 2;
    original.last_attempt = 1_700_000_000_123;
    original.last_success = 1_699_000_000_000;
    original.last_change = 1_698_000_000_000;
    original.num_inlinks = 17;
    original.add_anchor("first anchor");
    original.add_anchor("second");
    original.add_parent("https://example.com/");
    original.signature = Signature::from_text("the quick brown fox");
    original.emitted = true;
    original.is_local = true;

    write_store(&store, [original.clone()]);

    let reopened = PageStore::new(store.dir());
    reopened.open(OpenMode::Read).unwrap();
    let pages = read_all(&reopened);
    reopened.close().unwrap();
    assert_eq!(pages, vec![original]);
}
