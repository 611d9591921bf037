//! Frontier maintenance operations
//!
//! Small whole-store passes used by the command line: creating an empty
//! frontier, seeding it from a URL list, clearing fetch history and copying.

use crate::page::{Page, UrlHash};
use crate::policy::FrontierPolicy;
use crate::store::{OpenMode, PageStore};
use crate::{FrontierError, Result, RunFlag};
use std::collections::HashSet;
use std::path::Path;

/// Score given to seed pages
pub const SEED_SCORE: f64 = 1.0;

/// Outcome of [`append_seeds`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub added: u64,
    /// Already in the store or repeated in the input
    pub duplicates: u64,
    /// Refused by the URL filter
    pub rejected: u64,
}

/// Creates an empty cycle-0 store; fails if one already exists
pub fn create_store(store: &PageStore) -> Result<()> {
    if store.exists() {
        return Err(FrontierError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("store already exists: {}", store.dir().display()),
        )));
    }
    store.open(OpenMode::write())?;
    store.close()?;
    tracing::info!("Created empty store in {}", store.dir().display());
    Ok(())
}

/// Reads a newline-delimited URL list, skipping blank lines and `#` comments
pub fn read_seed_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_seed_list(&content))
}

pub fn parse_seed_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Adds seed URLs to `store` as distance-0 pages
///
/// Each URL goes through the policy's URL filter; URLs already present in
/// the store are skipped. `store` must be closed.
pub fn append_seeds<I, S>(store: &PageStore, urls: I, policy: &FrontierPolicy) -> Result<SeedReport>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut known: HashSet<UrlHash> = HashSet::new();
    if store.exists() {
        for page in store.iter()? {
            known.insert(page?.url_hash);
        }
    }

    let mut report = SeedReport::default();
    store.open(OpenMode::append())?;
    for url in urls {
        let url = url.as_ref();
        let Some(accepted) = policy.filter_url(url) else {
            tracing::warn!("Skipping seed {}: rejected by url filter", url);
            report.rejected += 1;
            continue;
        };

        let mut page = Page::new(accepted);
        if !known.insert(page.url_hash) {
            report.duplicates += 1;
            continue;
        }
        page.score = SEED_SCORE;
        page.distance = 0;
        store.add_page(&page)?;
        report.added += 1;
    }
    store.close()?;

    tracing::info!(
        "Seeded {}: {} added, {} duplicates, {} rejected",
        store.dir().display(),
        report.added,
        report.duplicates,
        report.rejected
    );
    Ok(report)
}

/// Writes `src` into `dest`, optionally clearing fetch history
fn rewrite(src: &PageStore, dest: &PageStore, reset: bool, run: &RunFlag) -> Result<u64> {
    if !src.exists() {
        return Err(crate::StoreError::Missing(src.dir().to_path_buf()).into());
    }
    dest.ensure_distinct(src)?;
    dest.destroy()?;
    dest.set_same_cycle_as(src)?;
    dest.open(OpenMode::write())?;

    let mut written = 0u64;
    for page in src.iter()? {
        if !run.is_running() {
            return Err(FrontierError::Interrupted);
        }
        let mut page = page?;
        if reset {
            page.reset_history();
        }
        dest.add_page(&page)?;
        written += 1;
    }
    dest.close()?;
    Ok(written)
}

/// Copies `src` into `dest` keeping only the link graph and scores
///
/// Fetch history (attempts, successes, changes, retries, signature,
/// priority and the emitted flag) is cleared; url, score, distance, anchors,
/// parents and inlink counts are kept.
pub fn reset_store(src: &PageStore, dest: &PageStore, run: &RunFlag) -> Result<u64> {
    let written = rewrite(src, dest, true, run)?;
    tracing::info!(
        "Reset {} pages from {} into {}",
        written,
        src.dir().display(),
        dest.dir().display()
    );
    Ok(written)
}

/// Copies a closed store into `dest` with the same cycle number
pub fn copy_store(src: &PageStore, dest: &PageStore, run: &RunFlag) -> Result<u64> {
    let written = rewrite(src, dest, false, run)?;
    tracing::info!(
        "Copied {} pages from {} into {}",
        written,
        src.dir().display(),
        dest.dir().display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::page::Signature;
    use tempfile::TempDir;

    fn policy() -> FrontierPolicy {
        let mut config = Config::default();
        config.filter.deny_domains = vec!["*.spam.example".to_string()];
        FrontierPolicy::from_config(&config)
    }

    #[test]
    fn test_parse_seed_list() {
        let list = "# seeds\nhttps://a.example/\n\n   https://b.example/  \n#https://c.example/\n";
        assert_eq!(
            parse_seed_list(list),
            vec!["https://a.example/", "https://b.example/"]
        );
    }

    #[test]
    fn test_create_refuses_existing() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("db"));
        create_store(&store).unwrap();
        assert!(store.exists());
        assert_eq!(store.size(), 0);
        assert!(create_store(&store).is_err());
    }

    #[test]
    fn test_append_seeds_filters_and_dedups() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("db"));
        create_store(&store).unwrap();

        let report = append_seeds(
            &store,
            [
                "https://A.example/x/../",
                "https://a.example/",
                "https://www.spam.example/",
                "not a url",
            ],
            &policy(),
        )
        .unwrap();
        assert_eq!(
            report,
            SeedReport {
                added: 1,
                duplicates: 1,
                rejected: 2
            }
        );

        // a second append sees what is already there
        let report = append_seeds(&store, ["https://a.example/", "https://b.example/"], &policy())
            .unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.duplicates, 1);

        let pages: Vec<Page> = store.iter().unwrap().map(|p| p.unwrap()).collect();
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.distance == 0 && p.score == SEED_SCORE));
    }

    #[test]
    fn test_reset_keeps_graph() {
        let dir = TempDir::new().unwrap();
        let src = PageStore::new(dir.path().join("src"));
        src.open(OpenMode::write()).unwrap();
        let mut page = Page::new("https://a.example/");
        page.score = 0.5;
        page.distance = 1;
        page.retries = 2;
        page.last_attempt = 10;
        page.last_success = 5;
        page.last_change = 5;
        page.num_inlinks = 3;
        page.emitted = true;
        page.signature = Signature::from_text("some text");
        page.add_anchor("home");
        src.add_page(&page).unwrap();
        src.close().unwrap();

        let dest = PageStore::new(dir.path().join("dest"));
        assert_eq!(reset_store(&src, &dest, &RunFlag::new()).unwrap(), 1);

        let reset = dest.iter().unwrap().next().unwrap().unwrap();
        assert_eq!(reset.retries, 0);
        assert_eq!(reset.last_attempt, 0);
        assert_eq!(reset.last_success, 0);
        assert!(!reset.emitted);
        assert!(reset.signature.is_empty());
        assert_eq!(reset.score, 0.5);
        assert_eq!(reset.distance, 1);
        assert_eq!(reset.num_inlinks, 3);
        assert!(reset.anchors.contains("home"));
    }

    #[test]
    fn test_copy_keeps_cycle() {
        let dir = TempDir::new().unwrap();
        let base = PageStore::new(dir.path().join("base"));
        create_store(&base).unwrap();
        let src = PageStore::new(dir.path().join("src"));
        src.set_next_cycle_of(&base).unwrap();
        src.open(OpenMode::write()).unwrap();
        src.add_page(&Page::new("https://a.example/")).unwrap();
        src.close().unwrap();

        let dest = PageStore::new(dir.path().join("dest"));
        assert_eq!(copy_store(&src, &dest, &RunFlag::new()).unwrap(), 1);
        assert_eq!(dest.cycle(), 1);
        assert_eq!(dest.iter().unwrap().next().unwrap().unwrap().url, "https://a.example/");
    }

    #[test]
    fn test_copy_missing_source() {
        let dir = TempDir::new().unwrap();
        let src = PageStore::new(dir.path().join("nope"));
        let dest = PageStore::new(dir.path().join("dest"));
        assert!(copy_store(&src, &dest, &RunFlag::new()).is_err());
    }

    #[test]
    fn test_copy_or_reset_onto_itself_keeps_source() {
        let dir = TempDir::new().unwrap();
        let src = PageStore::new(dir.path().join("src"));
        src.open(OpenMode::write()).unwrap();
        src.add_page(&Page::new("https://a.example/")).unwrap();
        src.close().unwrap();

        let same = PageStore::new(dir.path().join("src"));
        assert!(matches!(
            copy_store(&src, &same, &RunFlag::new()),
            Err(FrontierError::Store(crate::StoreError::SameStore(_)))
        ));
        assert!(matches!(
            reset_store(&src, &same, &RunFlag::new()),
            Err(FrontierError::Store(crate::StoreError::SameStore(_)))
        ));

        assert!(src.exists());
        assert_eq!(src.iter().unwrap().count(), 1);
    }
}
