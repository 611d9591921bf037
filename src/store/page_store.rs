//! The page store: a directory of pages plus its statistics

use crate::page::{read_page, write_page, Page};
use crate::store::sort::{merge_files, sort_file, Duplicates};
use crate::store::stats::{StatsAccumulator, StoreStats};
use crate::store::{StoreError, StoreResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Write-ahead file, in insertion order
pub const UNSORTED_FILE: &str = "pages";

/// Final file, in ascending URL hash order
pub const SORTED_FILE: &str = "pagesByMd5";

/// Statistics file
pub const STATS_FILE: &str = "stats";

/// Modifiers for opening a store for writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Keep existing pages (reclaiming a sorted file) and add to them
    pub append: bool,
    /// Skip the close-time sort; the file is published in insertion order
    pub unsorted: bool,
}

/// How a store is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write(WriteOptions),
}

impl OpenMode {
    /// Fresh write, sorted on close
    pub fn write() -> Self {
        Self::Write(WriteOptions::default())
    }

    /// Append to the existing pages, sorted on close
    pub fn append() -> Self {
        Self::Write(WriteOptions {
            append: true,
            unsorted: false,
        })
    }
}

/// Tuning knobs for a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Pages per in-memory run of the external sort
    pub sort_chunk_pages: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            sort_chunk_pages: 100_000,
        }
    }
}

/// What [`PageStore::repair`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Sorted file and stats were consistent
    Clean,
    /// Stats were missing or disagreed with the sorted file and were rebuilt
    StatsRebuilt,
    /// An interrupted write was re-sorted and its stats rebuilt
    Resorted,
}

enum StoreState {
    Closed,
    Reading,
    Writing(Box<WriteState>),
}

struct WriteState {
    out: BufWriter<File>,
    acc: StatsAccumulator,
    sort_on_close: bool,
}

struct Inner {
    state: StoreState,
    stats: StoreStats,
}

/// Disk-backed collection of pages
///
/// All methods take `&self`; the write path is serialized by an internal
/// lock so concurrent `add_page` calls from worker tasks are safe. Iteration
/// is single-consumer.
pub struct PageStore {
    dir: PathBuf,
    options: StoreOptions,
    inner: Mutex<Inner>,
}

impl PageStore {
    /// Binds a store to `dir`; nothing is created until it is opened
    ///
    /// If a stats file exists its values (notably the cycle number) are
    /// loaded; an unreadable stats file is ignored here and surfaces on open.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_options(dir, StoreOptions::default())
    }

    pub fn with_options(dir: impl Into<PathBuf>, options: StoreOptions) -> Self {
        let dir = dir.into();
        let stats = StoreStats::load(&dir.join(STATS_FILE)).unwrap_or_default();
        Self {
            dir,
            options,
            inner: Mutex::new(Inner {
                state: StoreState::Closed,
                stats,
            }),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fails when `other` lives in the same directory as this store
    ///
    /// Call before destroying a destination that was derived from a source;
    /// paths are compared after resolving symlinks and `..`.
    pub fn ensure_distinct(&self, other: &PageStore) -> StoreResult<()> {
        if resolve_dir(&self.dir) == resolve_dir(&other.dir) {
            return Err(StoreError::SameStore(self.dir.clone()));
        }
        Ok(())
    }

    fn unsorted_path(&self) -> PathBuf {
        self.dir.join(UNSORTED_FILE)
    }

    fn sorted_path(&self) -> PathBuf {
        self.dir.join(SORTED_FILE)
    }

    fn stats_path(&self) -> PathBuf {
        self.dir.join(STATS_FILE)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Corrupt(format!("lock poisoned for {}", self.dir.display())))
    }

    /// True once the store has been closed at least once
    pub fn exists(&self) -> bool {
        self.sorted_path().exists() && self.stats_path().exists()
    }

    /// Opens the store for reading or writing
    pub fn open(&self, mode: OpenMode) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if !matches!(inner.state, StoreState::Closed) {
            return Err(StoreError::AlreadyOpen);
        }

        match mode {
            OpenMode::Read => {
                if !self.dir.is_dir() || !self.stats_path().exists() {
                    return Err(StoreError::Missing(self.dir.clone()));
                }
                inner.stats = StoreStats::load(&self.stats_path())?;
                inner.state = StoreState::Reading;
                tracing::debug!(
                    "Opened {} for reading ({} pages, cycle {})",
                    self.dir.display(),
                    inner.stats.size,
                    inner.stats.cycle
                );
            }
            OpenMode::Write(options) => {
                fs::create_dir_all(&self.dir)?;
                let cycle = inner.stats.cycle;
                let acc = if options.append {
                    self.reclaim(cycle)?
                } else {
                    for stale in [self.sorted_path(), self.unsorted_path()] {
                        if stale.exists() {
                            fs::remove_file(&stale)?;
                        }
                    }
                    StatsAccumulator::new(cycle)
                };

                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(self.unsorted_path())?;
                tracing::debug!(
                    "Opened {} for writing (append: {}, {} existing pages)",
                    self.dir.display(),
                    options.append,
                    acc.size()
                );
                inner.state = StoreState::Writing(Box::new(WriteState {
                    out: BufWriter::new(file),
                    acc,
                    sort_on_close: !options.unsorted,
                }));
            }
        }
        Ok(())
    }

    /// Moves a previous sorted file back to the write-ahead name and rescans
    /// whatever is in the write-ahead file
    fn reclaim(&self, cycle: u64) -> StoreResult<StatsAccumulator> {
        let unsorted = self.unsorted_path();
        let sorted = self.sorted_path();

        if sorted.exists() {
            // A complete sorted file supersedes any write-ahead leftover
            if unsorted.exists() {
                fs::remove_file(&unsorted)?;
            }
            fs::rename(&sorted, &unsorted)?;
        }

        if !unsorted.exists() {
            return Ok(StatsAccumulator::new(cycle));
        }
        scan_file(&unsorted, cycle)
    }

    /// Appends a page to the write-ahead file
    pub fn add_page(&self, page: &Page) -> StoreResult<()> {
        let mut inner = self.lock()?;
        match &mut inner.state {
            StoreState::Writing(w) => {
                write_page(&mut w.out, page)?;
                w.acc.record(page);
                Ok(())
            }
            _ => Err(StoreError::NotOpenForWriting),
        }
    }

    /// Lazy one-shot iteration over the sorted file
    pub fn iter(&self) -> StoreResult<PageIter> {
        let inner = self.lock()?;
        if matches!(inner.state, StoreState::Writing(_)) {
            return Err(StoreError::NotOpenForReading);
        }
        drop(inner);

        let path = self.sorted_path();
        if !path.exists() {
            return Err(StoreError::NotOpenForReading);
        }
        Ok(PageIter {
            reader: Some(BufReader::new(File::open(path)?)),
        })
    }

    /// Closes the store
    ///
    /// For a write-mode store this sorts the write-ahead file into the sorted
    /// file (a rename if pages arrived in order or sorting is disabled) and
    /// persists statistics. Closing a closed store is a no-op.
    pub fn close(&self) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let state = std::mem::replace(&mut inner.state, StoreState::Closed);

        let write = match state {
            StoreState::Writing(w) => w,
            StoreState::Reading | StoreState::Closed => return Ok(()),
        };

        let WriteState {
            mut out,
            acc,
            sort_on_close,
        } = *write;
        out.flush()?;
        out.get_ref().sync_all()?;
        drop(out);

        let already_sorted = acc.is_sorted();
        let stats = acc.finish(inner.stats.cycle);
        let unsorted = self.unsorted_path();
        let sorted = self.sorted_path();

        if already_sorted || !sort_on_close {
            fs::rename(&unsorted, &sorted)?;
        } else {
            sort_file(&unsorted, &sorted, &self.dir, self.options.sort_chunk_pages)?;
            fs::remove_file(&unsorted)?;
        }

        stats.save(&self.stats_path())?;
        tracing::debug!(
            "Closed {} ({} pages, cycle {}, sort skipped: {})",
            self.dir.display(),
            stats.size,
            stats.cycle,
            already_sorted || !sort_on_close
        );
        inner.stats = stats;
        Ok(())
    }

    /// Writes the hash-ordered union of `a` and `b` into `dest`
    ///
    /// Records with equal hashes collapse to one, `b`'s winning. Both inputs
    /// must be closed stores; `dest` must not be open. `dest` gets the larger
    /// of the two cycle numbers and statistics rebuilt from the merged file.
    pub fn merge(a: &PageStore, b: &PageStore, dest: &PageStore) -> StoreResult<()> {
        for input in [a, b] {
            if !input.sorted_path().exists() {
                return Err(StoreError::NotOpenForReading);
            }
            dest.ensure_distinct(input)?;
        }

        let mut inner = dest.lock()?;
        if !matches!(inner.state, StoreState::Closed) {
            return Err(StoreError::AlreadyOpen);
        }

        fs::create_dir_all(&dest.dir)?;
        let unsorted = dest.unsorted_path();
        if unsorted.exists() {
            fs::remove_file(&unsorted)?;
        }

        let written = merge_files(
            &[a.sorted_path(), b.sorted_path()],
            &dest.sorted_path(),
            Duplicates::CollapseLast,
        )?;

        let cycle = a.cycle().max(b.cycle());
        let stats = scan_file(&dest.sorted_path(), cycle)?.finish(cycle);
        stats.save(&dest.stats_path())?;
        tracing::info!(
            "Merged {} + {} into {} ({} pages)",
            a.dir.display(),
            b.dir.display(),
            dest.dir.display(),
            written
        );
        inner.stats = stats;
        Ok(())
    }

    /// Recovers from an interrupted close or a lost stats file
    pub fn repair(&self) -> StoreResult<RepairOutcome> {
        let mut inner = self.lock()?;
        if !matches!(inner.state, StoreState::Closed) {
            return Err(StoreError::AlreadyOpen);
        }

        let unsorted = self.unsorted_path();
        let sorted = self.sorted_path();
        let stats_path = self.stats_path();
        let previous = StoreStats::load(&stats_path).ok();
        let cycle = previous.as_ref().map(|s| s.cycle).unwrap_or(0);

        let mut outcome = RepairOutcome::Clean;
        if unsorted.exists() {
            if sorted.exists() {
                // Sort finished but the write-ahead file was never removed
                fs::remove_file(&unsorted)?;
            } else {
                tracing::warn!("Re-sorting interrupted write in {}", self.dir.display());
                let acc = scan_file(&unsorted, cycle)?;
                if acc.is_sorted() {
                    fs::rename(&unsorted, &sorted)?;
                } else {
                    sort_file(&unsorted, &sorted, &self.dir, self.options.sort_chunk_pages)?;
                    fs::remove_file(&unsorted)?;
                }
                outcome = RepairOutcome::Resorted;
            }
        } else if !sorted.exists() {
            return Err(StoreError::Missing(self.dir.clone()));
        }

        let scanned = scan_file(&sorted, cycle)?.finish(cycle);
        let consistent = previous
            .as_ref()
            .map(|s| s.size == scanned.size)
            .unwrap_or(false);

        if outcome == RepairOutcome::Resorted || !consistent {
            if outcome == RepairOutcome::Clean {
                tracing::warn!(
                    "Rebuilding stats for {} (cycle {})",
                    self.dir.display(),
                    cycle
                );
                outcome = RepairOutcome::StatsRebuilt;
            }
            scanned.save(&stats_path)?;
            inner.stats = scanned;
        } else if let Some(previous) = previous {
            inner.stats = previous;
        }

        Ok(outcome)
    }

    /// Deletes the store directory
    pub fn destroy(&self) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.state = StoreState::Closed;
        inner.stats = StoreStats::new(inner.stats.cycle);
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }

    /// Takes the cycle number of another store
    pub fn set_same_cycle_as(&self, other: &PageStore) -> StoreResult<()> {
        let cycle = other.cycle();
        self.lock()?.stats.cycle = cycle;
        Ok(())
    }

    /// Takes the cycle number following another store's
    pub fn set_next_cycle_of(&self, other: &PageStore) -> StoreResult<()> {
        let cycle = other.cycle() + 1;
        self.lock()?.stats.cycle = cycle;
        Ok(())
    }

    pub fn stats(&self) -> StoreStats {
        self.inner
            .lock()
            .map(|inner| inner.stats.clone())
            .unwrap_or_default()
    }

    pub fn cycle(&self) -> u64 {
        self.inner.lock().map(|inner| inner.stats.cycle).unwrap_or(0)
    }

    pub fn size(&self) -> u64 {
        self.stats().size
    }

    pub fn fetched_count(&self) -> u64 {
        self.stats().fetched
    }

    pub fn failed_count(&self) -> u64 {
        self.stats().failed
    }

    pub fn fetched_score(&self) -> f64 {
        self.stats().fetched_score
    }

    /// Priority reached by the top `fraction` of pages
    pub fn priority_threshold(&self, fraction: f64) -> f64 {
        self.stats().priority_histogram.threshold(fraction)
    }

    /// Score reached by the top `fraction` of pages
    pub fn score_threshold(&self, fraction: f64) -> f64 {
        self.stats().score_histogram.threshold(fraction)
    }
}

/// Canonical form of a store directory, which may not exist yet
fn resolve_dir(dir: &Path) -> PathBuf {
    if let Ok(path) = dir.canonicalize() {
        return path;
    }
    let parent = match dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), dir.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => dir.to_path_buf(),
    }
}

/// Sequential reader over a store's sorted file
///
/// Yields pages in ascending hash order. After the first error the iterator
/// is exhausted.
pub struct PageIter {
    reader: Option<BufReader<File>>,
}

impl Iterator for PageIter {
    type Item = StoreResult<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        match read_page(reader) {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => {
                self.reader = None;
                None
            }
            Err(e) => {
                self.reader = None;
                Some(Err(e))
            }
        }
    }
}

/// Byte-counting reader so a scan knows where the last good record ends
struct CountingReader<R> {
    inner: R,
    consumed: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

/// Rebuilds statistics from a page file
///
/// A truncated tail (a write cut short by a crash) is cut off at the last
/// complete record.
fn scan_file(path: &Path, cycle: u64) -> StoreResult<StatsAccumulator> {
    let mut reader = CountingReader {
        inner: BufReader::new(File::open(path)?),
        consumed: 0,
    };
    let mut acc = StatsAccumulator::new(cycle);
    let mut good_len = 0u64;

    loop {
        match read_page(&mut reader) {
            Ok(Some(page)) => {
                acc.record(&page);
                good_len = reader.consumed;
            }
            Ok(None) => break,
            Err(StoreError::Corrupt(reason)) => {
                tracing::warn!(
                    "Truncating {} at byte {}: {}",
                    path.display(),
                    good_len,
                    reason
                );
                drop(reader);
                let file = OpenOptions::new().write(true).open(path)?;
                file.set_len(good_len)?;
                file.sync_all()?;
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(acc)
}

impl Drop for PageStore {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.get_mut() {
            if let StoreState::Writing(w) = &mut inner.state {
                // Leave the write-ahead file for repair, but do not lose buffered pages
                let _ = w.out.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn page(url: &str) -> Page {
        Page::new(url)
    }

    fn collect(store: &PageStore) -> Vec<Page> {
        store.iter().unwrap().map(|p| p.unwrap()).collect()
    }

    #[test]
    fn test_add_requires_write_mode() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("db"));
        assert!(matches!(
            store.add_page(&page("https://a.example/")),
            Err(StoreError::NotOpenForWriting)
        ));
    }

    #[test]
    fn test_iter_before_close_fails() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("db"));
        store.open(OpenMode::write()).unwrap();
        store.add_page(&page("https://a.example/")).unwrap();
        assert!(matches!(store.iter(), Err(StoreError::NotOpenForReading)));
    }

    #[test]
    fn test_read_missing_store() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("nope"));
        assert!(matches!(
            store.open(OpenMode::Read),
            Err(StoreError::Missing(_))
        ));
    }

    #[test]
    fn test_ensure_distinct_sees_through_dot_segments() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("db"));
        store.open(OpenMode::write()).unwrap();
        store.close().unwrap();

        let alias = PageStore::new(dir.path().join("other").join("..").join("db"));
        std::fs::create_dir(dir.path().join("other")).unwrap();
        assert!(matches!(
            store.ensure_distinct(&alias),
            Err(StoreError::SameStore(_))
        ));
        assert!(store
            .ensure_distinct(&PageStore::new(dir.path().join("fresh")))
            .is_ok());
    }

    #[test]
    fn test_merge_into_own_input_rejected() {
        let dir = TempDir::new().unwrap();
        let a = PageStore::new(dir.path().join("a"));
        a.open(OpenMode::write()).unwrap();
        a.add_page(&page("https://a.example/")).unwrap();
        a.close().unwrap();
        let b = PageStore::new(dir.path().join("b"));
        b.open(OpenMode::write()).unwrap();
        b.close().unwrap();

        let dest = PageStore::new(dir.path().join("a"));
        assert!(matches!(
            PageStore::merge(&a, &b, &dest),
            Err(StoreError::SameStore(_))
        ));
        assert_eq!(collect(&a).len(), 1);
    }

    #[test]
    fn test_write_close_read_sorted() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::with_options(
            dir.path().join("db"),
            StoreOptions {
                sort_chunk_pages: 3,
            },
        );
        store.open(OpenMode::write()).unwrap();
        for i in 0..20 {
            store
                .add_page(&page(&format!("https://site{}.example/", i)))
                .unwrap();
        }
        store.close().unwrap();
        assert!(!dir.path().join("db").join(UNSORTED_FILE).exists());

        let reader = PageStore::new(dir.path().join("db"));
        reader.open(OpenMode::Read).unwrap();
        assert_eq!(reader.size(), 20);
        let pages = collect(&reader);
        assert_eq!(pages.len(), 20);
        assert!(pages.windows(2).all(|w| w[0].url_hash <= w[1].url_hash));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("db"));
        store.open(OpenMode::write()).unwrap();
        store.add_page(&page("https://a.example/")).unwrap();
        store.close().unwrap();
        store.close().unwrap();
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_double_open_rejected() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("db"));
        store.open(OpenMode::write()).unwrap();
        assert!(matches!(
            store.open(OpenMode::write()),
            Err(StoreError::AlreadyOpen)
        ));
    }

    #[test]
    fn test_append_keeps_existing_pages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        let store = PageStore::new(&path);
        store.open(OpenMode::write()).unwrap();
        store.add_page(&page("https://a.example/")).unwrap();
        store.close().unwrap();

        store.open(OpenMode::append()).unwrap();
        store.add_page(&page("https://b.example/")).unwrap();
        store.close().unwrap();

        assert_eq!(store.size(), 2);
        assert_eq!(collect(&store).len(), 2);
    }

    #[test]
    fn test_cycle_inheritance() {
        let dir = TempDir::new().unwrap();
        let first = PageStore::new(dir.path().join("a"));
        first.open(OpenMode::write()).unwrap();
        first.close().unwrap();

        let second = PageStore::new(dir.path().join("b"));
        second.set_next_cycle_of(&first).unwrap();
        second.open(OpenMode::write()).unwrap();
        second.close().unwrap();
        assert_eq!(second.cycle(), 1);

        let third = PageStore::new(dir.path().join("c"));
        third.set_same_cycle_as(&second).unwrap();
        assert_eq!(third.cycle(), 1);

        let reopened = PageStore::new(dir.path().join("b"));
        assert_eq!(reopened.cycle(), 1);
    }

    #[test]
    fn test_concurrent_adds() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(PageStore::new(dir.path().join("db")));
        store.open(OpenMode::write()).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store
                            .add_page(&page(&format!("https://t{}-{}.example/", t, i)))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        store.close().unwrap();
        assert_eq!(store.size(), 100);
        assert_eq!(collect(&store).len(), 100);
    }

    #[test]
    fn test_repair_resorts_interrupted_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        {
            let store = PageStore::new(&path);
            store.open(OpenMode::write()).unwrap();
            for i in 0..10 {
                store
                    .add_page(&page(&format!("https://site{}.example/", i)))
                    .unwrap();
            }
            // dropped without close
        }

        let store = PageStore::new(&path);
        assert_eq!(store.repair().unwrap(), RepairOutcome::Resorted);
        store.open(OpenMode::Read).unwrap();
        assert_eq!(store.size(), 10);
        assert_eq!(collect(&store).len(), 10);
    }

    #[test]
    fn test_repair_rebuilds_missing_stats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        let store = PageStore::new(&path);
        store.open(OpenMode::write()).unwrap();
        store.add_page(&page("https://a.example/")).unwrap();
        store.close().unwrap();
        fs::remove_file(path.join(STATS_FILE)).unwrap();

        let store = PageStore::new(&path);
        assert_eq!(store.repair().unwrap(), RepairOutcome::StatsRebuilt);
        assert_eq!(store.size(), 1);
        assert_eq!(store.cycle(), 0);
    }

    #[test]
    fn test_repair_clean_store() {
        let dir = TempDir::new().unwrap();
        let store = PageStore::new(dir.path().join("db"));
        store.open(OpenMode::write()).unwrap();
        store.add_page(&page("https://a.example/")).unwrap();
        store.close().unwrap();
        assert_eq!(store.repair().unwrap(), RepairOutcome::Clean);
    }

    #[test]
    fn test_repair_truncated_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db");
        {
            let store = PageStore::new(&path);
            store.open(OpenMode::write()).unwrap();
            store.add_page(&page("https://a.example/")).unwrap();
            store.add_page(&page("https://b.example/")).unwrap();
        }
        let unsorted = path.join(UNSORTED_FILE);
        let len = fs::metadata(&unsorted).unwrap().len();
        let file = OpenOptions::new().write(true).open(&unsorted).unwrap();
        file.set_len(len - 5).unwrap();
        drop(file);

        let store = PageStore::new(&path);
        store.repair().unwrap();
        assert_eq!(store.size(), 1);
    }
}
