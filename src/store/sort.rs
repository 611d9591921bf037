//! External merge sort over page files
//!
//! Frontiers are expected to exceed memory, so sorting works on files: the
//! input is cut into runs of at most `chunk_pages` pages, each run is sorted
//! in memory and spilled to disk, and the runs are merged with a k-way heap
//! merge. Ties keep input order (earlier run first), so duplicates of one URL
//! stay adjacent in the order they were written.

use crate::page::{read_page, write_page, Page};
use crate::store::StoreError;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// What to do with records whose hashes are equal during a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicates {
    /// Emit every record
    Keep,
    /// Emit one record per hash; the one from the latest input wins
    CollapseLast,
}

/// Sorts `input` by URL hash into `output`, spilling runs into `work_dir`
///
/// Returns the number of records written.
pub fn sort_file(
    input: &Path,
    output: &Path,
    work_dir: &Path,
    chunk_pages: usize,
) -> Result<u64, StoreError> {
    let chunk_pages = chunk_pages.max(1);
    let mut reader = BufReader::new(File::open(input)?);
    let mut runs: Vec<PathBuf> = Vec::new();
    let mut chunk: Vec<Page> = Vec::with_capacity(chunk_pages.min(65_536));

    let result = (|| -> Result<u64, StoreError> {
        loop {
            let next = read_page(&mut reader)?;
            let done = next.is_none();
            if let Some(page) = next {
                chunk.push(page);
            }
            if chunk.len() >= chunk_pages || (done && !chunk.is_empty()) {
                let run = work_dir.join(format!("sort-run-{}", runs.len()));
                write_run(&mut chunk, &run)?;
                runs.push(run);
            }
            if done {
                break;
            }
        }

        match runs.len() {
            0 => {
                let tmp = partial_path(output);
                File::create(&tmp)?.sync_all()?;
                fs::rename(&tmp, output)?;
                Ok(0)
            }
            1 => {
                let count = count_records(&runs[0])?;
                fs::rename(&runs[0], output)?;
                Ok(count)
            }
            _ => merge_files(&runs, output, Duplicates::Keep),
        }
    })();

    for run in &runs {
        if run.exists() {
            let _ = fs::remove_file(run);
        }
    }

    if let Ok(count) = &result {
        tracing::debug!(
            "Sorted {} pages from {} in {} run(s)",
            count,
            input.display(),
            runs.len()
        );
    }
    result
}

/// K-way merge of hash-sorted files into `output`
///
/// Returns the number of records written.
pub fn merge_files(
    inputs: &[PathBuf],
    output: &Path,
    duplicates: Duplicates,
) -> Result<u64, StoreError> {
    let mut readers = Vec::with_capacity(inputs.len());
    for path in inputs {
        readers.push(BufReader::new(File::open(path)?));
    }

    let mut heap = BinaryHeap::new();
    for (source, reader) in readers.iter_mut().enumerate() {
        if let Some(page) = read_page(reader)? {
            heap.push(Reverse(HeapEntry { page, source }));
        }
    }

    let tmp = partial_path(output);
    let mut writer = BufWriter::new(File::create(&tmp)?);
    let mut written = 0u64;
    let mut pending: Option<Page> = None;

    while let Some(Reverse(HeapEntry { page, source })) = heap.pop() {
        if let Some(next) = read_page(&mut readers[source])? {
            heap.push(Reverse(HeapEntry { page: next, source }));
        }

        match duplicates {
            Duplicates::Keep => {
                write_page(&mut writer, &page)?;
                written += 1;
            }
            Duplicates::CollapseLast => {
                if let Some(prev) = pending.take() {
                    if prev.url_hash != page.url_hash {
                        write_page(&mut writer, &prev)?;
                        written += 1;
                    }
                }
                pending = Some(page);
            }
        }
    }

    if let Some(last) = pending {
        write_page(&mut writer, &last)?;
        written += 1;
    }

    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);
    fs::rename(&tmp, output)?;
    Ok(written)
}

/// `<path>.partial`, the name output is written under before the final rename
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

fn write_run(chunk: &mut Vec<Page>, path: &Path) -> Result<(), StoreError> {
    // stable: equal hashes keep insertion order
    chunk.sort_by(|a, b| a.url_hash.cmp(&b.url_hash));
    let mut writer = BufWriter::new(File::create(path)?);
    for page in chunk.iter() {
        write_page(&mut writer, page)?;
    }
    writer.flush()?;
    chunk.clear();
    Ok(())
}

fn count_records(path: &Path) -> Result<u64, StoreError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    while read_page(&mut reader)?.is_some() {
        count += 1;
    }
    Ok(count)
}

struct HeapEntry {
    page: Page,
    source: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.page
            .url_hash
            .cmp(&other.page.url_hash)
            .then_with(|| self.source.cmp(&other.source))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}
