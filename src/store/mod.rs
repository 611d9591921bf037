//! Disk-backed page stores
//!
//! This module handles all persistence for the frontier:
//! - Append-writing pages into a write-ahead unsorted file
//! - Close-time external sort into a hash-ordered file
//! - Sequential iteration in hash order
//! - Persisted aggregate statistics and percentile thresholds
//! - Two-way merge and crash repair
//!
//! # Directory layout
//!
//! ```text
//! <dir>/pages        write-ahead, unsorted; removed after a clean close
//! <dir>/pagesByMd5   hash-sorted; the only file a reader consults
//! <dir>/stats        cycle number, counts and histograms (TOML)
//! ```

mod page_store;
pub mod sort;
mod stats;

pub use page_store::{
    OpenMode, PageIter, PageStore, RepairOutcome, StoreOptions, WriteOptions, SORTED_FILE,
    STATS_FILE, UNSORTED_FILE,
};
pub use stats::{Histogram, StoreStats};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::page::Page;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store is not open for writing")]
    NotOpenForWriting,

    #[error("Store is not open for reading (was it closed?)")]
    NotOpenForReading,

    #[error("Store is already open")]
    AlreadyOpen,

    #[error("Store not found: {0}")]
    Missing(PathBuf),

    #[error("Source and destination are the same store: {0}")]
    SameStore(PathBuf),

    #[error("Incompatible page record version {0}, need at least 5")]
    IncompatibleVersion(u8),

    #[error("Corrupt store data: {0}")]
    Corrupt(String),

    #[error("Stats file error: {0}")]
    Stats(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Programming errors: operating on a store in the wrong lifecycle state
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::NotOpenForWriting
                | Self::NotOpenForReading
                | Self::AlreadyOpen
                | Self::Missing(_)
                | Self::SameStore(_)
        )
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Destination for pages produced during a cycle
///
/// Implemented by [`PageStore`] (local append) and by the distributed store,
/// which may ship a page to the node that owns it instead.
#[async_trait]
pub trait PageSink: Send + Sync {
    async fn add_page(&self, page: Page) -> crate::Result<()>;
}

#[async_trait]
impl PageSink for PageStore {
    async fn add_page(&self, page: Page) -> crate::Result<()> {
        PageStore::add_page(self, &page)?;
        Ok(())
    }
}
