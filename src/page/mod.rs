//! Frontier records
//!
//! A [`Page`] is one entry per known URL: its fetch history, scores, hotspot
//! distance and the part of the link graph that points at it. Pages are kept
//! on disk in the versioned binary record format implemented by [`codec`].

pub mod codec;
mod hash;
mod signature;

pub use codec::{read_page, write_page, PAGE_FORMAT_VERSION};
pub use hash::{UrlHash, URL_HASH_LEN};
pub use signature::Signature;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One frontier entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    pub url_hash: UrlHash,

    /// Relative importance, propagated from inlinks
    pub score: f64,

    /// Freshness-driven fetch priority, recomputed every cycle
    pub priority: f64,

    /// Hop count from the nearest hotspot; 0 = hotspot
    pub distance: u32,

    /// Consecutive failed fetch attempts
    pub retries: u32,

    /// Timestamps in epoch milliseconds, 0 = never
    pub last_attempt: i64,
    pub last_success: i64,
    pub last_change: i64,

    /// Distinct pages linking here, accumulated during consolidation
    pub num_inlinks: u32,

    pub anchors: BTreeSet<String>,
    pub parents: BTreeSet<String>,

    pub signature: Signature,

    /// Handed to the downstream document pipeline
    pub emitted: bool,

    /// Ownership marker, only meaningful in distributed mode
    pub is_local: bool,
}

impl Page {
    /// Creates a never-fetched page for `url`
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let url_hash = UrlHash::of(&url);
        Self {
            url,
            url_hash,
            score: 0.0,
            priority: 0.0,
            distance: 0,
            retries: 0,
            last_attempt: 0,
            last_success: 0,
            last_change: 0,
            num_inlinks: 0,
            anchors: BTreeSet::new(),
            parents: BTreeSet::new(),
            signature: Signature::EMPTY,
            emitted: false,
            is_local: false,
        }
    }

    /// True once the page has been fetched successfully at least once
    pub fn is_fetched(&self) -> bool {
        self.last_success > 0
    }

    /// True for a bare link record: never attempted, never fetched, and
    /// carrying no inlinks of its own
    ///
    /// Each link record stands for one inlink. Consolidation gives every
    /// unattempted page it keeps at least one inlink, so a page carried over
    /// from a previous cycle is never mistaken for a fresh link.
    pub fn is_link_record(&self) -> bool {
        self.last_attempt == 0 && self.last_success == 0 && self.num_inlinks == 0
    }

    pub fn add_anchor(&mut self, anchor: &str) {
        let anchor = anchor.trim();
        if !anchor.is_empty() {
            self.anchors.insert(anchor.to_string());
        }
    }

    pub fn add_parent(&mut self, parent: &str) {
        self.parents.insert(parent.to_string());
    }

    /// Drops fetch history while keeping the link graph
    pub fn reset_history(&mut self) {
        self.retries = 0;
        self.last_attempt = 0;
        self.last_success = 0;
        self.last_change = 0;
        self.priority = 0.0;
        self.emitted = false;
        self.signature = Signature::EMPTY;
    }
}
