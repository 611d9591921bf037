//! Persisted aggregate statistics for a page store
//!
//! The stats file is a small TOML document holding the cycle number, page
//! counts, cumulative fetched score and two histograms (priority and score)
//! that answer "what value do the top X% of pages reach" queries.

use crate::page::{Page, UrlHash};
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of histogram buckets
const BUCKETS: usize = 480;

/// Half-width of the histogram range in log space
const LOG_RANGE: f64 = 24.0;

/// Log-scaled histogram over signed values
///
/// Values are mapped through `sign(v) * ln(1 + |v|)` and bucketed linearly in
/// that space, giving roughly 10% relative resolution from 1e-10 to 1e10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub counts: Vec<u64>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            counts: vec![0; BUCKETS],
        }
    }
}

impl Histogram {
    pub fn add(&mut self, value: f64) {
        if self.counts.len() != BUCKETS {
            self.counts.resize(BUCKETS, 0);
        }
        let idx = Self::bucket_of(value);
        self.counts[idx] += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Smallest value reached by the top `fraction` of entries
    ///
    /// `threshold(0.1)` is a value such that about 10% of the recorded values
    /// are greater than or equal to it. Returns `f64::NEG_INFINITY` for an
    /// empty histogram so that every value passes.
    pub fn threshold(&self, fraction: f64) -> f64 {
        let total = self.total();
        if total == 0 {
            return f64::NEG_INFINITY;
        }

        let wanted = (fraction.clamp(0.0, 1.0) * total as f64).ceil() as u64;
        if wanted == 0 {
            return f64::INFINITY;
        }

        let mut seen = 0u64;
        for (idx, count) in self.counts.iter().enumerate().rev() {
            seen += count;
            if seen >= wanted {
                return Self::lower_edge(idx);
            }
        }
        f64::NEG_INFINITY
    }

    /// Value at percentile `p` (0..=100): `p`% of entries fall below it
    pub fn percentile(&self, p: f64) -> f64 {
        self.threshold(1.0 - p.clamp(0.0, 100.0) / 100.0)
    }

    fn bucket_of(value: f64) -> usize {
        let value = if value.is_nan() { 0.0 } else { value };
        let scaled = value.signum() * value.abs().ln_1p();
        let pos = (scaled + LOG_RANGE) / (2.0 * LOG_RANGE) * BUCKETS as f64;
        (pos.floor().max(0.0) as usize).min(BUCKETS - 1)
    }

    fn lower_edge(idx: usize) -> f64 {
        if idx == 0 {
            return f64::NEG_INFINITY;
        }
        let scaled = idx as f64 / BUCKETS as f64 * 2.0 * LOG_RANGE - LOG_RANGE;
        scaled.signum() * scaled.abs().exp_m1()
    }
}

/// Aggregate statistics of a closed store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StoreStats {
    pub cycle: u64,
    pub size: u64,
    pub fetched: u64,
    pub failed: u64,
    pub fetched_score: f64,
    pub priority_histogram: Histogram,
    pub score_histogram: Histogram,
}

impl StoreStats {
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| StoreError::Stats(format!("{}: {}", path.display(), e)))
    }

    /// Writes the stats next to `path` and renames into place
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let content = toml::to_string(self).map_err(|e| StoreError::Stats(e.to_string()))?;
        let tmp = path.with_extension("partial");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn record(&mut self, page: &Page) {
        self.size += 1;
        if page.is_fetched() {
            self.fetched += 1;
            self.fetched_score += page.score;
        }
        if page.retries > 0 {
            self.failed += 1;
        }
        self.priority_histogram.add(page.priority);
        self.score_histogram.add(page.score);
    }
}

/// Running statistics for a store open for writing
#[derive(Debug)]
pub(crate) struct StatsAccumulator {
    stats: StoreStats,
    max_hash: Option<UrlHash>,
    sorted: bool,
}

impl StatsAccumulator {
    pub fn new(cycle: u64) -> Self {
        Self {
            stats: StoreStats::new(cycle),
            max_hash: None,
            sorted: true,
        }
    }

    pub fn record(&mut self, page: &Page) {
        self.stats.record(page);
        match self.max_hash {
            Some(max) if page.url_hash < max => self.sorted = false,
            _ => self.max_hash = Some(page.url_hash),
        }
    }

    /// True while every page so far arrived in non-decreasing hash order
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn size(&self) -> u64 {
        self.stats.size
    }

    pub fn finish(self, cycle: u64) -> StoreStats {
        let mut stats = self.stats;
        stats.cycle = cycle;
        stats
    }
}
