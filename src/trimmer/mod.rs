//! Frontier consolidation
//!
//! [`FrontierTrimmer`] turns a raw store (duplicates accumulated over a
//! cycle) into the clean store for the next cycle in a single pass over the
//! hash-ordered input:
//! - Duplicate records of one URL are folded into one
//! - Inlink counts and PageRank-style scores are accumulated
//! - The admission filter decides which pages survive
//! - Priorities are recomputed for the survivors
//!
//! The trimmer never opens or closes stores; callers hand it an origin that
//! has been closed (so it can be iterated) and a destination open for
//! writing, and decide what to do with the destination afterwards.

mod accumulator;
mod admission;

pub use admission::Rejection;

use crate::page::{now_millis, Page};
use crate::policy::FrontierPolicy;
use crate::store::PageStore;
use crate::{FrontierError, Result, RunFlag};
use accumulator::Accumulator;
use admission::Admission;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Counters from one trim pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrimReport {
    /// Records read from the origin store
    pub read: u64,
    /// Distinct URLs after folding duplicates
    pub folded: u64,
    /// Pages written to the destination
    pub written: u64,
    pub rejected: u64,
    /// Pages admitted through the discovery front
    pub discovered: u64,
}

/// Consolidates a raw store into the next cycle's store
pub struct FrontierTrimmer {
    policy: Arc<FrontierPolicy>,
    seed: Option<u64>,
}

impl FrontierTrimmer {
    pub fn new(policy: Arc<FrontierPolicy>) -> Self {
        Self { policy, seed: None }
    }

    /// Makes stochastic discovery admission reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn policy(&self) -> &FrontierPolicy {
        &self.policy
    }

    /// Runs one consolidation pass from `origin` into `dest`
    ///
    /// # Arguments
    ///
    /// * `origin` - Closed raw store, iterated in hash order
    /// * `dest` - Store open for writing; receives the survivors
    /// * `discovery_pages` - Discovery candidates produced this cycle, used
    ///   for the stochastic admission ratio
    /// * `run` - Polled once per input record
    ///
    /// # Returns
    ///
    /// * `Ok(TrimReport)` - The pass completed; `dest` is ready to close
    /// * `Err(FrontierError::Interrupted)` - `run` was cleared; `dest` is
    ///   left as is and must be discarded
    /// * `Err(_)` - Any I/O failure; `dest` must be discarded
    pub fn trim(
        &self,
        origin: &PageStore,
        dest: &PageStore,
        discovery_pages: u64,
        run: &RunFlag,
    ) -> Result<TrimReport> {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut admission = Admission::new(&self.policy, dest.cycle(), discovery_pages, rng);
        let now = now_millis();
        let mut report = TrimReport::default();
        let mut acc = Accumulator::Empty;

        tracing::info!(
            "Trimming {} into {} (cycle {}, {} discovery candidates)",
            origin.dir().display(),
            dest.dir().display(),
            dest.cycle(),
            discovery_pages
        );

        for page in origin.iter()? {
            if !run.is_running() {
                tracing::warn!(
                    "Trim interrupted after {} records; {} left unclosed",
                    report.read,
                    dest.dir().display()
                );
                return Err(FrontierError::Interrupted);
            }

            let page = page?;
            report.read += 1;
            if let Some(done) = acc.push(page) {
                self.flush(done, dest, &mut admission, now, &mut report)?;
            }
        }

        if let Some(done) = acc.finish() {
            self.flush(done, dest, &mut admission, now, &mut report)?;
        }

        tracing::info!(
            "Trim done: {} read, {} urls, {} written, {} rejected, {} discovered",
            report.read,
            report.folded,
            report.written,
            report.rejected,
            report.discovered
        );
        Ok(report)
    }

    fn flush(
        &self,
        mut page: Page,
        dest: &PageStore,
        admission: &mut Admission<'_>,
        now: i64,
        report: &mut TrimReport,
    ) -> Result<()> {
        report.folded += 1;
        match admission.decide(&page) {
            Ok(discovered) => {
                self.policy.recompute_priority(&mut page, now);
                dest.add_page(&page)?;
                report.written += 1;
                if discovered {
                    report.discovered += 1;
                }
            }
            Err(reason) => {
                tracing::debug!("Rejected {}: {}", page.url, reason);
                report.rejected += 1;
            }
        }
        Ok(())
    }
}
