//! Fetch batch selection
//!
//! The scheduler reads the current store once, in hash order, and splits it:
//! pages at or above the priority threshold for the batch go to the fetch
//! batch, everything else is carried forward unchanged into the raw store of
//! the next cycle. Pages in the batch are not carried; the processor writes
//! them back with their fetch outcome.

use crate::page::Page;
use crate::store::PageStore;
use crate::{FrontierError, Result, RunFlag};

/// Outcome of one scheduling pass
#[derive(Debug, Default)]
pub struct Schedule {
    /// Pages to fetch this cycle
    pub batch: Vec<Page>,
    /// Pages copied unchanged into the raw store
    pub carried: u64,
    /// Priority a page needed to be selected
    pub threshold: f64,
}

/// Picks each cycle's fetch batch by priority
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    batch_size: usize,
}

impl Scheduler {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Priority threshold that selects about `batch_size` pages of `current`
    pub fn threshold(&self, current: &PageStore) -> f64 {
        let size = current.size();
        if size <= self.batch_size as u64 {
            return f64::NEG_INFINITY;
        }
        current.priority_threshold(self.batch_size as f64 / size as f64)
    }

    /// Splits `current` into a fetch batch and pages carried into `raw`
    ///
    /// `current` must be closed (readable); `raw` must be open for writing.
    /// The histogram threshold is approximate, so at most `batch_size` pages
    /// are taken, first come first served in hash order.
    pub fn schedule(&self, current: &PageStore, raw: &PageStore, run: &RunFlag) -> Result<Schedule> {
        let threshold = self.threshold(current);
        let mut schedule = Schedule {
            batch: Vec::with_capacity(self.batch_size.min(current.size() as usize)),
            carried: 0,
            threshold,
        };

        for page in current.iter()? {
            if !run.is_running() {
                tracing::warn!("Scheduling interrupted; {} left unclosed", raw.dir().display());
                return Err(FrontierError::Interrupted);
            }

            let page = page?;
            if schedule.batch.len() < self.batch_size && page.priority >= threshold {
                schedule.batch.push(page);
            } else {
                raw.add_page(&page)?;
                schedule.carried += 1;
            }
        }

        tracing::info!(
            "Scheduled {} pages for fetch (priority >= {:.3}), carried {}",
            schedule.batch.len(),
            threshold,
            schedule.carried
        );
        Ok(schedule)
    }
}
