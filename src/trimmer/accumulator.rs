//! Duplicate folding as a two-state machine
//!
//! Input arrives in hash order, so every record for one URL is adjacent.
//! `push` either folds the record into the current block or, on a new URL,
//! hands back the finished block and starts the next one.

use crate::page::Page;

/// One URL's records folded so far
///
/// Records come in two kinds. Link records are the fresh outlinks written
/// this cycle; each one adds an inlink and its score to the contribution.
/// Every other record is the page's own state (carried, retried or fetched)
/// and brings the inlink count and score it already had.
#[derive(Debug)]
pub(crate) struct Block {
    page: Page,
    tally: Tally,
}

#[derive(Debug, Default)]
struct Tally {
    /// Summed score of link records, the PageRank-style contribution
    contribution: f64,
    /// Link records seen, each one a new inlink
    new_inlinks: u32,
    /// Largest inlink count among state records
    prior_inlinks: u32,
    /// Largest score among unfetched state records
    prior_score: Option<f64>,
}

impl Tally {
    fn count(&mut self, record: &Page) {
        if record.is_link_record() {
            self.contribution += record.score;
            self.new_inlinks = self.new_inlinks.saturating_add(1);
            return;
        }
        self.prior_inlinks = self.prior_inlinks.max(record.num_inlinks);
        if !record.is_fetched() {
            let best = self.prior_score.map_or(record.score, |s| s.max(record.score));
            self.prior_score = Some(best);
        }
    }
}

impl Block {
    fn start(page: Page) -> Self {
        let mut tally = Tally::default();
        tally.count(&page);
        Self { page, tally }
    }

    fn fold(&mut self, other: Page) {
        self.tally.count(&other);
        let acc = &mut self.page;

        acc.anchors.extend(other.anchors.iter().cloned());
        acc.parents.extend(other.parents.iter().cloned());

        acc.distance = acc.distance.min(other.distance);
        acc.last_attempt = acc.last_attempt.max(other.last_attempt);
        acc.last_change = acc.last_change.max(other.last_change);

        if other.is_fetched() {
            // A success supersedes any failures folded so far
            acc.retries = other.retries;
            acc.signature = other.signature;
            acc.emitted = other.emitted;
            acc.priority = other.priority;
            acc.score = other.score;
            acc.is_local = other.is_local;
        } else if !acc.is_fetched() {
            acc.retries = acc.retries.max(other.retries);
        }

        acc.last_success = acc.last_success.max(other.last_success);
    }

    /// Applies the accumulated link data and returns the folded page
    ///
    /// An unfetched page keeps the score it already had plus this cycle's
    /// contribution; a fetched page keeps its own score.
    fn into_page(self) -> Page {
        let Block { mut page, tally } = self;
        page.num_inlinks = tally.prior_inlinks.saturating_add(tally.new_inlinks);
        if !page.is_fetched() {
            match tally.prior_score {
                Some(prior) => page.score = prior + tally.contribution,
                None if tally.new_inlinks > 0 => page.score = tally.contribution,
                None => {}
            }
        }
        page
    }
}

#[derive(Debug, Default)]
pub(crate) enum Accumulator {
    #[default]
    Empty,
    Accumulating(Block),
}

impl Accumulator {
    /// Feeds one record; returns the previous URL's page when `page` starts
    /// a new block
    pub fn push(&mut self, page: Page) -> Option<Page> {
        match std::mem::take(self) {
            Accumulator::Empty => {
                *self = Accumulator::Accumulating(Block::start(page));
                None
            }
            Accumulator::Accumulating(mut block) => {
                if block.page.url_hash == page.url_hash {
                    block.fold(page);
                    *self = Accumulator::Accumulating(block);
                    None
                } else {
                    *self = Accumulator::Accumulating(Block::start(page));
                    Some(block.into_page())
                }
            }
        }
    }

    /// Flushes the last block
    pub fn finish(&mut self) -> Option<Page> {
        match std::mem::take(self) {
            Accumulator::Empty => None,
            Accumulator::Accumulating(block) => Some(block.into_page()),
        }
    }
}
