//! Crawl cycle plumbing around the frontier
//!
//! This module contains everything needed to drive the frontier end to end:
//! - Batch selection from the current store
//! - HTTP fetching and HTML parsing (the default fetch transport)
//! - The cycle driver that schedules, fetches, processes, trims and promotes
//! - Maintenance passes (create, seed, reset, copy)

mod cycle;
mod fetcher;
pub mod maintenance;
mod parser;
mod scheduler;

pub use cycle::{
    CrawlCycle, CycleReport, FrontierDir, CATCHER_DIR, CURRENT_DIR, NEXT_DIR, RAW_DIR,
};
pub use fetcher::{build_http_client, classify_status, fetch_url, HttpFetcher};
pub use maintenance::{
    append_seeds, copy_store, create_store, parse_seed_list, read_seed_file, reset_store,
    SeedReport,
};
pub use parser::parse_html;
pub use scheduler::{Schedule, Scheduler};
