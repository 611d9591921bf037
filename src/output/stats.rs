//! Human-readable store statistics and listings
//!
//! This module provides functionality for displaying what a store holds:
//! the persisted statistics and one line per page.

use crate::page::Page;
use crate::store::StoreStats;
use chrono::{TimeZone, Utc};
use std::path::Path;

/// Percentiles shown for the priority and score distributions
const PERCENTILES: [f64; 5] = [10.0, 50.0, 90.0, 99.0, 99.9];

/// Formats a store's statistics
pub fn format_store_stats(dir: &Path, stats: &StoreStats) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Store Statistics: {} ===\n\n", dir.display()));

    out.push_str("Overview:\n");
    out.push_str(&format!("  Cycle: {}\n", stats.cycle));
    out.push_str(&format!("  Total pages: {}\n", stats.size));

    let fetched_rate = if stats.size > 0 {
        (stats.fetched as f64 / stats.size as f64) * 100.0
    } else {
        0.0
    };
    out.push_str(&format!(
        "  Fetched pages: {} ({:.1}%)\n",
        stats.fetched, fetched_rate
    ));
    out.push_str(&format!("  Pages with retries: {}\n", stats.failed));
    out.push_str(&format!("  Fetched score: {:.4}\n\n", stats.fetched_score));

    if stats.size > 0 {
        out.push_str("Percentiles:\n");
        out.push_str("  pct      priority         score\n");
        for p in PERCENTILES {
            out.push_str(&format!(
                "  {:<6} {:>12.3} {:>13.6}\n",
                p,
                stats.priority_histogram.percentile(p),
                stats.score_histogram.percentile(p)
            ));
        }
    }
    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_store_stats(dir: &Path, stats: &StoreStats) {
    print!("{}", format_store_stats(dir, stats));
}

fn format_time(millis: i64) -> String {
    if millis == 0 {
        return "-".to_string();
    }
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

/// One listing line for a page
pub fn format_page_line(page: &Page) -> String {
    format!(
        "{}\t{}\tdist={}\tscore={:.6}\tprio={:.3}\tretries={}\tinlinks={}\tsuccess={}",
        page.url_hash,
        page.url,
        page.distance,
        page.score,
        page.priority,
        page.retries,
        page.num_inlinks,
        format_time(page.last_success)
    )
}
