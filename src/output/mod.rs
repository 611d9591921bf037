//! Output module for documents and store reports
//!
//! This module handles:
//! - Writing fetched documents to SQLite (the default document pipeline)
//! - Printing store statistics and page listings

mod sqlite_output;
pub mod stats;

pub use sqlite_output::{SqliteDocumentSink, StoredDocument};
pub use stats::{format_page_line, format_store_stats, print_store_stats};
