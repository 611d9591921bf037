//! Integration tests for ripple-frontier
//!
//! These tests drive the public API end to end: stores on disk, full crawl
//! cycles, two-node clusters on localhost and the HTTP transport against a
//! mock server.

mod cycle_tests;
mod distributed_tests;
mod fetcher_tests;
mod store_tests;
