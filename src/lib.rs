//! Ripple-Frontier: a disk-resident crawl frontier engine
//!
//! This crate tracks the set of known pages, their fetch history, scores and
//! link graph, and consolidates each crawl cycle's fetch results into the
//! frontier for the next cycle. Several engine instances can share one logical
//! frontier through the `distributed` module.

pub mod config;
pub mod crawler;
pub mod distributed;
pub mod output;
pub mod page;
pub mod policy;
pub mod processor;
pub mod store;
pub mod trimmer;
pub mod url;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Main error type for frontier operations
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error talking to {node}: {message}")]
    Transport { node: String, message: String },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Document pipeline error: {0}")]
    Pipeline(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Sync round {round} timed out waiting for {missing:?}")]
    SyncTimeout { round: u64, missing: Vec<String> },

    #[error("Operation interrupted")]
    Interrupted,
}

/// Coarse classification of a [`FrontierError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid policy parameters
    Configuration,
    /// Operating on a store that is not open, or open in the wrong mode
    StoreState,
    /// Disk or database failures during sort/merge/read
    Io,
    /// Remote node unreachable or misbehaving
    Transport,
    /// Fetch transport or downstream pipeline failures
    Collaborator,
    /// The run flag was cleared
    Cancelled,
}

impl FrontierError {
    /// Returns the error category a library caller should branch on
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::Url(_) => ErrorCategory::Configuration,
            Self::Store(e) if e.is_state_error() => ErrorCategory::StoreState,
            Self::Store(_) | Self::Io(_) | Self::Sqlite(_) => ErrorCategory::Io,
            Self::Transport { .. } | Self::SyncTimeout { .. } => ErrorCategory::Transport,
            Self::Fetch(_) | Self::Pipeline(_) => ErrorCategory::Collaborator,
            Self::Interrupted => ErrorCategory::Cancelled,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for frontier operations
pub type Result<T> = std::result::Result<T, FrontierError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Shared "still running" flag polled at iteration boundaries
///
/// Clones share the same flag. Once stopped, long-running passes finish the
/// item in hand and return without starting new work.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

// Re-export commonly used types
pub use config::Config;
pub use page::{Page, Signature, UrlHash};
pub use policy::FrontierPolicy;
pub use store::{OpenMode, PageStore, StoreError};
pub use trimmer::FrontierTrimmer;
