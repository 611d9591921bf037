//! URL handling for Ripple-Frontier
//!
//! This module provides:
//! - URL normalization and link resolution
//! - Wildcard domain and glob URL matching
//! - The hotspot pattern set
//! - The URL admission filter consulted before a URL enters the frontier

mod filter;
mod hotspot;
mod matcher;
mod normalize;

pub use filter::{AcceptAll, AdmissionFilter, UrlFilter};
pub use hotspot::HotspotSet;
pub use matcher::{matches_glob, matches_wildcard};
pub use normalize::{normalize_url, resolve_link};
