//! Frontier admission and scheduling policy
//!
//! [`FrontierPolicy`] is built once from the configuration and shared
//! (behind an `Arc`) by the trimmer and the fetch result processor. It is
//! never mutated after construction.

use crate::config::Config;
use crate::page::Page;
use crate::url::{AdmissionFilter, HotspotSet, UrlFilter};
use std::fmt;
use std::sync::Arc;

/// Weight of the "static" (unchanged or unreliable) time in the priority
const STATIC_WEIGHT: f64 = 0.4;

/// Weight of the time a page has been failing
const DEAD_WEIGHT: f64 = 2.0;

/// Scale applied to the priority, in milliseconds
const PRIORITY_SCALE: f64 = 10_000.0;

/// Discovery front: pages beyond the hop limit admitted each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscoveryPolicy {
    /// Per-cycle quota; 0 disables discovery
    pub front_size: u64,
    /// Admit candidates with probability quota/candidates instead of first-come
    pub stochastic: bool,
    /// Cycles between discovery waves; 0 disables waves
    pub wave_period: u64,
}

impl DiscoveryPolicy {
    pub fn enabled(&self) -> bool {
        self.front_size > 0
    }

    /// True if a new discovery wave starts in `cycle`
    pub fn is_wave_start(&self, cycle: u64) -> bool {
        self.wave_period > 0 && cycle % self.wave_period == 0
    }
}

/// Immutable crawl policy
#[derive(Clone)]
pub struct FrontierPolicy {
    pub max_distance: u32,
    /// Retry budget per distance (index = distance)
    pub max_retries: Vec<u32>,
    /// Cap on pages written per trim, 0 = unlimited
    pub max_size: u64,
    pub hotspots: HotspotSet,
    pub restrict_to_hotspots: bool,
    pub track_parents: bool,
    pub similarity_threshold: f64,
    pub discovery: DiscoveryPolicy,
    pub url_filter: Arc<dyn UrlFilter>,
}

impl fmt::Debug for FrontierPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontierPolicy")
            .field("max_distance", &self.max_distance)
            .field("max_retries", &self.max_retries)
            .field("max_size", &self.max_size)
            .field("hotspots", &self.hotspots)
            .field("restrict_to_hotspots", &self.restrict_to_hotspots)
            .field("track_parents", &self.track_parents)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("discovery", &self.discovery)
            .finish_non_exhaustive()
    }
}

impl Default for FrontierPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FrontierPolicy {
    /// Builds the policy from a validated configuration
    pub fn from_config(config: &Config) -> Self {
        let frontier = &config.frontier;
        Self {
            max_distance: frontier.max_distance,
            max_retries: frontier.max_retries.clone(),
            max_size: frontier.max_size,
            hotspots: HotspotSet::new(frontier.hotspots.iter().cloned()),
            restrict_to_hotspots: frontier.restrict_to_hotspots,
            track_parents: frontier.track_parents,
            similarity_threshold: frontier.similarity_threshold,
            discovery: DiscoveryPolicy {
                front_size: config.discovery.front_size,
                stochastic: config.discovery.stochastic,
                wave_period: config.discovery.wave_period,
            },
            url_filter: Arc::new(AdmissionFilter::new(config.filter.deny_domains.clone())),
        }
    }

    /// Replaces the URL admission filter
    pub fn with_url_filter(mut self, filter: Arc<dyn UrlFilter>) -> Self {
        self.url_filter = filter;
        self
    }

    /// Whether a page has used up its retry budget
    ///
    /// True when the page's distance has no entry in the retry table, or when
    /// its retries exceed the budget for its distance and nothing links to it.
    /// A page with inlinks is always kept since something will re-link it.
    pub fn too_many_retries(&self, page: &Page) -> bool {
        let Some(&limit) = self.max_retries.get(page.distance as usize) else {
            return true;
        };
        page.retries > limit && page.num_inlinks == 0
    }

    /// Runs a URL through the admission filter
    pub fn filter_url(&self, url: &str) -> Option<String> {
        self.url_filter.filter(url)
    }

    pub fn is_hotspot(&self, url: &str) -> bool {
        self.hotspots.matches(url)
    }

    /// Distance of the discovery birthline
    pub fn birth_distance(&self) -> u32 {
        self.max_distance.saturating_add(1)
    }

    /// Distance given to a fetched page that is not a hotspot, just past
    /// the birthline so it can be rediscovered at its true distance
    pub fn rediscovery_distance(&self) -> u32 {
        self.max_distance.saturating_add(2)
    }

    /// Whether a discovery candidate at `distance` may be admitted in `cycle`
    ///
    /// Without waves every distance beyond the hop limit is eligible. With
    /// waves only the birthline is eligible when a wave starts, and only
    /// distances beyond it otherwise.
    pub fn discovery_distance_eligible(&self, distance: u32, cycle: u64) -> bool {
        if distance <= self.max_distance {
            return false;
        }
        if self.discovery.wave_period == 0 {
            return true;
        }
        if self.discovery.is_wave_start(cycle) {
            distance == self.birth_distance()
        } else {
            distance > self.birth_distance()
        }
    }

    /// Recomputes the freshness priority of a page as of `now` (epoch ms)
    pub fn recompute_priority(&self, page: &mut Page, now: i64) {
        page.priority = priority_at(page, now);
    }
}

/// `(tsls - static * 0.4 - dead * 2) / 10000`, where `static` is the larger of
/// the time since the content last changed beyond the last success and the
/// time since the last success beyond the last attempt, and `dead` is the
/// time a failing page has gone without success
pub fn priority_at(page: &Page, now: i64) -> f64 {
    let since_success = (now - page.last_success).max(0) as f64;
    let since_change = (now - page.last_change).max(0) as f64;
    let since_attempt = (now - page.last_attempt).max(0) as f64;

    let time_static = (since_change - since_success).max(since_success - since_attempt);
    let time_dead = if page.retries > 0 {
        (since_success - since_attempt).max(0.0)
    } else {
        0.0
    };

    (since_success - time_static * STATIC_WEIGHT - time_dead * DEAD_WEIGHT) / PRIORITY_SCALE
}
