use crate::page::Page;
use crate::policy::FrontierPolicy;
use rand::rngs::StdRng;
use rand::Rng;
use std::fmt;

/// Why a folded page was not written to the next cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SizeLimit,
    TooManyRetries,
    NotHotspot,
    UrlFilter,
    DiscoveryDisabled,
    AlreadyFetched,
    HasRetries,
    QuotaExhausted,
    NotAtWaveDistance,
    Stochastic,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::SizeLimit => "size limit reached",
            Self::TooManyRetries => "too many retries",
            Self::NotHotspot => "distance 0 but not a hotspot",
            Self::UrlFilter => "rejected by url filter",
            Self::DiscoveryDisabled => "discovery front disabled",
            Self::AlreadyFetched => "already fetched",
            Self::HasRetries => "has retries",
            Self::QuotaExhausted => "discovery quota exhausted",
            Self::NotAtWaveDistance => "not at wave distance",
            Self::Stochastic => "stochastic rejection",
        };
        f.write_str(reason)
    }
}

/// Per-pass admission state: pages written so far and the remaining quota
pub(crate) struct Admission<'a> {
    policy: &'a FrontierPolicy,
    cycle: u64,
    written: u64,
    quota_left: u64,
    /// Computed once per pass from the candidate count given up front
    ratio: f64,
    rng: StdRng,
}

impl<'a> Admission<'a> {
    pub fn new(policy: &'a FrontierPolicy, cycle: u64, discovery_pages: u64, rng: StdRng) -> Self {
        let quota = policy.discovery.front_size;
        let ratio = if discovery_pages == 0 {
            1.0
        } else {
            (quota as f64 / discovery_pages as f64).min(1.0)
        };
        Self {
            policy,
            cycle,
            written: 0,
            quota_left: quota,
            ratio,
            rng,
        }
    }

    /// Ordered decision tree; the first failing test names the reason
    ///
    /// `Ok(true)` marks a page admitted through the discovery front.
    pub fn decide(&mut self, page: &Page) -> Result<bool, Rejection> {
        let policy = self.policy;

        if policy.max_size > 0 && self.written >= policy.max_size && !page.is_fetched() {
            return Err(Rejection::SizeLimit);
        }

        if page.distance <= policy.max_distance {
            if policy.too_many_retries(page) {
                return Err(Rejection::TooManyRetries);
            }
            if page.distance == 0 && !policy.is_hotspot(&page.url) {
                return Err(Rejection::NotHotspot);
            }
            if policy.filter_url(&page.url).is_none() {
                return Err(Rejection::UrlFilter);
            }
            self.written += 1;
            return Ok(false);
        }

        if !policy.discovery.enabled() {
            return Err(Rejection::DiscoveryDisabled);
        }
        if page.is_fetched() {
            return Err(Rejection::AlreadyFetched);
        }
        if page.retries > 0 {
            return Err(Rejection::HasRetries);
        }
        if policy.filter_url(&page.url).is_none() {
            return Err(Rejection::UrlFilter);
        }
        if self.quota_left == 0 {
            return Err(Rejection::QuotaExhausted);
        }
        if !policy.discovery_distance_eligible(page.distance, self.cycle) {
            return Err(Rejection::NotAtWaveDistance);
        }
        if policy.discovery.stochastic && self.rng.gen::<f64>() >= self.ratio {
            return Err(Rejection::Stochastic);
        }

        self.quota_left -= 1;
        self.written += 1;
        Ok(true)
    }
}
