use crate::url::matcher::matches_wildcard;
use crate::url::normalize::normalize_url;

/// URL admission predicate
///
/// Returns the accepted (possibly rewritten) form of the URL, or `None` to
/// reject it.
pub trait UrlFilter: Send + Sync {
    fn filter(&self, url: &str) -> Option<String>;
}

/// Accepts every URL unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl UrlFilter for AcceptAll {
    fn filter(&self, url: &str) -> Option<String> {
        Some(url.to_string())
    }
}

/// Default admission filter: normalization plus a wildcard domain deny list
#[derive(Debug, Clone, Default)]
pub struct AdmissionFilter {
    deny_domains: Vec<String>,
}

impl AdmissionFilter {
    pub fn new(deny_domains: Vec<String>) -> Self {
        Self {
            deny_domains: deny_domains
                .into_iter()
                .map(|d| d.to_lowercase())
                .collect(),
        }
    }

    fn is_denied(&self, domain: &str) -> bool {
        self.deny_domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, domain))
    }
}

impl UrlFilter for AdmissionFilter {
    fn filter(&self, url: &str) -> Option<String> {
        let normalized = match normalize_url(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::trace!("Rejected {}: {}", url, e);
                return None;
            }
        };

        let domain = normalized.host_str()?.to_lowercase();
        if self.is_denied(&domain) {
            tracing::trace!("Rejected {}: domain {} is denied", url, domain);
            return None;
        }

        Some(normalized.to_string())
    }
}
