use crate::url::matcher::matches_glob;

/// The crawl's topical patterns
///
/// A URL matching any pattern is a hotspot (distance 0). A set containing
/// `"*"` matches everything and is reported by [`HotspotSet::match_all`].
#[derive(Debug, Clone, Default)]
pub struct HotspotSet {
    patterns: Vec<String>,
    match_all: bool,
}

impl HotspotSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(Into::into)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let match_all = patterns.iter().any(|p| p.chars().all(|c| c == '*'));
        Self {
            patterns,
            match_all,
        }
    }

    /// A set that matches every URL
    pub fn all() -> Self {
        Self::new(["*"])
    }

    pub fn matches(&self, url: &str) -> bool {
        self.match_all || self.patterns.iter().any(|p| matches_glob(p, url))
    }

    /// True if every URL is a hotspot
    pub fn match_all(&self) -> bool {
        self.match_all
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
