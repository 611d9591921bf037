/// Checks if a domain matches a wildcard domain pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches "example.com" itself and any
///    subdomain at any depth
///
/// # Examples
///
/// ```
/// use ripple_frontier::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base
            || (candidate.len() > base.len()
                && candidate.ends_with(base)
                && candidate.as_bytes()[candidate.len() - base.len() - 1] == b'.')
    } else {
        candidate == pattern
    }
}

/// Matches a whole URL against a glob where `*` stands for any run of
/// characters (including none)
///
/// ```
/// use ripple_frontier::url::matches_glob;
///
/// assert!(matches_glob("https://example.com/*", "https://example.com/a/b"));
/// assert!(matches_glob("*://*.example.com/*", "https://docs.example.com/x"));
/// assert!(!matches_glob("https://example.com/*", "https://example.org/"));
/// ```
pub fn matches_glob(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0usize, 0usize);
    // Position of the last '*' seen and the text index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, tried)) = backtrack {
            pi = star + 1;
            ti = tried + 1;
            backtrack = Some((star, tried + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == b'*')
}
