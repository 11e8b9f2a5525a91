use url::Url;

/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches the bare host and any subdomain
///
/// # Examples
///
/// ```
/// use asset_ripper::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "www.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Checks whether `link` belongs to the crawled site
///
/// With configured host patterns the link's host must match one of them;
/// without any, it must share the host of the page it was found on.
pub fn is_same_site(link: &Url, page: &Url, hosts: &[String]) -> bool {
    let Some(link_host) = link.host_str() else {
        return false;
    };
    let link_host = link_host.to_lowercase();

    if hosts.is_empty() {
        return page
            .host_str()
            .map(|h| h.eq_ignore_ascii_case(&link_host))
            .unwrap_or(false);
    }

    hosts
        .iter()
        .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &link_host))
}
