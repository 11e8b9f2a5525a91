//! Anchor scanning
//!
//! Resolves every `<a href>` on a page against the page URL and sorts the
//! results into download candidates and next-page candidates.

use super::CrawlCandidate;
use crate::assets::{extension_of, is_supported_extension};
use crate::config::SiteConfig;
use crate::url::{is_same_site, normalize_url};
use scraper::{Html, Selector};
use url::Url;

/// A resolved link and its anchor text
#[derive(Debug, Clone)]
pub(crate) struct Anchor {
    pub url: Url,
    pub text: String,
}

/// Collects all followable anchors on the page, in document order
pub(crate) fn collect_anchors(document: &Html, page_url: &Url) -> Vec<Anchor> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = resolve_link(href, page_url)?;
            let text = element.text().collect::<String>().trim().to_string();
            Some(Anchor { url, text })
        })
        .collect()
}

/// Resolves a link href to an absolute, normalized URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: links
/// - Fragment-only links
/// - Invalid or non-HTTP(S) URLs
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_url(absolute.as_str()).ok()
}

/// Checks whether a URL lives in the asset store
pub(crate) fn is_asset_store_url(url: &Url, site: &SiteConfig) -> bool {
    url.path().contains(&site.asset_path)
}

/// A download candidate: under the asset store with a supported extension
pub(crate) fn is_download_url(url: &Url, site: &SiteConfig) -> bool {
    is_asset_store_url(url, site) && is_supported_extension(&extension_of(url.path()))
}

/// Splits anchors into download candidates and same-site page links
///
/// Asset-store URLs and links to asset files never become next pages: they
/// are files, not catalogue pages. Both lists are deduplicated by URL.
pub(crate) fn partition_anchors(
    anchors: &[Anchor],
    page_url: &Url,
    site: &SiteConfig,
) -> (Vec<CrawlCandidate>, Vec<String>) {
    let mut downloads: Vec<CrawlCandidate> = Vec::new();
    let mut pages: Vec<String> = Vec::new();

    for anchor in anchors {
        if is_download_url(&anchor.url, site) {
            push_candidate(&mut downloads, CrawlCandidate::from_url(&anchor.url, &anchor.text));
        } else if !is_asset_store_url(&anchor.url, site)
            && !is_supported_extension(&extension_of(anchor.url.path()))
            && is_same_site(&anchor.url, page_url, &site.hosts)
            && anchor.url != *page_url
        {
            let link = anchor.url.to_string();
            if !pages.contains(&link) {
                pages.push(link);
            }
        }
    }

    (downloads, pages)
}

/// Appends a candidate unless one with the same URL is already present
pub(crate) fn push_candidate(list: &mut Vec<CrawlCandidate>, candidate: CrawlCandidate) {
    if !list.iter().any(|c| c.url == candidate.url) {
        list.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_site() -> SiteConfig {
        SiteConfig {
            hosts: vec!["example.com".to_string()],
            asset_path: "/dam/models/".to_string(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_resolve_link_skips_special_schemes() {
        let base = Url::parse("https://example.com/a/").unwrap();
        assert!(resolve_link("javascript:void(0)", &base).is_none());
        assert!(resolve_link("MAILTO:x@example.com", &base).is_none());
        assert!(resolve_link("#top", &base).is_none());
        assert!(resolve_link("   ", &base).is_none());
    }

    #[test]
    fn test_resolve_link_relative() {
        let base = Url::parse("https://example.com/a/b/").unwrap();
        let url = resolve_link("../c/?utm_source=x#frag", &base).unwrap();
        assert_eq!(url.as_str(), "https://example.com/a/c/");
    }

    #[test]
    fn test_partition_anchors() {
        let html = Html::parse_document(
            r#"<html><body>
                <a href="/dam/models/z/zeph/HMI_Zeph.rfa"> Revit (1.2 MB) </a>
                <a href="/dam/models/z/zeph/HMI_Zeph.rfa">Duplicate</a>
                <a href="/dam/models/z/zeph/photo.jpg">Photo</a>
                <a href="/pm/individual/zeph/">Zeph</a>
                <a href="/pm/individual/zeph/#specs">Zeph specs</a>
                <a href="https://other.org/page">Elsewhere</a>
            </body></html>"#,
        );
        let page = Url::parse("https://example.com/pm/").unwrap();
        let anchors = collect_anchors(&html, &page);
        let (downloads, pages) = partition_anchors(&anchors, &page, &test_site());

        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].anchor_text, "Revit (1.2 MB)");
        assert_eq!(downloads[0].inferred_filename, "HMI_Zeph.rfa");
        assert_eq!(pages, vec!["https://example.com/pm/individual/zeph/".to_string()]);
    }
}
