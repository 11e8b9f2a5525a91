//! Link extraction
//!
//! Given a fetched page and its classification, produces:
//! - download candidates (asset-store URLs with a supported extension)
//! - next-page candidates (same-site links that are not downloads)
//! - the page-level product context (heading, breadcrumb)
//!
//! Each page type has its own strategy, selected through a small table
//! keyed by [`PageClassification`]. Strategies are pure functions of the
//! page; the structured-search fallback for listings needs the network and
//! is run by the coordinator when [`Extraction::needs_structured_search`]
//! is set.

mod anchors;
mod context;
mod embedded;

pub use context::{
    brand_for_filename, page_context, product_and_variant, product_name_from_url, slugify,
    title_case, PageContext, ProductContext,
};

use crate::assets::{
    extension_of, infer_file_type, is_container_extension, sanitize_filename, FileType,
};
use crate::config::SiteConfig;
use crate::url::PageClassification;
use anchors::{collect_anchors, is_asset_store_url, partition_anchors, push_candidate, Anchor};
use scraper::Html;
use url::Url;

/// A URL found during extraction, not yet fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlCandidate {
    pub url: String,

    /// Link text, kept verbatim (trimmed) for file-type inference
    pub anchor_text: String,

    /// Sanitized last path segment of the URL
    pub inferred_filename: String,
}

impl CrawlCandidate {
    pub fn from_url(url: &Url, anchor_text: &str) -> Self {
        let leaf = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("");

        Self {
            url: url.to_string(),
            anchor_text: anchor_text.to_string(),
            inferred_filename: sanitize_filename(leaf),
        }
    }

    /// Lowercase extension of the inferred file name
    pub fn extension(&self) -> String {
        extension_of(&self.inferred_filename)
    }

    /// File type from anchor text, falling back to the extension
    pub fn file_type(&self) -> FileType {
        infer_file_type(&self.anchor_text, &self.extension())
    }

    pub fn is_container(&self) -> bool {
        is_container_extension(&self.extension())
    }
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub download_candidates: Vec<CrawlCandidate>,
    pub next_page_candidates: Vec<String>,
    pub page_context: PageContext,

    /// Set on filtered listings where neither anchors nor embedded JSON
    /// produced a download
    pub needs_structured_search: bool,
}

impl Extraction {
    /// Product context for one of this page's download candidates
    pub fn product_context(&self, candidate: &CrawlCandidate, site: &SiteConfig) -> ProductContext {
        ProductContext::derive(candidate, &self.page_context, site)
    }
}

/// Parsed page handed to a strategy
pub struct PageInput<'a> {
    pub url: &'a Url,
    pub document: &'a Html,
    pub site: &'a SiteConfig,
    anchors: Vec<Anchor>,
}

/// Extraction strategy for one page type
pub type Strategy = fn(&PageInput<'_>) -> Extraction;

const STRATEGIES: [(PageClassification, Strategy); 4] = [
    (PageClassification::Listing, listing_strategy),
    (PageClassification::Individual, product_strategy),
    (PageClassification::System, system_strategy),
    (PageClassification::Unknown, product_strategy),
];

/// Looks up the strategy for a page type
pub fn strategy_for(classification: PageClassification) -> Strategy {
    STRATEGIES
        .iter()
        .find(|(tag, _)| *tag == classification)
        .map(|(_, strategy)| *strategy)
        .unwrap_or(product_strategy)
}

/// Extracts candidates and context from a page body
///
/// # Arguments
///
/// * `url` - The (normalized) page URL, used to resolve relative links
/// * `classification` - Page type selecting the strategy
/// * `body` - Page HTML
/// * `site` - Site profile (asset path, hosts, brand table)
pub fn extract(
    url: &Url,
    classification: PageClassification,
    body: &str,
    site: &SiteConfig,
) -> Extraction {
    let document = Html::parse_document(body);
    let input = PageInput {
        url,
        document: &document,
        site,
        anchors: collect_anchors(&document, url),
    };

    strategy_for(classification)(&input)
}

/// Listing: anchors, then embedded JSON, then (flagged) structured search
fn listing_strategy(input: &PageInput<'_>) -> Extraction {
    let (mut downloads, next_pages) = partition_anchors(&input.anchors, input.url, input.site);

    if downloads.is_empty() {
        downloads = embedded::embedded_candidates(input.document, input.url, input.site);
    }

    Extraction {
        needs_structured_search: downloads.is_empty() && input.url.query().is_some(),
        download_candidates: downloads,
        next_page_candidates: next_pages,
        page_context: page_context(input.document, input.url, input.site),
    }
}

/// Individual product pages and anything unclassified: plain anchor scan
fn product_strategy(input: &PageInput<'_>) -> Extraction {
    let (downloads, next_pages) = partition_anchors(&input.anchors, input.url, input.site);

    Extraction {
        download_candidates: downloads,
        next_page_candidates: next_pages,
        page_context: page_context(input.document, input.url, input.site),
        needs_structured_search: false,
    }
}

/// System pages: anchor scan plus the "download all components" bundle
///
/// The bundle is an asset-store container link whose text carries every
/// bundle keyword. It is listed first.
fn system_strategy(input: &PageInput<'_>) -> Extraction {
    let (downloads, next_pages) = partition_anchors(&input.anchors, input.url, input.site);

    let mut ordered = Vec::with_capacity(downloads.len() + 1);
    for anchor in input
        .anchors
        .iter()
        .filter(|a| is_bundle_link(a, input.site))
    {
        push_candidate(&mut ordered, CrawlCandidate::from_url(&anchor.url, &anchor.text));
    }
    for candidate in downloads {
        push_candidate(&mut ordered, candidate);
    }

    let next_pages = next_pages
        .into_iter()
        .filter(|page| !ordered.iter().any(|c| &c.url == page))
        .collect();

    Extraction {
        download_candidates: ordered,
        next_page_candidates: next_pages,
        page_context: page_context(input.document, input.url, input.site),
        needs_structured_search: false,
    }
}

fn is_bundle_link(anchor: &Anchor, site: &SiteConfig) -> bool {
    if site.bundle_keywords.is_empty()
        || !is_asset_store_url(&anchor.url, site)
        || !is_container_extension(&extension_of(anchor.url.path()))
    {
        return false;
    }
    let text = anchor.text.to_lowercase();
    site.bundle_keywords
        .iter()
        .all(|keyword| text.contains(&keyword.to_lowercase()))
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

    fn extract_from(url: &str, html: &str) -> Extraction {
        let url = Url::parse(url).unwrap();
        let classification = crate::url::classify_page(url.as_str());
        extract(&url, classification, html, &test_site())
    }

    #[test]
    fn test_strategy_table_covers_every_tag() {
        for tag in [
            PageClassification::Listing,
            PageClassification::Individual,
            PageClassification::System,
            PageClassification::Unknown,
        ] {
            assert!(STRATEGIES.iter().any(|(t, _)| *t == tag));
        }
    }

    #[test]
    fn test_candidate_from_url() {
        let url = Url::parse("https://example.com/dam/models/z/zeph/HMI%20Zeph.RFA").unwrap();
        let candidate = CrawlCandidate::from_url(&url, "Revit");
        assert_eq!(candidate.inferred_filename, "HMI_20Zeph.RFA");
        assert_eq!(candidate.extension(), ".rfa");
        assert_eq!(candidate.file_type(), FileType::Revit);
        assert!(!candidate.is_container());
    }

    #[test]
    fn test_individual_page() {
        let extraction = extract_from(
            "https://example.com/x/product-models/individual/zeph/",
            r#"<html><body>
                <h1>Zeph Stool</h1>
                <a href="/dam/models/z/zeph/HMI_Zeph.skp">SketchUp</a>
                <a href="/dam/models/z/zeph/HMI_Zeph.dwg">AutoCAD 3D</a>
                <a href="/x/product-models/individual/aeron/">Aeron</a>
            </body></html>"#,
        );

        assert_eq!(extraction.download_candidates.len(), 2);
        assert_eq!(
            extraction.next_page_candidates,
            vec!["https://example.com/x/product-models/individual/aeron/".to_string()]
        );
        assert_eq!(
            extraction.page_context.product_name.as_deref(),
            Some("Zeph Stool")
        );
        assert!(!extraction.needs_structured_search);
    }

    #[test]
    fn test_listing_falls_back_to_embedded_json() {
        let extraction = extract_from(
            "https://example.com/x/product-models/?pc=chairs",
            r#"<html><body>
                <script>window.products = [{"downloads": [
                    {"url": "/dam/models/z/zeph/HMI_Zeph.rfa", "name": "Revit"}]}];</script>
            </body></html>"#,
        );

        assert_eq!(extraction.download_candidates.len(), 1);
        assert!(!extraction.needs_structured_search);
    }

    #[test]
    fn test_filtered_listing_without_results_needs_search() {
        let extraction = extract_from(
            "https://example.com/x/product-models/?pc=chairs",
            "<html><body><p>Loading...</p></body></html>",
        );
        assert!(extraction.download_candidates.is_empty());
        assert!(extraction.needs_structured_search);

        let root = extract_from(
            "https://example.com/x/product-models/",
            "<html><body><p>Loading...</p></body></html>",
        );
        assert!(!root.needs_structured_search);
    }

    #[test]
    fn test_system_bundle_link_first() {
        let extraction = extract_from(
            "https://example.com/x/product-models/system/ubi/",
            r#"<html><body>
                <a href="/dam/models/u/ubi/HMI_Ubi_Desk.rfa">Revit</a>
                <a href="/dam/models/u/ubi/Ubi_All.zip">Download All Revit Family Components</a>
            </body></html>"#,
        );

        let urls: Vec<&str> = extraction
            .download_candidates
            .iter()
            .map(|c| c.url.as_str())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/dam/models/u/ubi/Ubi_All.zip",
                "https://example.com/dam/models/u/ubi/HMI_Ubi_Desk.rfa",
            ]
        );
        assert!(extraction.next_page_candidates.is_empty());
    }

    #[test]
    fn test_system_bundle_outside_asset_store_is_ignored() {
        let extraction = extract_from(
            "https://example.com/x/product-models/system/ubi/",
            r#"<html><body>
                <a href="https://cdn.other.net/Ubi_All.zip">Download All Revit Family Components</a>
                <a href="/bundles/Ubi_All.zip">Download All Revit Family Components</a>
                <a href="/dam/models/u/ubi/HMI_Ubi_Desk.rfa">Revit</a>
            </body></html>"#,
        );

        let urls: Vec<&str> = extraction
            .download_candidates
            .iter()
            .map(|c| c.url.as_str())
            .collect();
        assert_eq!(urls, vec!["https://example.com/dam/models/u/ubi/HMI_Ubi_Desk.rfa"]);
        // Archives are files, never pages
        assert!(extraction.next_page_candidates.is_empty());
    }
}
