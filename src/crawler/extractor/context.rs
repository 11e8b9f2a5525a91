//! Product context inference
//!
//! The asset store's path convention is the primary source of truth:
//!
//! ```text
//! {asset-path}/{bucket}/{product_dir}/{variant_dir?}/{filename}
//! ```
//!
//! Page copy (heading, breadcrumb, URL) is only a fallback for links that
//! do not follow the convention. Brand always comes from the filename
//! prefix table, falling back to the site's default brand.

use super::CrawlCandidate;
use crate::assets::sanitize_filename;
use crate::config::SiteConfig;
use scraper::{Html, Selector};
use url::Url;

/// Product a stored file belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductContext {
    pub brand: String,
    pub product_name: String,
    pub product_slug: String,
    pub variant: Option<String>,
    pub category: Option<String>,
}

/// Page-level facts shared by every candidate on a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    /// Heading text, or a name derived from the page URL
    pub product_name: Option<String>,

    /// Breadcrumb text
    pub category: Option<String>,
}

impl ProductContext {
    /// Derives the context for one download candidate
    ///
    /// Deterministic: identical inputs always give an identical context.
    pub fn derive(candidate: &CrawlCandidate, page: &PageContext, site: &SiteConfig) -> Self {
        let brand = brand_for_filename(&candidate.inferred_filename, site);
        let category = page.category.clone();

        let from_path = Url::parse(&candidate.url)
            .ok()
            .and_then(|url| product_and_variant(&url, &site.asset_path));

        match from_path {
            Some((product_slug, variant)) => Self {
                brand,
                product_name: title_case(&product_slug),
                product_slug,
                variant,
                category,
            },
            None => {
                let product_name = page
                    .product_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string());
                Self {
                    brand,
                    product_slug: slugify(&product_name),
                    product_name,
                    variant: None,
                    category,
                }
            }
        }
    }
}

/// Maps a filename to a brand through the prefix table
pub fn brand_for_filename(filename: &str, site: &SiteConfig) -> String {
    site.brand_prefixes
        .iter()
        .find(|p| filename.starts_with(&p.prefix))
        .map(|p| p.brand.clone())
        .unwrap_or_else(|| site.default_brand.clone())
}

/// Reads `(product_slug, variant)` from an asset-store URL
///
/// Returns `None` when the URL is not under `asset_path` or has no product
/// directory. A variant needs a directory between the product directory and
/// the file name.
pub fn product_and_variant(url: &Url, asset_path: &str) -> Option<(String, Option<String>)> {
    let path = url.path();
    let idx = path.find(asset_path)?;
    let segments: Vec<&str> = path[idx + asset_path.len()..]
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    // bucket, product, file
    if segments.len() < 3 {
        return None;
    }

    let product_slug = sanitize_filename(&segments[1].replace('_', "-"));
    let variant = if segments.len() >= 4 {
        Some(sanitize_filename(segments[2]))
    } else {
        None
    };

    Some((product_slug, variant))
}

/// Lowercase slug: non-word characters dropped, whitespace/hyphen runs
/// collapsed to one hyphen
///
/// ```
/// use asset_ripper::crawler::slugify;
///
/// assert_eq!(slugify("Zeph Stool (Bar Height)"), "zeph-stool-bar-height");
/// assert_eq!(slugify("  "), "unknown");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.to_lowercase().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

/// Title-cases a slug: `zeph-stool_bar` becomes `Zeph Stool Bar`
pub fn title_case(slug: &str) -> String {
    slug.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const NAME_SELECTORS: &[&str] = &[
    "h1",
    ".product-name",
    ".product-title",
    "[data-product-name]",
    ".page-title",
];

const CATEGORY_SELECTORS: &[&str] = &[
    ".breadcrumb",
    ".breadcrumbs",
    "nav[aria-label*='breadcrumb']",
    "[class*='breadcrumb']",
    ".category",
];

/// Collects the page-level context from the DOM, falling back to the URL
/// for the product name
pub fn page_context(document: &Html, page_url: &Url, site: &SiteConfig) -> PageContext {
    PageContext {
        product_name: first_text(document, NAME_SELECTORS)
            .or_else(|| product_name_from_url(page_url, site)),
        category: first_text(document, CATEGORY_SELECTORS),
    }
}

/// Last meaningful path segment, title-cased
pub fn product_name_from_url(url: &Url, site: &SiteConfig) -> Option<String> {
    let structural: Vec<String> = [
        &site.catalogue_segment,
        &site.individual_segment,
        &site.system_segment,
    ]
    .iter()
    .flat_map(|s| s.split('/'))
    .filter(|s| !s.is_empty())
    .map(str::to_lowercase)
    .collect();

    url.path_segments()?
        .rev()
        .find(|s| !s.is_empty() && !structural.contains(&s.to_lowercase()))
        .map(title_case)
        .filter(|s| !s.is_empty())
}

/// Text of the first element matching any selector, whitespace collapsed
fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        document.select(&selector).find_map(|element| {
            let text = element
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        })
    })
}
