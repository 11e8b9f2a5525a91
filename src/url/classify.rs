//! Page classification
//!
//! Maps a URL to the page-type tag that selects an extraction strategy.
//! Classification only looks at the URL path, so it is pure and can be
//! tested with URL fixtures alone.

use crate::config::SiteConfig;
use std::fmt;
use url::Url;

/// Page-type tag used to pick an extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageClassification {
    /// Catalogue listing (root or filtered result pages)
    Listing,
    /// Individual product page
    Individual,
    /// System product page (configurable furniture systems)
    System,
    /// Anything else on the site
    Unknown,
}

impl PageClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Individual => "individual",
            Self::System => "system",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PageClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Path-segment based classifier for one site
#[derive(Debug, Clone)]
pub struct PageClassifier {
    catalogue_segment: String,
    individual_segment: String,
    system_segment: String,
}

impl PageClassifier {
    pub fn new(
        catalogue_segment: &str,
        individual_segment: &str,
        system_segment: &str,
    ) -> Self {
        Self {
            catalogue_segment: catalogue_segment.to_lowercase(),
            individual_segment: individual_segment.to_lowercase(),
            system_segment: system_segment.to_lowercase(),
        }
    }

    pub fn from_site(site: &SiteConfig) -> Self {
        Self::new(
            &site.catalogue_segment,
            &site.individual_segment,
            &site.system_segment,
        )
    }

    /// Classifies a URL by its (lowercased) path
    pub fn classify(&self, url: &Url) -> PageClassification {
        let path = url.path().to_lowercase();

        if path.contains(&self.individual_segment) {
            PageClassification::Individual
        } else if path.contains(&self.system_segment) {
            PageClassification::System
        } else if path.contains(&self.catalogue_segment) {
            PageClassification::Listing
        } else {
            PageClassification::Unknown
        }
    }
}

impl Default for PageClassifier {
    fn default() -> Self {
        Self::from_site(&SiteConfig::default())
    }
}

/// Classifies a URL string with the default site profile
///
/// Unparseable input is `Unknown`.
///
/// # Examples
///
/// ```
/// use asset_ripper::url::{classify_page, PageClassification};
///
/// assert_eq!(
///     classify_page("https://site/x/product-models/individual/zeph-stool/"),
///     PageClassification::Individual
/// );
/// assert_eq!(classify_page("https://site/about-us/"), PageClassification::Unknown);
/// ```
pub fn classify_page(url: &str) -> PageClassification {
    match Url::parse(url) {
        Ok(parsed) => PageClassifier::default().classify(&parsed),
        Err(_) => PageClassification::Unknown,
    }
}
