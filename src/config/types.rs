use serde::Deserialize;

/// Main configuration structure for Asset-Ripper
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub filter: FilterConfig,
    pub site: SiteConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of pages visited per run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Maximum number of downloads per run (0 = unlimited)
    #[serde(rename = "max-downloads")]
    pub max_downloads: u32,

    /// Lower bound of the randomized politeness delay (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized politeness delay (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Additional attempts after a transient failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff (milliseconds); attempt n waits base * 2^n plus jitter
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 400,
            max_downloads: 0,
            min_delay_ms: 500,
            max_delay_ms: 800,
            max_retries: 2,
            backoff_base_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "OKII-3D-Ripper".to_string(),
            crawler_version: "0.1".to_string(),
            contact_email: "you@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (contact: email)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (contact: {})",
            self.crawler_name, self.crawler_version, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root of the asset library
    pub root: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: "./library".to_string(),
        }
    }
}

/// Which file types are downloaded
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Allowed file-type tags (see `assets::FileType`)
    pub types: Vec<String>,

    /// Drop AutoCAD 2D drawings even if `autocad_2d` is allowed
    #[serde(rename = "exclude-2d")]
    pub exclude_2d: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            types: vec![
                "revit".to_string(),
                "sketchup".to_string(),
                "autocad_3d".to_string(),
            ],
            exclude_2d: false,
        }
    }
}

/// Filename prefix that identifies a brand
#[derive(Debug, Clone, Deserialize)]
pub struct BrandPrefix {
    pub prefix: String,
    pub brand: String,
}

/// Site profile: where the catalogue lives and how its URLs are shaped
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// URLs the crawl starts from
    pub seeds: Vec<String>,

    /// Host patterns considered part of the site (e.g. "*.example.com");
    /// empty means "same host as the page being processed"
    pub hosts: Vec<String>,

    /// Path segment of the catalogue root
    #[serde(rename = "catalogue-segment")]
    pub catalogue_segment: String,

    /// Path segment of individual product pages
    #[serde(rename = "individual-segment")]
    pub individual_segment: String,

    /// Path segment of system product pages
    #[serde(rename = "system-segment")]
    pub system_segment: String,

    /// Path prefix of the asset store
    #[serde(rename = "asset-path")]
    pub asset_path: String,

    /// Brand used when no filename prefix matches
    #[serde(rename = "default-brand")]
    pub default_brand: String,

    /// Filename prefix to brand mapping
    #[serde(rename = "brand-prefix")]
    pub brand_prefixes: Vec<BrandPrefix>,

    /// Words that mark a system page's "download all components" archive link
    #[serde(rename = "bundle-keywords")]
    pub bundle_keywords: Vec<String>,

    /// Structured search backing the listing pages
    pub search: SearchConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            seeds: vec![
                "https://www.hermanmiller.com/resources/3d-models-and-planning-tools/product-models/"
                    .to_string(),
            ],
            hosts: vec![
                "www.hermanmiller.com".to_string(),
                "hermanmiller.com".to_string(),
            ],
            catalogue_segment: "/product-models/".to_string(),
            individual_segment: "/product-models/individual/".to_string(),
            system_segment: "/product-models/system/".to_string(),
            asset_path: "/content/dam/hmicom/app_assets/product_models/".to_string(),
            default_brand: "herman_miller".to_string(),
            brand_prefixes: vec![
                BrandPrefix {
                    prefix: "HMI_".to_string(),
                    brand: "herman_miller".to_string(),
                },
                BrandPrefix {
                    prefix: "GGR_".to_string(),
                    brand: "geiger".to_string(),
                },
                BrandPrefix {
                    prefix: "NTO_".to_string(),
                    brand: "naughtone".to_string(),
                },
            ],
            bundle_keywords: vec!["revit".to_string(), "family".to_string()],
            search: SearchConfig::default(),
        }
    }
}

/// One static facet sent with every structured search
#[derive(Debug, Clone, Deserialize)]
pub struct FacetConfig {
    pub field: String,
    pub values: Vec<String>,
}

/// Structured search endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Endpoint URL; empty disables the search fallback
    pub endpoint: String,

    /// Value sent as `totalCount`
    #[serde(rename = "total-count")]
    pub total_count: u32,

    /// Facets sent in addition to the ones derived from the listing query
    pub facets: Vec<FacetConfig>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let facet = |field: &str, values: &[&str]| FacetConfig {
            field: field.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        };
        Self {
            endpoint: "https://www.hermanmiller.com/services/planning-ideas/models/search"
                .to_string(),
            total_count: 1087,
            facets: vec![
                facet(
                    "portfolio",
                    &[
                        "herman-miller-x-hay-collection",
                        "oe1-workspace-collection",
                        "thrive-ergonomic-portfolio",
                    ],
                ),
                facet("brand", &["geiger", "herman-miller", "naughtone"]),
                facet(
                    "file-type",
                    &["autocad-2d", "autocad-3d", "revit", "revit-component", "sketchup"],
                ),
            ],
        }
    }
}
