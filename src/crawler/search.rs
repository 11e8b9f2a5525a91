//! Structured search client
//!
//! Filtered catalogue listings are populated by a backing search endpoint.
//! When a listing page carries no downloads of its own, the coordinator asks
//! this client for the same result set. The client speaks the endpoint's
//! protocol (a multipart POST with a JSON `facets` field and a `totalCount`)
//! and knows nothing about HTML extraction.

use super::extractor::CrawlCandidate;
use super::fetcher::Fetcher;
use crate::assets::{extension_of, format_size, is_supported_extension};
use crate::config::{SearchConfig, SiteConfig};
use crate::url::normalize_url;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Listing query parameter that maps onto the `category` facet
const CATEGORY_PARAM: &str = "pc";

/// Errors from the structured search endpoint
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Search endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Failed to encode or decode search payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid search endpoint: {0}")]
    Endpoint(String),
}

/// One facet of a structured query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFacet {
    #[serde(rename = "queryFieldId")]
    pub query_field_id: String,
    pub values: Vec<String>,
}

impl SearchFacet {
    pub fn new(field: &str, values: Vec<String>) -> Self {
        Self {
            query_field_id: field.to_string(),
            values,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
    #[serde(rename = "totalCount", default)]
    total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    downloads: Vec<SearchDownload>,
}

#[derive(Debug, Deserialize)]
struct SearchDownload {
    url: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: u64,
}

/// Client for the catalogue's structured search endpoint
#[derive(Debug, Clone)]
pub struct SearchClient {
    fetcher: Fetcher,
    endpoint: Url,
    total_count: u32,
    static_facets: Vec<SearchFacet>,
    site: SiteConfig,
}

impl SearchClient {
    /// Builds a client from the site profile
    ///
    /// Returns `Ok(None)` when no endpoint is configured.
    pub fn from_site(fetcher: Fetcher, site: &SiteConfig) -> Result<Option<Self>, SearchError> {
        let config: &SearchConfig = &site.search;
        if config.endpoint.trim().is_empty() {
            return Ok(None);
        }

        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| SearchError::Endpoint(format!("{}: {}", config.endpoint, e)))?;

        Ok(Some(Self {
            fetcher,
            endpoint,
            total_count: config.total_count,
            static_facets: config
                .facets
                .iter()
                .map(|f| SearchFacet::new(&f.field, f.values.clone()))
                .collect(),
            site: site.clone(),
        }))
    }

    /// Facets for a filtered listing: its category filters plus the static
    /// facets from configuration
    pub fn facets_for_listing(&self, listing: &Url) -> Vec<SearchFacet> {
        let categories: Vec<String> = listing
            .query_pairs()
            .filter(|(key, _)| key == CATEGORY_PARAM)
            .map(|(_, value)| value.into_owned())
            .collect();

        let mut facets = Vec::with_capacity(self.static_facets.len() + 1);
        if !categories.is_empty() {
            facets.push(SearchFacet::new("category", categories));
        }
        facets.extend(self.static_facets.iter().cloned());
        facets
    }

    /// Runs a structured query and returns the download candidates it lists
    ///
    /// Downloads outside the asset store or with unsupported extensions are
    /// dropped, like anchors on a page. Anchor text is `"{name}({size})"`.
    pub async fn search(&self, facets: &[SearchFacet]) -> Result<Vec<CrawlCandidate>, SearchError> {
        let form = Form::new()
            .text("facets", serde_json::to_string(facets)?)
            .text("totalCount", self.total_count.to_string());

        self.fetcher.pause().await;
        debug!("Structured search with {} facets", facets.len());

        let response = self
            .fetcher
            .client()
            .post(self.endpoint.clone())
            .header("Accept", "*/*")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&bytes)?;

        let mut candidates: Vec<CrawlCandidate> = Vec::new();
        for download in parsed.results.iter().flat_map(|r| r.downloads.iter()) {
            let Some(url) = self
                .endpoint
                .join(&download.url)
                .ok()
                .and_then(|u| normalize_url(u.as_str()).ok())
            else {
                continue;
            };

            if !url.path().contains(&self.site.asset_path)
                || !is_supported_extension(&extension_of(url.path()))
            {
                continue;
            }

            let text = format!("{}({})", download.name, format_size(download.size));
            let candidate = CrawlCandidate::from_url(&url, &text);
            if !candidates.iter().any(|c| c.url == candidate.url) {
                candidates.push(candidate);
            }
        }

        info!(
            "Structured search returned {} results (total {}), {} downloads",
            parsed.results.len(),
            parsed
                .total_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            candidates.len()
        );

        Ok(candidates)
    }
}
