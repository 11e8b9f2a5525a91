//! Crawler module for catalogue traversal
//!
//! This module contains the crawling logic, including:
//! - HTTP fetching with politeness delay, retry and backoff
//! - Per-page-type link extraction and the structured search fallback
//! - The persisted crawl frontier
//! - Overall crawl coordination

mod coordinator;
pub mod extractor;
mod fetcher;
mod frontier;
mod search;

pub use coordinator::{run_crawl, CrawlOptions, Coordinator};
pub use extractor::{
    extract, slugify, strategy_for, title_case, CrawlCandidate, Extraction, PageContext,
    ProductContext, Strategy,
};
pub use fetcher::{backoff_delay, is_retryable_status, FetchResponse, Fetcher, FetcherConfig};
pub use frontier::{FrontierState, QUEUE_FILE, SEEN_LOG_FILE};
pub use search::{SearchClient, SearchError, SearchFacet};

use crate::config::Config;
use crate::output::CrawlStatistics;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Prepare the output root and load the frontier
/// 2. Build the fetcher from the configuration
/// 3. Visit pages breadth-first within the page budget
/// 4. Download (or plan) candidates within the download budget
/// 5. Merge stored files into product manifests
///
/// # Arguments
///
/// * `config` - The crawl configuration
/// * `options` - Dry-run, single-page and fresh-start switches
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Crawl completed
/// * `Err(HarvestError)` - Setup failed
pub async fn crawl(config: Config, options: CrawlOptions) -> Result<CrawlStatistics, HarvestError> {
    run_crawl(config, options).await
}
