//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the components together:
//! - Popping pages from the frontier within the page budget
//! - Fetching, classifying and extracting each page
//! - Filtering candidates and planning or downloading them within the
//!   download budget
//! - Merging stored records into the product manifests
//! - Recording visited pages so a later run resumes instead of repeating
//!
//! Page and candidate failures are logged and counted; they never end the
//! run.

use super::extractor::{extract, CrawlCandidate, Extraction, ProductContext};
use super::fetcher::{Fetcher, FetcherConfig};
use super::frontier::FrontierState;
use super::search::SearchClient;
use crate::assets::TypeFilter;
use crate::config::Config;
use crate::output::{plan_line, CrawlStatistics};
use crate::state::FailureKind;
use crate::storage::{merge, Downloader, FileRecord, WriteStatus};
use crate::url::{normalize_url, PageClassifier};
use crate::{ConfigError, HarvestError};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Run-level switches that are not part of the configuration file
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Plan only: print a line per candidate, write nothing
    pub dry_run: bool,

    /// Process exactly this page and ignore its next-page links
    pub single_page: Option<String>,

    /// Discard the persisted seen-log and queue before starting
    pub fresh: bool,
}

/// How processing a page ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageOutcome {
    /// Processed; recorded as visited
    Done,
    /// Fetch failed; left unvisited so a later run retries it
    Failed,
    /// The download budget ran out part way through the page
    BudgetExhausted,
}

/// Records stored for one product on the current page
struct ProductBatch {
    context: ProductContext,
    records: Vec<FileRecord>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    options: CrawlOptions,
    fetcher: Fetcher,
    downloader: Downloader,
    search: Option<SearchClient>,
    classifier: PageClassifier,
    filter: TypeFilter,
    frontier: FrontierState,
    root: PathBuf,
    /// Downloads counted against the budget: new or changed content, or
    /// planned candidates in a dry run
    budgeted_downloads: u32,
    stats: CrawlStatistics,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawl configuration
    /// * `options` - Dry-run, single-page and fresh-start switches
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The output root, the HTTP client or the
    ///   persisted frontier could not be set up
    pub fn new(config: Config, options: CrawlOptions) -> Result<Self, HarvestError> {
        let root = PathBuf::from(&config.output.root);

        if !options.dry_run {
            std::fs::create_dir_all(&root).map_err(|source| HarvestError::OutputRoot {
                path: config.output.root.clone(),
                source,
            })?;
        }

        let fetcher = Fetcher::new(FetcherConfig::from_config(&config))?;
        let downloader = Downloader::new(fetcher.clone(), &root);
        let search = SearchClient::from_site(fetcher.clone(), &config.site)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        let frontier = match &options.single_page {
            Some(page) => {
                let page = normalize_url(page)?;
                info!("Single-page mode: {}", page);
                FrontierState::in_memory(&[page.to_string()])
            }
            None => {
                let seeds = normalized_seeds(&config.site.seeds);
                FrontierState::load(&root, &seeds, options.fresh, !options.dry_run)?
            }
        };

        Ok(Self {
            classifier: PageClassifier::from_site(&config.site),
            filter: config.type_filter(),
            config,
            options,
            fetcher,
            downloader,
            search,
            frontier,
            root,
            budgeted_downloads: 0,
            stats: CrawlStatistics::default(),
        })
    }

    /// Runs the crawl loop until the queue empties or a budget is reached
    ///
    /// Returns the run statistics; only setup problems are errors.
    pub async fn run(&mut self) -> Result<CrawlStatistics, HarvestError> {
        let start_time = Instant::now();
        let max_pages = u64::from(self.config.crawler.max_pages);
        info!(
            "Starting crawl: {} queued, page budget {}, download budget {}{}",
            self.frontier.queue_len(),
            max_pages,
            match self.config.crawler.max_downloads {
                0 => "unlimited".to_string(),
                n => n.to_string(),
            },
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        loop {
            if self.stats.pages_fetched >= max_pages {
                info!("Page budget of {} reached", max_pages);
                self.stats.page_budget_reached = true;
                break;
            }

            let Some(url) = self.frontier.pop() else {
                info!("Frontier is empty, crawl complete");
                break;
            };

            match self.process_page(&url).await {
                PageOutcome::Done => {
                    self.stats.pages_visited += 1;
                    if let Err(e) = self.frontier.mark_visited(&url) {
                        error!("Failed to record {} as visited: {}", url, e);
                        self.stats.record_failure(FailureKind::Storage);
                    }
                }
                PageOutcome::Failed => self.frontier.defer(&url),
                PageOutcome::BudgetExhausted => {
                    self.frontier.requeue_front(&url);
                    self.stats.download_budget_reached = true;
                    info!(
                        "Download budget of {} reached on {}",
                        self.config.crawler.max_downloads, url
                    );
                    break;
                }
            }

            if self.stats.pages_fetched % 10 == 0 {
                info!(
                    "Progress: {} pages fetched, {} queued, {} candidates planned",
                    self.stats.pages_fetched,
                    self.frontier.queue_len(),
                    self.stats.candidates_planned
                );
            }
        }

        if let Err(e) = self.frontier.snapshot() {
            error!("Failed to save the pending queue: {}", e);
            self.stats.record_failure(FailureKind::Storage);
        }

        info!(
            "Crawl finished: {} pages visited, {} failed in {:?}",
            self.stats.pages_visited,
            self.stats.pages_failed,
            start_time.elapsed()
        );

        Ok(self.stats.clone())
    }

    /// Fetches, extracts and stores one page
    async fn process_page(&mut self, url: &str) -> PageOutcome {
        self.stats.pages_fetched += 1;

        let Ok(page_url) = Url::parse(url) else {
            warn!("Skipping unparseable queued URL {}", url);
            self.stats.record_failure(FailureKind::Extraction);
            return PageOutcome::Done;
        };

        let response = self.fetcher.fetch(url).await;
        if !response.is_success() {
            let kind = FailureKind::from_status(response.status).unwrap_or(FailureKind::TerminalHttp);
            warn!("Fetch failed for {} (status {}, {})", url, response.status, kind);
            self.stats.pages_failed += 1;
            self.stats.record_failure(kind);
            return PageOutcome::Failed;
        }

        let classification = self.classifier.classify(&page_url);
        self.stats.record_page(classification);

        let mut extraction = extract(&page_url, classification, &response.body, &self.config.site);
        if extraction.needs_structured_search {
            self.run_structured_search(&page_url, &mut extraction).await;
        }

        info!(
            "[{}] {}: {} downloads, {} links",
            classification,
            url,
            extraction.download_candidates.len(),
            extraction.next_page_candidates.len()
        );

        if self.options.single_page.is_none() {
            for next in &extraction.next_page_candidates {
                if self.frontier.enqueue(next) {
                    self.stats.pages_enqueued += 1;
                }
            }
        }

        self.stats.candidates_found += extraction.download_candidates.len() as u64;

        let mut batches: Vec<ProductBatch> = Vec::new();
        let mut outcome = PageOutcome::Done;

        for candidate in &extraction.download_candidates {
            let file_type = candidate.file_type();
            if !self.filter.allows(file_type) {
                debug!("Filtered {} ({})", candidate.url, file_type);
                self.stats.candidates_filtered += 1;
                continue;
            }

            if self.download_budget_spent() {
                outcome = PageOutcome::BudgetExhausted;
                break;
            }

            let context = extraction.product_context(candidate, &self.config.site);
            self.stats.record_planned(file_type);

            if self.options.dry_run {
                // A missing destination is certain to be written; an existing
                // one is assumed unchanged
                if !self.downloader.destination(candidate, &context).exists() {
                    self.budgeted_downloads += 1;
                }
                println!("{}", plan_line(&context, candidate));
                continue;
            }

            if let Some(records) = self.store_candidate(candidate, &context).await {
                match batches.iter_mut().find(|b| {
                    b.context.brand == context.brand && b.context.product_slug == context.product_slug
                }) {
                    Some(batch) => batch.records.extend(records),
                    None => batches.push(ProductBatch { context, records }),
                }
            }
        }

        for batch in &batches {
            self.record_batch(batch, url);
        }

        outcome
    }

    /// Fills an empty filtered listing from the structured search endpoint
    async fn run_structured_search(&mut self, page_url: &Url, extraction: &mut Extraction) {
        let Some(search) = &self.search else {
            debug!("No search endpoint configured for {}", page_url);
            return;
        };

        let facets = search.facets_for_listing(page_url);
        match search.search(&facets).await {
            Ok(candidates) => extraction.download_candidates = candidates,
            Err(e) => {
                warn!("Structured search failed for {}: {}", page_url, e);
                self.stats.record_failure(FailureKind::Extraction);
            }
        }
    }

    /// Downloads one candidate; failures are logged and counted
    async fn store_candidate(
        &mut self,
        candidate: &CrawlCandidate,
        context: &ProductContext,
    ) -> Option<Vec<FileRecord>> {
        match self.downloader.fetch_and_store(candidate, context).await {
            Ok(outcome) => {
                match outcome.status {
                    WriteStatus::Written => {
                        self.stats.files_written += 1;
                        self.budgeted_downloads += 1;
                    }
                    WriteStatus::Unchanged => self.stats.files_unchanged += 1,
                }
                self.stats.archive_members += outcome.members.len() as u64;
                if outcome.archive_error.is_some() {
                    self.stats.record_failure(FailureKind::Archive);
                }
                Some(outcome.records())
            }
            Err(e) => {
                warn!("Download failed for {}: {}", candidate.url, e);
                self.stats.record_failure(e.failure_kind());
                None
            }
        }
    }

    /// Merges a product's records from this page into its manifest
    fn record_batch(&mut self, batch: &ProductBatch, source_page: &str) {
        if batch.records.is_empty() {
            return;
        }

        match merge(&self.root, &batch.context, &batch.records, source_page) {
            Ok(outcome) => {
                if outcome.changed {
                    self.stats.manifests_updated += 1;
                }
                if outcome.recovered_corrupt {
                    self.stats.record_failure(FailureKind::Manifest);
                }
            }
            Err(e) => {
                warn!(
                    "Manifest merge failed for {}/{}: {}",
                    batch.context.brand, batch.context.product_slug, e
                );
                self.stats.record_failure(FailureKind::Manifest);
            }
        }
    }

    fn download_budget_spent(&self) -> bool {
        let max = self.config.crawler.max_downloads;
        max > 0 && self.budgeted_downloads >= max
    }

    /// Statistics collected so far
    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }
}

/// Normalizes seed URLs, dropping (and logging) any that do not parse
fn normalized_seeds(seeds: &[String]) -> Vec<String> {
    seeds
        .iter()
        .filter_map(|seed| match normalize_url(seed) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                warn!("Ignoring seed {}: {}", seed, e);
                None
            }
        })
        .collect()
}

/// Runs a complete crawl
///
/// # Arguments
///
/// * `config` - The validated crawl configuration
/// * `options` - Run switches
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - The run finished (possibly at a budget)
/// * `Err(HarvestError)` - Setup failed
///
/// # Example
///
/// ```no_run
/// use asset_ripper::config::Config;
/// use asset_ripper::crawler::{run_crawl, CrawlOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stats = run_crawl(Config::default(), CrawlOptions::default()).await?;
/// println!("{} pages visited", stats.pages_visited);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    options: CrawlOptions,
) -> Result<CrawlStatistics, HarvestError> {
    let mut coordinator = Coordinator::new(config, options)?;
    coordinator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, OutputConfig, SiteConfig};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(server: &MockServer, root: &std::path::Path) -> Config {
        Config {
            crawler: CrawlerConfig {
                max_pages: 20,
                max_downloads: 0,
                min_delay_ms: 0,
                max_delay_ms: 0,
                max_retries: 0,
                backoff_base_ms: 1,
                request_timeout_secs: 5,
            },
            output: OutputConfig {
                root: root.display().to_string(),
            },
            site: SiteConfig {
                seeds: vec![format!("{}/pm/", server.uri())],
                hosts: vec![],
                catalogue_segment: "/pm/".to_string(),
                individual_segment: "/pm/individual/".to_string(),
                system_segment: "/pm/system/".to_string(),
                asset_path: "/dam/models/".to_string(),
                ..SiteConfig::default()
            },
            ..Config::default()
        }
    }

    async fn mount_html(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_failed_page_is_not_visited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pm/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = create_test_config(&server, dir.path());
        let stats = run_crawl(config, CrawlOptions::default()).await.unwrap();

        assert_eq!(stats.pages_fetched, 1);
        assert_eq!(stats.pages_failed, 1);
        assert_eq!(stats.failures[&FailureKind::TerminalHttp], 1);
        assert_eq!(stats.pages_visited, 0);
        assert!(!dir.path().join(crate::crawler::SEEN_LOG_FILE).exists());
        // Kept pending for the next run
        assert_eq!(
            std::fs::read_to_string(dir.path().join(crate::crawler::QUEUE_FILE)).unwrap(),
            format!("{}/pm/\n", server.uri())
        );
    }

    #[tokio::test]
    async fn test_page_budget() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/pm/",
            r#"<a href="/pm/individual/a/">A</a><a href="/pm/individual/b/">B</a>"#,
        )
        .await;
        mount_html(&server, "/pm/individual/a/", "<h1>A</h1>").await;
        mount_html(&server, "/pm/individual/b/", "<h1>B</h1>").await;

        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&server, dir.path());
        config.crawler.max_pages = 2;

        let stats = run_crawl(config, CrawlOptions::default()).await.unwrap();
        assert_eq!(stats.pages_visited, 2);
        assert!(stats.page_budget_reached);
        assert_eq!(stats.pages_by_class["listing"], 1);
        assert_eq!(stats.pages_by_class["individual"], 1);
    }

    #[tokio::test]
    async fn test_type_filter_applies_to_dry_run() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/pm/individual/zeph/",
            r#"<h1>Zeph</h1>
               <a href="/dam/models/z/zeph/zeph_chair/HMI_Zeph.rfa">Revit</a>
               <a href="/dam/models/z/zeph/zeph_chair/HMI_Zeph_2d.dwg">AutoCAD 2D</a>"#,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let root = dir.path().join("lib");
        let config = create_test_config(&server, &root);
        let options = CrawlOptions {
            dry_run: true,
            single_page: Some(format!("{}/pm/individual/zeph/", server.uri())),
            fresh: false,
        };

        let stats = run_crawl(config, options).await.unwrap();
        assert_eq!(stats.candidates_found, 2);
        assert_eq!(stats.candidates_filtered, 1);
        assert_eq!(stats.candidates_planned, 1);
        assert_eq!(stats.by_file_type["revit"], 1);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_dry_run_budget_skips_files_already_stored() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/pm/individual/zeph/",
            r#"<h1>Zeph</h1>
               <a href="/dam/models/z/zeph/HMI_A.rfa">Revit</a>
               <a href="/dam/models/z/zeph/HMI_B.rfa">Revit</a>
               <a href="/dam/models/z/zeph/HMI_C.rfa">Revit</a>"#,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let stored = root.join("herman_miller/zeph/revit");
        std::fs::create_dir_all(&stored).unwrap();
        std::fs::write(stored.join("HMI_A.rfa"), b"already here").unwrap();

        let mut config = create_test_config(&server, root);
        config.crawler.max_downloads = 1;
        let options = CrawlOptions {
            dry_run: true,
            single_page: Some(format!("{}/pm/individual/zeph/", server.uri())),
            fresh: false,
        };

        // A is on disk, so only B spends the budget and C is cut off
        let stats = run_crawl(config, options).await.unwrap();
        assert_eq!(stats.candidates_planned, 2);
        assert!(stats.download_budget_reached);
    }

    #[test]
    fn test_normalized_seeds_drops_invalid() {
        let seeds = vec![
            "https://example.com/pm/?utm_source=x".to_string(),
            "ftp://example.com/".to_string(),
        ];
        assert_eq!(normalized_seeds(&seeds), vec!["https://example.com/pm/".to_string()]);
    }
}
