//! Run statistics
//!
//! Counters collected by the coordinator during a crawl and printed as the
//! end-of-run summary.

use crate::assets::FileType;
use crate::state::FailureKind;
use crate::url::PageClassification;
use std::collections::BTreeMap;

/// Crawl run summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Pages fetched (successfully or not); counts against the page budget
    pub pages_fetched: u64,

    /// Pages processed and recorded as visited
    pub pages_visited: u64,

    /// Pages whose fetch failed
    pub pages_failed: u64,

    /// Successfully fetched pages by classification
    pub pages_by_class: BTreeMap<String, u64>,

    /// Next-page links newly queued
    pub pages_enqueued: u64,

    /// Download candidates found on pages
    pub candidates_found: u64,

    /// Candidates dropped by the type filter
    pub candidates_filtered: u64,

    /// Candidates planned for download (all of them in a dry run)
    pub candidates_planned: u64,

    /// Planned candidates by file type
    pub by_file_type: BTreeMap<String, u64>,

    /// Downloads that wrote new or changed content
    pub files_written: u64,

    /// Downloads that matched the stored content
    pub files_unchanged: u64,

    /// Records produced by archive expansion
    pub archive_members: u64,

    /// Manifests created or rewritten
    pub manifests_updated: u64,

    /// Failures by kind
    pub failures: BTreeMap<FailureKind, u64>,

    pub page_budget_reached: bool,
    pub download_budget_reached: bool,
}

impl CrawlStatistics {
    pub fn record_failure(&mut self, kind: FailureKind) {
        *self.failures.entry(kind).or_insert(0) += 1;
    }

    pub fn record_page(&mut self, classification: PageClassification) {
        *self
            .pages_by_class
            .entry(classification.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn record_planned(&mut self, file_type: FileType) {
        self.candidates_planned += 1;
        *self
            .by_file_type
            .entry(file_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    /// Total failures across all kinds
    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }
}

/// Prints the run summary to stdout
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `dry_run` - Whether the run only planned downloads
pub fn print_statistics(stats: &CrawlStatistics, dry_run: bool) {
    println!("=== Crawl Summary{} ===\n", if dry_run { " (dry run)" } else { "" });

    println!("Pages:");
    println!("  Fetched: {}", stats.pages_fetched);
    println!("  Visited: {}", stats.pages_visited);
    println!("  Failed: {}", stats.pages_failed);
    println!("  Newly queued: {}", stats.pages_enqueued);
    for (class, count) in &stats.pages_by_class {
        println!("  {}: {}", class, count);
    }
    println!();

    println!("Candidates:");
    println!("  Found: {}", stats.candidates_found);
    println!("  Filtered out: {}", stats.candidates_filtered);
    println!("  Planned: {}", stats.candidates_planned);
    println!();

    if !stats.by_file_type.is_empty() {
        println!("By File Type:");
        let mut counts: Vec<_> = stats.by_file_type.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (file_type, count) in counts {
            println!("  {}: {}", file_type, count);
        }
        println!();
    }

    if !dry_run {
        println!("Storage:");
        println!("  Files written: {}", stats.files_written);
        println!("  Files unchanged: {}", stats.files_unchanged);
        println!("  Archive members: {}", stats.archive_members);
        println!("  Manifests updated: {}", stats.manifests_updated);
        println!();
    }

    if !stats.failures.is_empty() {
        println!("Failures ({}):", stats.total_failures());
        for (kind, count) in &stats.failures {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if stats.page_budget_reached {
        println!("Stopped at the page budget.");
    }
    if stats.download_budget_reached {
        println!("Stopped at the download budget.");
    }
}
