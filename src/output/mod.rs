//! Output module for run summaries and reports
//!
//! This module handles:
//! - Dry-run plan lines
//! - The end-of-run crawl summary
//! - Library statistics read back from the stored manifests

mod library;
pub mod stats;

pub use library::{print_library_statistics, scan_library, LibraryStatistics};
pub use stats::{print_statistics, CrawlStatistics};

use crate::crawler::{CrawlCandidate, ProductContext};

/// Formats the dry-run line for a planned download
///
/// `[PLAN] {brand}/{slug}/{variant or -} :: {anchor text} :: {filename}`
pub fn plan_line(context: &ProductContext, candidate: &CrawlCandidate) -> String {
    format!(
        "[PLAN] {}/{}/{} :: {} :: {}",
        context.brand,
        context.product_slug,
        context.variant.as_deref().unwrap_or("-"),
        candidate.anchor_text,
        candidate.inferred_filename
    )
}
