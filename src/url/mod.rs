//! URL handling module for Asset-Ripper
//!
//! This module provides URL normalization, host matching and page
//! classification.

mod classify;
mod matcher;
mod normalize;

// Re-export main functions
pub use classify::{classify_page, PageClassification, PageClassifier};
pub use matcher::{is_same_site, matches_wildcard};
pub use normalize::normalize_url;
