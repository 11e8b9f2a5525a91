//! State module for tracking crawl outcomes
//!
//! # Components
//!
//! - `FailureKind`: Tags each recovered failure so the run summary can count
//!   failures by kind

mod failure;

// Re-export main types
pub use failure::FailureKind;
