//! Configuration module for Asset-Ripper
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Command-line flags are applied on top of the loaded values by the
//! binary, which then re-validates.
//!
//! # Example
//!
//! ```no_run
//! use asset_ripper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ripper.toml")).unwrap();
//! println!("Library root: {}", config.output.root);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrandPrefix, Config, CrawlerConfig, FacetConfig, FilterConfig, OutputConfig, SearchConfig,
    SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_seed_file, parse_config,
};
pub use validation::validate;

use crate::assets::{FileType, TypeFilter};

impl Config {
    /// Builds the allowed-type filter; unknown names are skipped (validation rejects them)
    pub fn type_filter(&self) -> TypeFilter {
        let allowed = self
            .filter
            .types
            .iter()
            .filter_map(|name| name.parse::<FileType>().ok());
        TypeFilter::new(allowed, self.filter.exclude_2d)
    }
}
