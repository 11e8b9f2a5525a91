//! Asset-Ripper main entry point
//!
//! This is the command-line interface for the Asset-Ripper catalogue crawler.

use anyhow::{Context, Result};
use asset_ripper::config::{load_config_with_hash, load_seed_file, validate, Config};
use asset_ripper::crawler::{crawl, CrawlOptions};
use asset_ripper::output::{print_library_statistics, print_statistics, scan_library};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Asset-Ripper: a polite catalogue crawler and archiver
///
/// Asset-Ripper walks a vendor's 3D/CAD download catalogue, stores every
/// model file in a brand/product/type directory tree without re-writing
/// unchanged content, unpacks zip bundles and keeps a product.json manifest
/// per product.
#[derive(Parser, Debug)]
#[command(name = "asset-ripper")]
#[command(version)]
#[command(about = "A polite catalogue crawler and archiver", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (every setting has a default)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed URL (repeatable); replaces the configured seeds
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// File with one seed URL per line
    #[arg(long, value_name = "FILE")]
    seeds_file: Option<PathBuf>,

    /// Library root
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Maximum pages fetched this run
    #[arg(long)]
    max_pages: Option<u32>,

    /// Maximum downloads this run (0 = unlimited)
    #[arg(long)]
    max_downloads: Option<u32>,

    /// Lower bound of the politeness delay, in seconds
    #[arg(long, value_name = "SECS")]
    min_delay: Option<f64>,

    /// Upper bound of the politeness delay, in seconds
    #[arg(long, value_name = "SECS")]
    max_delay: Option<f64>,

    /// Print a plan line per candidate instead of downloading; writes nothing
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Process exactly one page and ignore its next-page links
    #[arg(long, value_name = "URL", conflicts_with = "stats")]
    single_page: Option<String>,

    /// Allowed file types, comma separated (e.g. revit,sketchup,autocad_3d)
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,

    /// Skip AutoCAD 2D drawings
    #[arg(long)]
    exclude_2d: bool,

    /// Forget the seen-log and pending queue before crawling
    #[arg(long)]
    fresh: bool,

    /// Show statistics for the stored library and exit
    #[arg(long)]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.stats {
        return handle_stats(Path::new(&config.output.root));
    }

    handle_crawl(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("asset_ripper=info,warn"),
            1 => EnvFilter::new("asset_ripper=debug,info"),
            2 => EnvFilter::new("asset_ripper=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file (if any), applies flags and validates
fn build_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let mut seeds = cli.seeds.clone();
    if let Some(path) = &cli.seeds_file {
        let from_file = load_seed_file(path)
            .with_context(|| format!("failed to read seed list {}", path.display()))?;
        seeds.extend(from_file);
    }
    if !seeds.is_empty() {
        config.site.seeds = seeds;
    }

    if let Some(out) = &cli.out {
        config.output.root = out.display().to_string();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(max_downloads) = cli.max_downloads {
        config.crawler.max_downloads = max_downloads;
    }
    if let Some(secs) = cli.min_delay {
        config.crawler.min_delay_ms = seconds_to_ms(secs);
    }
    if let Some(secs) = cli.max_delay {
        config.crawler.max_delay_ms = seconds_to_ms(secs);
    }
    if !cli.types.is_empty() {
        config.filter.types = cli
            .types
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
    if cli.exclude_2d {
        config.filter.exclude_2d = true;
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

fn seconds_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

/// Handles the --stats mode: summarizes the stored library
fn handle_stats(root: &Path) -> Result<()> {
    let stats = scan_library(root)
        .with_context(|| format!("cannot read library root {}", root.display()))?;
    print_library_statistics(root, &stats);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, cli: &Cli) -> Result<()> {
    let options = CrawlOptions {
        dry_run: cli.dry_run,
        single_page: cli.single_page.clone(),
        fresh: cli.fresh,
    };

    if options.fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    }
    tracing::info!(
        "Library root: {}, seeds: {}, types: {}",
        config.output.root,
        config.site.seeds.len(),
        config.filter.types.join(",")
    );

    let stats = crawl(config, options.clone())
        .await
        .context("crawl setup failed")?;

    print_statistics(&stats, options.dry_run);
    Ok(())
}
