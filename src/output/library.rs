//! Library statistics (`--stats`)
//!
//! Scans every `{root}/{brand}/{product_slug}/product.json` and reports what
//! the library holds, including manifest entries whose file is gone.

use crate::storage::{load_manifest, MANIFEST_FILE};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Aggregate view of the stored library
#[derive(Debug, Clone, Default)]
pub struct LibraryStatistics {
    pub products: u64,
    pub files: u64,
    pub total_bytes: u64,
    pub by_file_type: BTreeMap<String, u64>,

    /// File records per brand
    pub by_brand: BTreeMap<String, u64>,

    /// Manifest entries whose stored file is missing on disk
    pub missing_files: Vec<String>,

    /// Manifests that could not be parsed
    pub unreadable_manifests: Vec<PathBuf>,
}

/// Scans the library under `root`
///
/// # Returns
///
/// * `Ok(LibraryStatistics)` - Summary of all readable manifests
/// * `Err(std::io::Error)` - The root itself could not be listed
pub fn scan_library(root: &Path) -> std::io::Result<LibraryStatistics> {
    let mut stats = LibraryStatistics::default();

    for brand_dir in subdirectories(root)? {
        for product_dir in subdirectories(&brand_dir)? {
            let path = product_dir.join(MANIFEST_FILE);
            if !path.is_file() {
                continue;
            }

            let manifest = match load_manifest(&path) {
                Ok(Some(manifest)) => manifest,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping manifest {}: {}", path.display(), e);
                    stats.unreadable_manifests.push(path);
                    continue;
                }
            };

            stats.products += 1;
            for record in &manifest.files {
                stats.files += 1;
                stats.total_bytes += record.size_bytes;
                *stats
                    .by_file_type
                    .entry(record.file_type.clone())
                    .or_insert(0) += 1;
                *stats.by_brand.entry(manifest.brand.clone()).or_insert(0) += 1;

                if !root.join(&record.stored_relative_path).is_file() {
                    stats.missing_files.push(record.stored_relative_path.clone());
                }
            }
        }
    }

    Ok(stats)
}

fn subdirectories(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Prints library statistics to stdout
pub fn print_library_statistics(root: &Path, stats: &LibraryStatistics) {
    println!("=== Library Statistics: {} ===\n", root.display());

    println!("Overview:");
    println!("  Products: {}", stats.products);
    println!("  Files: {}", stats.files);
    println!(
        "  Total size: {}",
        crate::assets::format_size(stats.total_bytes)
    );
    println!();

    if !stats.by_brand.is_empty() {
        println!("By Brand:");
        for (brand, count) in &stats.by_brand {
            println!("  {}: {}", brand, count);
        }
        println!();
    }

    if !stats.by_file_type.is_empty() {
        println!("By File Type:");
        for (file_type, count) in &stats.by_file_type {
            println!("  {}: {}", file_type, count);
        }
        println!();
    }

    if !stats.missing_files.is_empty() {
        println!("Missing Files ({}):", stats.missing_files.len());
        for path in &stats.missing_files {
            println!("  - {}", path);
        }
        println!();
    }

    if !stats.unreadable_manifests.is_empty() {
        println!("Unreadable Manifests ({}):", stats.unreadable_manifests.len());
        for path in &stats.unreadable_manifests {
            println!("  - {}", path.display());
        }
    }
}
