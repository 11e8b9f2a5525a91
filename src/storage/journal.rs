//! Metadata journal
//!
//! One `product.json` per (brand, product_slug). Merging is a whole-file
//! read-modify-write: records are deduplicated by (source_url, sha256),
//! source pages are kept as a set, and the file is only rewritten when
//! something actually changed.

use super::{temp_sibling, FileRecord, ProductManifest, StorageError, StorageResult};
use crate::crawler::{title_case, ProductContext};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Manifest file name inside a product directory
pub const MANIFEST_FILE: &str = "product.json";

/// What a merge did to the manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Records appended
    pub added: usize,

    /// Whether the file was rewritten
    pub changed: bool,

    /// Whether an unreadable manifest was moved aside
    pub recovered_corrupt: bool,
}

/// Path of the manifest for a product
pub fn manifest_path(root: &Path, brand: &str, product_slug: &str) -> PathBuf {
    root.join(brand).join(product_slug).join(MANIFEST_FILE)
}

/// Loads a manifest
///
/// Returns `Ok(None)` when the file does not exist, and a serialization
/// error when it exists but is not a valid manifest.
pub fn load_manifest(path: &Path) -> StorageResult<Option<ProductManifest>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

/// Merges new records and a source page into a product's manifest
///
/// # Arguments
///
/// * `root` - Library root
/// * `context` - Product the records belong to
/// * `new_records` - Records from this page; already known ones are ignored
/// * `source_page` - Page the records were found on
///
/// # Returns
///
/// * `Ok(MergeOutcome)` - What changed
/// * `Err(StorageError)` - The manifest could not be written
pub fn merge(
    root: &Path,
    context: &ProductContext,
    new_records: &[FileRecord],
    source_page: &str,
) -> StorageResult<MergeOutcome> {
    let path = manifest_path(root, &context.brand, &context.product_slug);
    let mut outcome = MergeOutcome::default();

    let mut manifest = match load_manifest(&path) {
        Ok(Some(existing)) => existing,
        Ok(None) => ProductManifest::default(),
        Err(StorageError::Serialization(e)) => {
            let aside = set_aside(&path)?;
            warn!(
                "Unreadable manifest {} ({}), moved to {}",
                path.display(),
                e,
                aside.display()
            );
            outcome.recovered_corrupt = true;
            ProductManifest::default()
        }
        Err(e) => return Err(e),
    };
    let is_new = manifest.files.is_empty() && manifest.source_pages.is_empty();

    let mut changed = outcome.recovered_corrupt;

    if !manifest.source_pages.iter().any(|p| p == source_page) {
        manifest.source_pages.push(source_page.to_string());
        changed = true;
    }

    let mut known: HashSet<(Option<String>, String)> = manifest
        .files
        .iter()
        .map(|r| (r.source_url.clone(), r.content_hash.clone()))
        .collect();

    let mut added: Vec<&FileRecord> = Vec::new();
    for record in new_records {
        let identity = (record.source_url.clone(), record.content_hash.clone());
        if known.contains(&identity) {
            // Older manifests may predate link_text
            if !record.link_text.is_empty() {
                if let Some(existing) = manifest.files.iter_mut().find(|r| {
                    r.identity() == record.identity() && r.link_text.is_empty()
                }) {
                    existing.link_text = record.link_text.clone();
                    changed = true;
                }
            }
            continue;
        }
        known.insert(identity);
        manifest.files.push(record.clone());
        added.push(record);
    }

    if let Some(first) = added.first() {
        let parts: Vec<&str> = first.stored_relative_path.split('/').collect();
        if parts.len() >= 2 {
            manifest.brand = parts[0].to_string();
            manifest.product_slug = parts[1].to_string();
            manifest.product = title_case(parts[1]);
        }
        changed = true;
    }

    if manifest.brand.is_empty() {
        manifest.brand = context.brand.clone();
    }
    if manifest.product_slug.is_empty() {
        manifest.product_slug = context.product_slug.clone();
    }
    if manifest.product.is_empty() {
        manifest.product = context.product_name.clone();
    }
    if manifest.category.is_none() && context.category.is_some() {
        manifest.category = context.category.clone();
        changed = true;
    }

    outcome.added = added.len();

    if !changed {
        debug!("Manifest unchanged: {}", path.display());
        return Ok(outcome);
    }

    manifest.updated_at = chrono::Utc::now().timestamp();
    write_manifest(&path, &manifest)?;
    outcome.changed = true;

    debug!(
        "{} manifest {} (+{} files)",
        if is_new { "Created" } else { "Updated" },
        path.display(),
        outcome.added
    );

    Ok(outcome)
}

/// Writes a manifest through a temp sibling and a rename
fn write_manifest(path: &Path, manifest: &ProductManifest) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }

    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');

    let temp = temp_sibling(path);
    std::fs::write(&temp, json).map_err(|e| StorageError::io(&temp, e))?;
    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(StorageError::io(path, e));
    }
    Ok(())
}

/// Renames an unreadable manifest to `product.json.corrupt-{unix_ts}`
fn set_aside(path: &Path) -> StorageResult<PathBuf> {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".corrupt-{}", chrono::Utc::now().timestamp()));
    let aside = path.with_file_name(name);

    std::fs::rename(path, &aside).map_err(|e| StorageError::io(path, e))?;
    Ok(aside)
}
