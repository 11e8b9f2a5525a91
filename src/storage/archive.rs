//! Archive expander
//!
//! Containers are unpacked into an `extracted/` directory beside them. Only
//! members with a supported asset extension are kept; everything else in the
//! archive is ignored.

use super::{
    hash_file, relative_path, settle_temp, temp_sibling, FileRecord, StorageError, StorageResult,
    WriteStatus,
};
use crate::assets::{extension_of, infer_file_type, is_supported_extension, sanitize_filename};
use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

/// Directory members are extracted into, beside the container
pub const EXTRACTED_DIR: &str = "extracted";

/// Suffix appended to the container URL in member records
pub const ARCHIVE_URL_SUFFIX: &str = "#archive";

/// Expands a container into `extracted/` beside it
///
/// # Arguments
///
/// * `container_path` - The stored container file
/// * `origin_url` - URL the container was downloaded from
/// * `root` - Library root, for relative paths in the records
///
/// # Returns
///
/// * `Ok(Vec<FileRecord>)` - One record per supported member, in archive order
/// * `Err(StorageError::Archive)` - The container could not be read; nothing
///   further is extracted
pub fn expand(
    container_path: &Path,
    origin_url: &str,
    root: &Path,
) -> StorageResult<Vec<FileRecord>> {
    let file = File::open(container_path).map_err(|e| StorageError::io(container_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_error(container_path, e))?;

    let container_dir = container_path.parent().unwrap_or(root);
    let out_dir = container_dir.join(EXTRACTED_DIR);
    let container_name = container_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut records = Vec::new();
    let mut written = 0usize;

    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| archive_error(container_path, e))?;

        if member.is_dir() {
            continue;
        }

        let Some(relative) = member.enclosed_name().and_then(|p| sanitized_member_path(&p))
        else {
            debug!("Skipping unsafe member name {:?}", member.name());
            continue;
        };

        let member_name = relative
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = extension_of(&member_name);
        if !is_supported_extension(&ext) {
            debug!("Skipping member {} ({})", member.name(), container_name);
            continue;
        }

        let dest = out_dir.join(&relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let existing_hash = if dest.exists() {
            Some(hash_file(&dest)?.0)
        } else {
            None
        };

        let temp = temp_sibling(&dest);
        let copied = File::create(&temp)
            .and_then(|mut out| io::copy(&mut member, &mut out).map(|_| ()))
            .map_err(|e| {
                let _ = std::fs::remove_file(&temp);
                archive_error(container_path, e)
            });
        copied?;

        let (hash, size) = match hash_file(&temp) {
            Ok(hashed) => hashed,
            Err(e) => {
                let _ = std::fs::remove_file(&temp);
                return Err(e);
            }
        };

        if settle_temp(&temp, &dest, &hash, existing_hash.as_deref())? == WriteStatus::Written {
            written += 1;
        }

        records.push(FileRecord {
            source_url: Some(format!("{}{}", origin_url, ARCHIVE_URL_SUFFIX)),
            stored_relative_path: relative_path(root, &dest),
            file_type: infer_file_type(&member_name, &ext).as_str().to_string(),
            extension: ext,
            content_hash: hash,
            size_bytes: size,
            link_text: format!("Extracted from {}", container_name),
        });
    }

    info!(
        "Expanded {}: {} members, {} written",
        container_name,
        records.len(),
        written
    );

    Ok(records)
}

/// Member path with every component sanitized; None for anything that could
/// escape the extraction directory
fn sanitized_member_path(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                let clean = sanitize_filename(&part.to_string_lossy());
                if clean.is_empty() || clean == "." || clean == ".." {
                    return None;
                }
                out.push(clean);
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    if out.as_os_str().is_empty() {
        None
    } else {
        Some(out)
    }
}

fn archive_error(path: &Path, e: impl std::fmt::Display) -> StorageError {
    StorageError::Archive {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
