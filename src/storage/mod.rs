//! Storage module for the asset library
//!
//! This module owns everything written under the library root:
//! - Content-addressed downloads into the brand/product/variant/type layout
//! - Expansion of container downloads into `extracted/`
//! - The per-product `product.json` manifest
//!
//! The directory tree and the manifests are the contract with downstream
//! tools (indexer, browser), so their shapes are stable.

mod archive;
mod downloader;
mod journal;

pub use archive::expand;
pub use downloader::{DownloadOutcome, Downloader, WriteStatus};
pub use journal::{load_manifest, manifest_path, merge, MergeOutcome, MANIFEST_FILE};

use crate::state::FailureKind;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix of in-progress downloads and extractions
pub(crate) const TEMP_SUFFIX: &str = ".tmp";

/// Errors that can occur while storing assets or manifests
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HTTP {status} while downloading {url}")]
    Http { url: String, status: u16 },

    #[error("Network error while downloading: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unreadable container {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("Manifest serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Maps the error to the failure kind counted in the run summary
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Http { status, .. } => {
                FailureKind::from_status(*status).unwrap_or(FailureKind::TerminalHttp)
            }
            Self::Network(_) => FailureKind::Transient,
            Self::Io { .. } => FailureKind::Storage,
            Self::Archive { .. } => FailureKind::Archive,
            Self::Serialization(_) => FailureKind::Manifest,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One stored file, as recorded in a product manifest
///
/// Identity is the pair (`source_url`, `content_hash`); two records with the
/// same pair describe the same fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub source_url: Option<String>,

    /// Path relative to the library root, `/`-separated
    #[serde(rename = "stored_path")]
    pub stored_relative_path: String,

    #[serde(default)]
    pub file_type: String,

    /// Lowercase extension with its dot
    #[serde(rename = "ext", default)]
    pub extension: String,

    /// Hex-encoded SHA-256 of the stored bytes
    #[serde(rename = "sha256")]
    pub content_hash: String,

    #[serde(default)]
    pub size_bytes: u64,

    /// Anchor text of the link the file came from
    #[serde(default)]
    pub link_text: String,
}

impl FileRecord {
    /// Dedup identity of the record
    pub fn identity(&self) -> (Option<&str>, &str) {
        (self.source_url.as_deref(), self.content_hash.as_str())
    }
}

/// Per-product manifest (`{root}/{brand}/{product_slug}/product.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductManifest {
    #[serde(default)]
    pub brand: String,

    #[serde(default)]
    pub product: String,

    #[serde(default)]
    pub product_slug: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub source_pages: Vec<String>,

    #[serde(default)]
    pub files: Vec<FileRecord>,

    /// Unix seconds of the last change
    #[serde(default)]
    pub updated_at: i64,

    /// Fields written by other tools; preserved on rewrite
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Hashes a file on disk, returning the hex SHA-256 and the size in bytes
pub fn hash_file(path: &Path) -> StorageResult<(String, u64)> {
    let mut file = std::fs::File::open(path).map_err(|e| StorageError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    let mut size = 0u64;

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| StorageError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }

    Ok((hex::encode(hasher.finalize()), size))
}

/// Hashes an in-memory buffer
pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Returns the temp sibling used while `path` is being written
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// Returns `path` relative to `root` as a `/`-separated string
pub(crate) fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Moves a fully written temp file over `dest`, or discards it when `dest`
/// already holds the same content
///
/// Returns whether `dest` was (re)written.
pub(crate) fn settle_temp(
    temp: &Path,
    dest: &Path,
    new_hash: &str,
    existing_hash: Option<&str>,
) -> StorageResult<WriteStatus> {
    if existing_hash == Some(new_hash) {
        std::fs::remove_file(temp).map_err(|e| StorageError::io(temp, e))?;
        return Ok(WriteStatus::Unchanged);
    }

    if let Err(e) = std::fs::rename(temp, dest) {
        let _ = std::fs::remove_file(temp);
        return Err(StorageError::io(dest, e));
    }
    Ok(WriteStatus::Written)
}
