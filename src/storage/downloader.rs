//! Content-addressed downloader
//!
//! Stores each candidate at
//! `{root}/{brand}/{product_slug}/{variant?}/{file_type}/{filename}`.
//! The download always lands in a temp sibling first and is hashed while it
//! streams; it only replaces the destination when the content differs.

use super::{
    archive, hash_file, relative_path, settle_temp, temp_sibling, FileRecord, StorageError,
    StorageResult,
};
use crate::crawler::{CrawlCandidate, Fetcher, ProductContext};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Whether a store operation touched the destination file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// New or changed content was moved into place
    Written,
    /// The destination already held identical bytes
    Unchanged,
}

/// Result of storing one candidate
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// Record of the downloaded file itself
    pub primary: FileRecord,
    pub status: WriteStatus,

    /// Records of extracted container members
    pub members: Vec<FileRecord>,

    /// Set when the container could not be expanded
    pub archive_error: Option<String>,
}

impl DownloadOutcome {
    /// All records, primary first
    pub fn records(&self) -> Vec<FileRecord> {
        std::iter::once(self.primary.clone())
            .chain(self.members.iter().cloned())
            .collect()
    }
}

/// Fetches candidates into the library tree
#[derive(Debug, Clone)]
pub struct Downloader {
    fetcher: Fetcher,
    root: PathBuf,
}

impl Downloader {
    pub fn new(fetcher: Fetcher, root: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination path for a candidate
    pub fn destination(&self, candidate: &CrawlCandidate, context: &ProductContext) -> PathBuf {
        let mut dir = self.root.join(&context.brand).join(&context.product_slug);
        if let Some(variant) = &context.variant {
            dir = dir.join(variant);
        }
        dir.join(candidate.file_type().as_str())
            .join(&candidate.inferred_filename)
    }

    /// Downloads a candidate and stores it idempotently
    ///
    /// # Arguments
    ///
    /// * `candidate` - The download link
    /// * `context` - Product the file belongs to
    ///
    /// # Returns
    ///
    /// * `Ok(DownloadOutcome)` - The stored file and any extracted members
    /// * `Err(StorageError)` - Fetch or filesystem failure; no partial file
    ///   is left behind
    pub async fn fetch_and_store(
        &self,
        candidate: &CrawlCandidate,
        context: &ProductContext,
    ) -> StorageResult<DownloadOutcome> {
        let dest = self.destination(candidate, context);
        let dir = dest.parent().unwrap_or(&self.root).to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let existing_hash = if dest.exists() {
            Some(hash_file(&dest)?.0)
        } else {
            None
        };

        let temp = temp_sibling(&dest);
        let (new_hash, size) = match self.download_to(&candidate.url, &temp).await {
            Ok(done) => done,
            Err(e) => {
                let _ = std::fs::remove_file(&temp);
                return Err(e);
            }
        };

        let status = settle_temp(&temp, &dest, &new_hash, existing_hash.as_deref())?;
        match status {
            WriteStatus::Written => info!("Stored {} ({} bytes)", dest.display(), size),
            WriteStatus::Unchanged => debug!("Unchanged: {}", dest.display()),
        }

        let primary = FileRecord {
            source_url: Some(candidate.url.clone()),
            stored_relative_path: relative_path(&self.root, &dest),
            file_type: candidate.file_type().as_str().to_string(),
            extension: candidate.extension(),
            content_hash: new_hash,
            size_bytes: size,
            link_text: candidate.anchor_text.clone(),
        };

        let mut outcome = DownloadOutcome {
            primary,
            status,
            members: Vec::new(),
            archive_error: None,
        };

        // Expanded on the unchanged path too, so missing members are restored
        if candidate.is_container() {
            match archive::expand(&dest, &candidate.url, &self.root) {
                Ok(members) => outcome.members = members,
                Err(e) => {
                    warn!("Skipping expansion of {}: {}", dest.display(), e);
                    outcome.archive_error = Some(e.to_string());
                }
            }
        }

        Ok(outcome)
    }

    /// Streams a URL into `temp`, hashing as it goes
    async fn download_to(&self, url: &str, temp: &Path) -> StorageResult<(String, u64)> {
        let mut response =
            self.fetcher
                .fetch_response(url)
                .await
                .ok_or_else(|| StorageError::Http {
                    url: url.to_string(),
                    status: 0,
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(temp)
            .await
            .map_err(|e| StorageError::io(temp, e))?;
        let mut hasher = Sha256::new();
        let mut size = 0u64;

        while let Some(chunk) = response.chunk().await? {
            hasher.update(&chunk);
            size += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| StorageError::io(temp, e))?;
        }
        file.flush().await.map_err(|e| StorageError::io(temp, e))?;

        Ok((hex::encode(hasher.finalize()), size))
    }
}
