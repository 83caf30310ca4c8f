//! Media asset synchronization
//!
//! Every listed media item is downloaded and compared by SHA-256 against the copy
//! already on disk. Identical content keeps the existing file; changed content is
//! written next to it under a timestamped name, so earlier copies are never
//! overwritten.
//!
//! Precondition: at most one run works on a media directory at a time. The
//! exists-check, hash comparison and rename are not atomic as a whole, and two
//! concurrent runs could both decide to create the same file.

use crate::client::RemoteClient;
use crate::error::Result;
use crate::types::MediaDescriptor;
use crate::utils::{ensure_dir, file_name_from_url, get_unique_path, insert_stamp, split_extension};
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Read buffer used when hashing files on disk
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// What happened to one media item
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaOutcome {
    /// Downloaded content matched an existing local file; nothing written
    Unchanged,
    /// No local file existed; written under the URL's file name
    Created,
    /// Content differed from the local file; written under a timestamped name
    Changed,
    /// No usable URL or file name
    Skipped,
    /// Download or local write failed
    Failed,
}

/// Per-outcome counts for one sync pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Items whose content was already on disk
    pub unchanged: usize,
    /// Items written for the first time
    pub created: usize,
    /// Items written as a new timestamped version
    pub changed: usize,
    /// Items without URL
    pub skipped: usize,
    /// Items that could not be downloaded or written
    pub failed: usize,
}

impl SyncSummary {
    fn count(&mut self, outcome: MediaOutcome) {
        match outcome {
            MediaOutcome::Unchanged => self.unchanged += 1,
            MediaOutcome::Created => self.created += 1,
            MediaOutcome::Changed => self.changed += 1,
            MediaOutcome::Skipped => self.skipped += 1,
            MediaOutcome::Failed => self.failed += 1,
        }
    }

    /// Items that ended up with a local copy
    pub fn with_local_copy(&self) -> usize {
        self.unchanged + self.created + self.changed
    }
}

/// Downloads media assets into a local directory and deduplicates them by content
#[derive(Debug)]
pub struct MediaSynchronizer<'a> {
    client: &'a RemoteClient,
    media_dir: PathBuf,
}

impl<'a> MediaSynchronizer<'a> {
    /// Synchronizer writing into `media_dir`
    pub fn new(client: &'a RemoteClient, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            media_dir: media_dir.into(),
        }
    }

    /// Sync all descriptors, setting `local_copy` on each
    pub async fn sync(&self, descriptors: &mut [MediaDescriptor]) -> Result<SyncSummary> {
        self.sync_at(descriptors, Local::now()).await
    }

    /// Like [`sync`](Self::sync), stamping changed files with `at`
    ///
    /// # Errors
    /// Fails only when the media directory cannot be created; per-item failures are
    /// counted in the summary and leave that item's `local_copy` empty.
    pub async fn sync_at(
        &self,
        descriptors: &mut [MediaDescriptor],
        at: DateTime<Local>,
    ) -> Result<SyncSummary> {
        ensure_dir(&self.media_dir).await?;

        let mut summary = SyncSummary::default();
        for descriptor in descriptors.iter_mut() {
            let outcome = self.sync_one(descriptor, &at).await;
            summary.count(outcome);
        }

        info!(
            media_dir = %self.media_dir.display(),
            unchanged = summary.unchanged,
            created = summary.created,
            changed = summary.changed,
            skipped = summary.skipped,
            failed = summary.failed,
            "media sync complete"
        );
        Ok(summary)
    }

    async fn sync_one(&self, descriptor: &mut MediaDescriptor, at: &DateTime<Local>) -> MediaOutcome {
        descriptor.local_copy = None;

        let Some(url) = descriptor.url().map(str::to_string) else {
            debug!("media item has no url, skipping");
            return MediaOutcome::Skipped;
        };

        let Some(bytes) = self.client.download_binary(&url).await else {
            return MediaOutcome::Failed;
        };

        let Some(file_name) = file_name_from_url(&url).map(str::to_string) else {
            warn!(url, "media url has no usable file name, skipping");
            return MediaOutcome::Skipped;
        };

        let downloaded_hash = hash_bytes(&bytes);
        let local_path = self.media_dir.join(&file_name);

        let target = if is_file(&local_path).await {
            match hash_file(&local_path).await {
                Ok(existing) if existing == downloaded_hash => {
                    debug!(file = %file_name, "media unchanged");
                    descriptor.local_copy = Some(file_name);
                    return MediaOutcome::Unchanged;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %local_path.display(), error = %e, "failed to hash existing media file");
                    return MediaOutcome::Failed;
                }
            }

            if let Some(previous) = self.find_stamped_copy(&file_name, &downloaded_hash).await {
                debug!(file = %previous, "media matches an earlier version");
                descriptor.local_copy = Some(previous);
                return MediaOutcome::Unchanged;
            }

            match get_unique_path(&self.media_dir.join(insert_stamp(&file_name, at))) {
                Ok(path) => path,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "no free name for changed media");
                    return MediaOutcome::Failed;
                }
            }
        } else {
            local_path
        };

        if let Err(e) = write_via_temp(&target, &bytes).await {
            warn!(path = %target.display(), error = %e, "failed to write media file");
            return MediaOutcome::Failed;
        }

        let written = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&file_name)
            .to_string();
        let outcome = if written == file_name {
            MediaOutcome::Created
        } else {
            MediaOutcome::Changed
        };
        debug!(file = %written, ?outcome, bytes = bytes.len(), "media written");
        descriptor.local_copy = Some(written);
        outcome
    }

    /// Earlier timestamped version of `file_name` whose content hashes to `hash`
    async fn find_stamped_copy(&self, file_name: &str, hash: &str) -> Option<String> {
        let (stem, extension) = split_extension(file_name);

        let mut entries = match tokio::fs::read_dir(&self.media_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.media_dir.display(), error = %e, "failed to list media directory");
                return None;
            }
        };

        let mut candidates = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str()
                && is_stamped_variant(name, stem, extension)
            {
                candidates.push(name.to_string());
            }
        }
        candidates.sort();

        for name in candidates {
            if let Ok(existing) = hash_file(&self.media_dir.join(&name)).await
                && existing == hash
            {
                return Some(name);
            }
        }
        None
    }
}

/// Whether `name` is `{stem}_{ddMMyyyy_HHmmss}[ (n)][.{extension}]`
fn is_stamped_variant(name: &str, stem: &str, extension: Option<&str>) -> bool {
    let middle = match extension {
        Some(ext) => match name.strip_suffix(ext).and_then(|n| n.strip_suffix('.')) {
            Some(middle) => middle,
            None => return false,
        },
        None => name,
    };
    let Some(rest) = middle
        .strip_prefix(stem)
        .and_then(|r| r.strip_prefix('_'))
    else {
        return false;
    };

    let bytes = rest.as_bytes();
    if bytes.len() < 15
        || !bytes[..8].iter().all(u8::is_ascii_digit)
        || bytes[8] != b'_'
        || !bytes[9..15].iter().all(u8::is_ascii_digit)
    {
        return false;
    }

    let tail = &rest[15..];
    tail.is_empty()
        || tail
            .strip_prefix(" (")
            .and_then(|t| t.strip_suffix(')'))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Hex SHA-256 of an in-memory buffer
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex SHA-256 of a file, streamed from disk
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write to a hidden sibling first, then rename into place
async fn write_via_temp(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("media");
    let temp = target.with_file_name(format!(".{file_name}.part"));

    if let Err(e) = tokio::fs::write(&temp, bytes).await {
        tokio::fs::remove_file(&temp).await.ok();
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&temp, target).await {
        tokio::fs::remove_file(&temp).await.ok();
        return Err(e);
    }
    Ok(())
}
