//! Attachment download stage
//!
//! The attachment store is a flat directory of files named by attachment ID.
//! A file that exists with the declared size counts as already backed up; a
//! file with any other size is treated as corruption and stops the run. New
//! files are streamed into `TEMP.<id>` next to their final name, checked
//! against the declared size, then renamed into place, so a final path only
//! ever holds a complete file.

use crate::error::{Error, IntegrityError, Result};
use crate::id::{ATTACHMENT_ID_PREFIX, is_valid_prefixed_id};
use crate::types::{Attachment, DownloadOutcome, DownloadSummary};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Prefix of in-progress download files
pub const TEMP_PREFIX: &str = "TEMP.";

/// Downloads attachments into a directory, once per attachment ID
#[derive(Clone, Debug)]
pub struct AttachmentDownloader {
    client: reqwest::Client,
    workers: usize,
}

impl AttachmentDownloader {
    /// Create a sequential downloader sharing `client`
    pub fn new(client: reqwest::Client) -> Self {
        Self { client, workers: 1 }
    }

    /// Allow up to `workers` downloads at once (values below 1 mean 1)
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Make sure every attachment is present in `target_dir`
    ///
    /// Attachments are handled in ascending ID order. The first failure stops
    /// the run: attachments after it are not attempted and in-flight downloads
    /// are abandoned with their temporary files removed.
    ///
    /// # Errors
    ///
    /// - `target_dir` is missing or not a directory
    /// - an attachment ID is not a valid file name
    /// - the same ID is declared with two different sizes
    /// - an existing file has the wrong size
    /// - a download fails or its length differs from the declared size
    pub async fn download_all(
        &self,
        attachments: &[Attachment],
        target_dir: &Path,
    ) -> Result<DownloadSummary> {
        let meta = fs::metadata(target_dir).await?;
        if !meta.is_dir() {
            return Err(Error::config(
                format!("download directory {} is not a directory", target_dir.display()),
                None,
            ));
        }

        let ordered = plan(attachments)?;
        let total = ordered.len();

        let summary = stream::iter(ordered.into_iter().enumerate())
            .map(|(i, attachment)| self.ensure_present(i + 1, total, attachment, target_dir))
            .buffered(self.workers)
            .try_fold(DownloadSummary::default(), |mut summary, outcome| async move {
                summary.record(outcome);
                Ok::<_, Error>(summary)
            })
            .await?;

        info!(
            downloaded = summary.downloaded,
            already_present = summary.already_present,
            bytes = summary.bytes,
            "attachment store up to date"
        );
        Ok(summary)
    }

    async fn ensure_present(
        &self,
        index: usize,
        total: usize,
        attachment: &Attachment,
        target_dir: &Path,
    ) -> Result<DownloadOutcome> {
        let final_path = target_dir.join(&attachment.id);
        match fs::metadata(&final_path).await {
            Ok(meta) if meta.len() == attachment.size => {
                debug!(id = %attachment.id, "already downloaded");
                return Ok(DownloadOutcome::AlreadyPresent);
            }
            Ok(meta) => {
                return Err(IntegrityError::ExistingSizeMismatch {
                    id: attachment.id.clone(),
                    path: final_path,
                    actual: meta.len(),
                    expected: attachment.size,
                }
                .into());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let bytes = self.fetch(attachment, target_dir, &final_path).await?;
        info!(
            index,
            total,
            url = %attachment.link,
            path = %final_path.display(),
            bytes,
            "{}/{}: downloaded {} bytes",
            index,
            total,
            bytes
        );
        Ok(DownloadOutcome::Downloaded { bytes })
    }

    /// Stream one attachment into its temp file and move it into place
    async fn fetch(
        &self,
        attachment: &Attachment,
        target_dir: &Path,
        final_path: &Path,
    ) -> Result<u64> {
        let mut response = self.client.get(&attachment.link).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status(),
                url: attachment.link.clone(),
            });
        }

        let temp_path = target_dir.join(format!("{TEMP_PREFIX}{}", attachment.id));
        let guard = TempFileGuard::new(temp_path.clone());
        let mut file = fs::File::create(&temp_path).await?;

        let mut received: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            received += chunk.len() as u64;
            if received > attachment.size {
                break;
            }
            file.write_all(&chunk).await?;
        }
        if received != attachment.size {
            return Err(IntegrityError::DownloadSizeMismatch {
                link: attachment.link.clone(),
                received,
                expected: attachment.size,
            }
            .into());
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, final_path).await?;
        guard.disarm();
        Ok(received)
    }
}

/// Sort by ID and collapse repeated IDs
///
/// The same attachment can be referenced from several records. Repeats must
/// agree on the size, otherwise two different blobs claim one file name.
fn plan(attachments: &[Attachment]) -> Result<Vec<&Attachment>> {
    for attachment in attachments {
        if !is_valid_prefixed_id(&attachment.id, ATTACHMENT_ID_PREFIX) {
            return Err(Error::InvalidId {
                kind: "attachment ID",
                value: attachment.id.clone(),
            });
        }
    }

    let mut ordered: Vec<&Attachment> = attachments.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let mut unique: Vec<&Attachment> = Vec::with_capacity(ordered.len());
    for attachment in ordered {
        match unique.last() {
            Some(prev) if prev.id == attachment.id => {
                if prev.size != attachment.size {
                    return Err(IntegrityError::ConflictingSizes {
                        id: attachment.id.clone(),
                        first: prev.size,
                        second: attachment.size,
                    }
                    .into());
                }
            }
            _ => unique.push(attachment),
        }
    }
    Ok(unique)
}

/// Removes a temp file when dropped unless disarmed
///
/// Covers early returns, errors and cancellation of the download future.
struct TempFileGuard {
    path: Option<PathBuf>,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// The file was renamed away; nothing to clean up
    fn disarm(mut self) {
        self.path = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
        }
    }
}
