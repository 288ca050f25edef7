//! End-to-end backup run: list, find attachments, save, download

use crate::backup::Backup;
use crate::client::{HttpPageFetcher, PageFetcher};
use crate::config::{BackupOptions, Config};
use crate::download::AttachmentDownloader;
use crate::error::Result;
use crate::extract::{extract_all_tables, extract_attachments};
use crate::types::DownloadSummary;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// What a completed run produced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Tables written to the backup file
    pub tables: usize,
    /// Records written to the backup file
    pub records: usize,
    /// Attachment references found (before deduplication)
    pub attachments: usize,
    /// Result of the download stage
    pub downloads: DownloadSummary,
}

/// Run a full backup against the remote API
///
/// Validates the configuration, then lists every table, writes the backup file
/// to `output` and brings `download_dir` up to date. Nothing is written if
/// listing or attachment extraction fails.
pub async fn run_backup(
    config: &Config,
    options: &BackupOptions,
    output: &Path,
    download_dir: &Path,
) -> Result<RunSummary> {
    config.validate()?;
    let client = reqwest::Client::new();
    let fetcher = Arc::new(HttpPageFetcher::new(
        client.clone(),
        options.api_root.clone(),
        config.token.clone(),
    ));
    let downloader = AttachmentDownloader::new(client).with_workers(options.download_workers);
    run_backup_with(fetcher, &downloader, config, options, output, download_dir).await
}

/// [`run_backup`] with caller-supplied fetcher and downloader
pub async fn run_backup_with<F>(
    fetcher: Arc<F>,
    downloader: &AttachmentDownloader,
    config: &Config,
    options: &BackupOptions,
    output: &Path,
    download_dir: &Path,
) -> Result<RunSummary>
where
    F: PageFetcher + ?Sized + 'static,
{
    let selection = config.table_selection();
    info!(
        bases = selection.app_tables.len(),
        tables = selection.table_count(),
        "starting backup"
    );

    let tables = extract_all_tables(fetcher, &selection).await?;
    let attachments = extract_attachments(&tables, &options.attachment_link_prefix)?;
    let backup = Backup {
        config: selection,
        tables,
        attachments,
    };
    backup.save(output)?;
    info!(
        path = %output.display(),
        records = backup.record_count(),
        attachments = backup.attachments.len(),
        "backup file written"
    );

    let downloads = downloader
        .download_all(&backup.attachments, download_dir)
        .await?;

    Ok(RunSummary {
        tables: backup.tables.len(),
        records: backup.record_count(),
        attachments: backup.attachments.len(),
        downloads,
    })
}
