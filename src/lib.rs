//! # tablesnap
//!
//! Point-in-time backup of Airtable-style bases: every record of the configured
//! tables goes into one JSON snapshot, and every attachment those records
//! reference goes into a flat, deduplicated file store.
//!
//! ## Pipeline
//!
//! 1. [`extract::extract_all_tables`] lists every table, one concurrent worker
//!    per base. Any failure fails the whole extraction.
//! 2. [`extract::extract_attachments`] finds attachment descriptors inside the
//!    records and validates their shape.
//! 3. [`Backup::save`] writes the snapshot.
//! 4. [`AttachmentDownloader::download_all`] downloads each missing attachment
//!    once, verifying its size and moving it into place atomically.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tablesnap::{BackupOptions, Config, run_backup};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.json"))?;
//!     let summary = run_backup(
//!         &config,
//!         &BackupOptions::default(),
//!         Path::new("backup.json"),
//!         Path::new("attachments"),
//!     )
//!     .await?;
//!     println!("backed up {} records", summary.records);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Backup snapshot and file writer
pub mod backup;
/// Record listing client and pagination
pub mod client;
/// Configuration types
pub mod config;
/// Attachment download stage
pub mod download;
/// Error types
pub mod error;
/// Table extraction and attachment discovery
pub mod extract;
/// Remote identifier validation
pub mod id;
/// End-to-end backup run
pub mod pipeline;
/// Core types
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use backup::Backup;
pub use client::{HttpPageFetcher, PageFetcher, list_all_records};
pub use config::{BackupOptions, Config, TableSelection};
pub use download::AttachmentDownloader;
pub use error::{AggregateError, Error, ErrorClass, IntegrityError, Result, TableFailure};
pub use id::is_valid_id;
pub use pipeline::{RunSummary, run_backup, run_backup_with};
pub use types::{Attachment, DownloadOutcome, DownloadSummary, FieldValue, Page, Record, Tables};
