//! The backup snapshot and its on-disk encoding

use crate::config::TableSelection;
use crate::error::Result;
use crate::types::{Attachment, Tables};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

/// A complete point-in-time snapshot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    /// The table selection this snapshot was taken with
    pub config: TableSelection,
    /// Table ID -> records
    pub tables: Tables,
    /// Every attachment found in `tables`, in discovery order
    pub attachments: Vec<Attachment>,
}

impl Backup {
    /// Total number of records across all tables
    pub fn record_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Write the snapshot as indented JSON to `path`
    ///
    /// The file is written in place. If encoding, flushing or syncing fails the
    /// partial file is removed before the error is returned, so a failed save
    /// leaves nothing at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        match self.write_to(file) {
            Ok(()) => {
                debug!(path = %path.display(), "backup written");
                Ok(())
            }
            Err(e) => {
                if let Err(remove_err) = std::fs::remove_file(path) {
                    warn!(
                        path = %path.display(),
                        error = %remove_err,
                        "failed to remove partial backup file"
                    );
                }
                Err(e)
            }
        }
    }

    /// Read a snapshot previously written by [`Backup::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    fn write_to(&self, file: File) -> Result<()> {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}
