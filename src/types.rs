//! Core types for tablesnap

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All records of a backup, keyed by table ID
pub type Tables = BTreeMap<String, Vec<Record>>;

/// An untyped record field value
///
/// Tables have no schema known in advance, so values are a closed union over
/// JSON shapes. Numbers keep their original representation so integers stay
/// integers in the backup file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// JSON null
    Null,
    /// Checkbox and other booleans
    Bool(bool),
    /// Any JSON number
    Number(serde_json::Number),
    /// Text, dates, single selects, ...
    String(String),
    /// Attachments, linked records, multiple selects, ...
    List(Vec<FieldValue>),
    /// Nested objects (attachment descriptors, collaborators, ...)
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// The string content, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::String(_) => "string",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }
}

/// One record of a table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    /// Record identifier
    pub id: String,
    /// Creation timestamp, kept verbatim
    #[serde(rename = "createdTime")]
    pub created_time: String,
    /// Field name -> value; fields with no value are absent
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

/// One page of a table listing
///
/// Unknown envelope keys are rejected so that new remote-side fields which
/// could change the meaning of a listing are noticed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Page {
    /// Records on this page
    pub records: Vec<Record>,
    /// Continuation token; absent or empty on the last page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

impl Page {
    /// The continuation token for the next page, or `None` at the end
    pub fn next_offset(&self) -> Option<&str> {
        self.offset.as_deref().filter(|o| !o.is_empty())
    }
}

/// A reference to a binary blob found inside a record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Download URL
    pub link: String,
    /// Attachment identifier, also the on-disk file name
    pub id: String,
    /// Declared size in bytes
    pub size: u64,
}

/// Terminal state of one attachment in a download run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Fetched and moved into place
    Downloaded {
        /// Bytes written
        bytes: u64,
    },
    /// A file of the declared size was already present
    AlreadyPresent,
}

/// Counts from a download run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Attachments fetched during this run
    pub downloaded: usize,
    /// Attachments skipped because they were already present
    pub already_present: usize,
    /// Bytes fetched during this run
    pub bytes: u64,
}

impl DownloadSummary {
    /// Fold one outcome into the summary
    pub fn record(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            DownloadOutcome::AlreadyPresent => self.already_present += 1,
        }
    }
}
