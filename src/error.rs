//! Error types for tablesnap
//!
//! Every stage of the backup returns [`Result`]. Failures fall into four classes
//! (see [`ErrorClass`]): shape errors caught before any network call, transport
//! errors, schema errors where the remote broke our assumptions, and integrity
//! errors on downloaded or previously stored attachments.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tablesnap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tablesnap
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "app-tables")
        key: Option<String>,
    },

    /// An identifier failed the shape check and was never sent anywhere
    #[error("not a valid {kind}: {value:?}")]
    InvalidId {
        /// What the identifier was supposed to be ("base ID", "table ID", ...)
        kind: &'static str,
        /// The offending value (credentials are never echoed here)
        value: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote answered with a non-success status
    #[error("HTTP status {status} from {url}")]
    Http {
        /// The status code returned
        status: reqwest::StatusCode,
        /// The URL that was requested
        url: String,
    },

    /// A response body did not match the expected shape
    #[error("failed to decode {context}: {source}")]
    Decode {
        /// What was being decoded
        context: String,
        /// Underlying JSON error
        source: serde_json::Error,
    },

    /// A field value looked like an attachment but failed shape validation
    #[error("invalid attachment in table {table}, record {record}, field {field:?}: {reason}")]
    InvalidAttachment {
        /// Table the record came from
        table: String,
        /// Record identifier
        record: String,
        /// Field name holding the attachment list
        field: String,
        /// Which expectation failed
        reason: String,
    },

    /// Size verification failed for an attachment
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// One or more extraction workers failed
    #[error("{0}")]
    Extraction(#[from] AggregateError),

    /// An extraction worker panicked instead of returning
    #[error("extraction worker for base {base} panicked")]
    WorkerPanicked {
        /// The base the worker was listing
        base: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Size mismatches on attachments
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// A file already in the store has a different size than declared
    #[error(
        "already-downloaded attachment {id} at {path} is {actual} bytes instead of {expected}"
    )]
    ExistingSizeMismatch {
        /// Attachment identifier
        id: String,
        /// Path of the existing file
        path: PathBuf,
        /// Size found on disk
        actual: u64,
        /// Size declared by the record
        expected: u64,
    },

    /// The transferred body did not have the declared length
    #[error("download of {link} received {received} bytes but expected {expected}")]
    DownloadSizeMismatch {
        /// Attachment URL
        link: String,
        /// Bytes received (may stop early once the declared size is exceeded)
        received: u64,
        /// Size declared by the record
        expected: u64,
    },

    /// One attachment ID was declared with two different sizes
    #[error("attachment {id} is declared with sizes {first} and {second}")]
    ConflictingSizes {
        /// Attachment identifier
        id: String,
        /// Size of the first declaration (in ID order)
        first: u64,
        /// Size of the conflicting declaration
        second: u64,
    },
}

/// A failure of one (base, table) listing inside the extraction coordinator
#[derive(Debug)]
pub struct TableFailure {
    /// The base whose worker failed
    pub base: String,
    /// The table that was being listed, if the failure was table-specific
    pub table: Option<String>,
    /// What went wrong
    pub error: Error,
}

impl fmt::Display for TableFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}/{}: {}", self.base, table, self.error),
            None => write!(f, "{}: {}", self.base, self.error),
        }
    }
}

/// Every failure observed across all extraction workers
///
/// Formats on a single line so the CLI can print it as one diagnostic.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<TableFailure>,
}

impl AggregateError {
    /// Create an empty aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more failure
    pub fn push(&mut self, failure: TableFailure) {
        self.failures.push(failure);
    }

    /// All failures, in the order they were collected
    pub fn failures(&self) -> &[TableFailure] {
        &self.failures
    }

    /// Whether no failure was recorded
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of failures
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// `Ok(())` when empty, otherwise the aggregate as an [`Error`]
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Extraction(self))
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.failures.len() == 1 {
            "error"
        } else {
            "errors"
        };
        write!(f, "{} {} occurred during extraction: ", self.failures.len(), noun)?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Coarse classification of an [`Error`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed identifiers or configuration; nothing was sent
    Shape,
    /// Connection failures and non-success statuses
    Transport,
    /// The remote returned data we do not understand
    Schema,
    /// Byte counts disagree with declared sizes
    Integrity,
    /// Local filesystem or encoding failures
    Local,
}

impl ErrorClass {
    /// Process exit code used by the CLI for this class
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorClass::Shape => 2,
            ErrorClass::Transport => 3,
            ErrorClass::Schema => 4,
            ErrorClass::Integrity => 5,
            ErrorClass::Local => 1,
        }
    }
}

impl Error {
    /// Classify this error
    ///
    /// An aggregate takes the class of its first failure.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Config { .. } | Error::InvalidId { .. } => ErrorClass::Shape,
            Error::Network(_) | Error::Http { .. } => ErrorClass::Transport,
            Error::Decode { .. } | Error::InvalidAttachment { .. } => ErrorClass::Schema,
            Error::Integrity(_) => ErrorClass::Integrity,
            Error::Extraction(agg) => agg
                .failures()
                .first()
                .map_or(ErrorClass::Local, |f| f.error.class()),
            Error::WorkerPanicked { .. } | Error::Io(_) | Error::Serialization(_) => {
                ErrorClass::Local
            }
        }
    }

    pub(crate) fn config(message: impl Into<String>, key: Option<&str>) -> Self {
        Error::Config {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }
}
