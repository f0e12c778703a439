//! Error types for the import pipelines
//!
//! Every variant is fatal to the run. `NoContent` from the remote API is not
//! an error and never appears here; see [`crate::api::FetchOutcome`].

use thiserror::Error;

/// Result type alias for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error type for the import pipelines
#[derive(Error, Debug)]
pub enum IngestError {
    /// HTTP or network failure other than the "no content" status
    #[error("Transport failure for {url}: {reason}")]
    TransportFailure { url: String, reason: String },

    /// The remote source lists no generations at all
    #[error("No data available: the schedule list is empty")]
    NoDataAvailable,

    /// Zero or several distinct date suffixes among the archive entries
    #[error("Date suffix not detected in {archive}: found {found:?}, expected exactly one")]
    AmbiguousOrMissingGeneration { archive: String, found: Vec<String> },

    /// The archive's integrity check failed for an entry
    #[error("Archive {archive} is corrupt - bad entry for {entry}")]
    CorruptArchiveEntry { archive: String, entry: String },

    /// A declared file is not present in the archive
    #[error("Archive {archive} has no entry named {entry}")]
    MissingArchiveEntry { archive: String, entry: String },

    /// A row does not have the shape its parser requires
    #[error("Malformed record in {file} at line {line}: {reason}")]
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },

    /// A response body that is not the expected envelope or record shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The declared foreign keys form a cycle
    #[error("Dependency cycle detected at table '{table}'")]
    DependencyCycle { table: String },

    /// A foreign key references a table that is not declared
    #[error("Table '{referenced_by}' references undeclared table '{table}'")]
    UnknownTable { table: String, referenced_by: String },

    /// A write targets a column the destination table does not have
    #[error("Table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] pbs_common::PbsError),
}

impl IngestError {
    /// Create a transport failure for a URL
    pub fn transport(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::TransportFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a malformed record error
    pub fn malformed_record(file: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            file: file.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a malformed payload error
    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        Self::TransportFailure {
            url,
            reason: err.to_string(),
        }
    }
}
