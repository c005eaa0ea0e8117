//! Error types for the drive engine.

use std::fmt;

/// Boundary classification of a [`DriveError`].
///
/// Every engine error collapses into one of these four categories before it
/// leaves the process, whatever the transport is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Errors that can occur when working with the drive.
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    /// Path or node does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Name collision at one level of the tree
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Empty path, empty or oversized name, bad key material
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An ancestor segment resolved to a file
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Serialization conflict that outlived the retry budget
    #[error("transaction retry budget exhausted after {attempts} attempts: {source}")]
    Transient {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    /// A tree row points at a blob that is not in the blob store
    #[error("blob missing for committed node: {0}")]
    MissingBlob(String),

    /// A blob exists but cannot be a valid `ciphertext || iv` layout
    #[error("corrupt blob {key}: {reason}")]
    CorruptBlob { key: String, reason: String },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Random number generator failure
    #[error("entropy source failure: {0}")]
    Entropy(String),
}

impl DriveError {
    /// Map this error onto the four categories exposed at the boundary.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::NotFound(_) => ErrorKind::NotFound,
            DriveError::AlreadyExists(_) | DriveError::NotADirectory(_) => ErrorKind::Conflict,
            DriveError::InvalidArgument(_) => ErrorKind::InvalidInput,
            DriveError::Transient { .. }
            | DriveError::MissingBlob(_)
            | DriveError::CorruptBlob { .. }
            | DriveError::Database(_)
            | DriveError::Migration(_)
            | DriveError::ObjectStore(_)
            | DriveError::Io(_)
            | DriveError::InvalidConfig(_)
            | DriveError::Entropy(_) => ErrorKind::Internal,
        }
    }

    /// Message that is safe to hand to an end user.
    ///
    /// Caller-caused errors keep their detail; internal errors are redacted to
    /// the category name.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => ErrorKind::Internal.to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn not_found(what: impl fmt::Display) -> Self {
        DriveError::NotFound(what.to_string())
    }
}

/// Result type alias for drive operations.
pub type Result<T> = std::result::Result<T, DriveError>;
