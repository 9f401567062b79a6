//! Error types for mineral-core
//!
//! `Error` covers failures reported by the storage collaborator and the
//! local environment. `TransferError` is the upload engine's taxonomy and
//! carries enough context for an operator to know what remote state was left
//! behind.

use std::path::PathBuf;

use thiserror::Error;

use crate::path::RemotePath;

/// Result type alias for collaborator and configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the storage service, configuration and local I/O
#[derive(Debug, Error)]
pub enum Error {
    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network or service-side failure
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials rejected or missing
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Bucket, object or local path does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists or is in a conflicting state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed bucket, key or local path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("{0}")]
    General(String),
}

/// Invalid input to the part planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Part size of zero can never tile a file
    #[error("part size must be greater than zero")]
    ZeroPartSize,

    /// A multipart upload needs at least one part
    #[error("cannot start a multipart upload for an empty file")]
    EmptySource,

    #[error("file needs {parts} parts, more than the {max} a multipart upload allows")]
    TooManyParts { parts: u64, max: u64 },
}

/// Failures of a single file transfer
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid transfer plan: {0}")]
    Planning(#[from] PlanError),

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read part {part_number} from source file: {source}")]
    ReadPart {
        part_number: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initiate multipart upload for {target}: {source}")]
    Initiate {
        target: RemotePath,
        #[source]
        source: Error,
    },

    /// A part exhausted its retry budget
    #[error("part {part_number} failed after {attempts} attempt(s): {source}")]
    PartTransfer {
        part_number: i32,
        attempts: u32,
        #[source]
        source: Error,
    },

    /// Aborting the session failed after an earlier failure; the remote
    /// session is left dangling.
    #[error(
        "{cause}; additionally aborting multipart upload {upload_id} failed: {source} \
         (the upload must be aborted manually)"
    )]
    SessionAbort {
        upload_id: String,
        cause: Box<TransferError>,
        #[source]
        source: Error,
    },

    /// All parts were accepted but the completion call failed.
    #[error(
        "failed to complete multipart upload {upload_id}: {source} \
         (parts may exist remotely without an object; manual intervention required)"
    )]
    SessionComplete {
        upload_id: String,
        #[source]
        source: Error,
    },

    #[error("upload interrupted")]
    Interrupted,

    #[error("failed to upload {target}: {source}")]
    Put {
        target: RemotePath,
        #[source]
        source: Error,
    },

    #[error("failed to read directory {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no files to upload under {}", path.display())]
    NothingToUpload { path: PathBuf },
}

impl TransferError {
    /// Whether the failure left remote state that needs out-of-band cleanup
    pub fn requires_manual_cleanup(&self) -> bool {
        matches!(
            self,
            TransferError::SessionAbort { .. } | TransferError::SessionComplete { .. }
        )
    }

    /// The innermost collaborator error, if the failure came from the service
    pub fn store_error(&self) -> Option<&Error> {
        match self {
            TransferError::Initiate { source, .. }
            | TransferError::PartTransfer { source, .. }
            | TransferError::SessionComplete { source, .. }
            | TransferError::Put { source, .. } => Some(source),
            TransferError::SessionAbort { cause, .. } => cause.store_error(),
            _ => None,
        }
    }
}
