//! Process exit codes
//!
//! Scripts depend on these values; never renumber an existing variant.

use mineral_core::{Error, TransferError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments, configuration or include pattern
    UsageError = 2,
    NetworkError = 3,
    AuthError = 4,
    NotFound = 5,
    Conflict = 6,
    /// A multipart session could not be completed or aborted and needs
    /// manual cleanup on the service
    IncompleteUpload = 8,
    Interrupted = 130,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ExitCode::NotFound,
            Error::Io(_) | Error::General(_) => ExitCode::GeneralError,
            Error::Network(_) => ExitCode::NetworkError,
            Error::Auth(_) => ExitCode::AuthError,
            Error::NotFound(_) => ExitCode::NotFound,
            Error::Conflict(_) => ExitCode::Conflict,
            Error::InvalidPath(_) | Error::Config(_) => ExitCode::UsageError,
        }
    }

    pub fn from_transfer_error(error: &TransferError) -> Self {
        if error.requires_manual_cleanup() {
            return ExitCode::IncompleteUpload;
        }

        match error {
            TransferError::Interrupted => ExitCode::Interrupted,
            TransferError::Planning(_) => ExitCode::UsageError,
            TransferError::Open { source, .. }
            | TransferError::ReadPart { source, .. }
            | TransferError::Walk { source, .. } => {
                if source.kind() == std::io::ErrorKind::NotFound {
                    ExitCode::NotFound
                } else {
                    ExitCode::GeneralError
                }
            }
            TransferError::NothingToUpload { .. } => ExitCode::NotFound,
            _ => error
                .store_error()
                .map(Self::from_error)
                .unwrap_or(ExitCode::GeneralError),
        }
    }
}
