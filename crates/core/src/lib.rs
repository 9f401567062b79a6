//! mineral-core: Core library for the mineral object storage CLI
//!
//! This crate provides the pieces the CLI is built from:
//! - Configuration loading and validation
//! - Local and remote path handling
//! - The `ObjectStore` trait the upload engine talks to
//! - The chunked multipart upload engine and batch walker
//!
//! Nothing here depends on a particular S3 SDK, so the engine can be
//! exercised against in-memory stores in tests.

pub mod config;
pub mod error;
pub mod path;
pub mod retry;
pub mod traits;
pub mod transfer;

pub use config::{Config, ConfigManager, ConnectionConfig, TransferConfig};
pub use error::{Error, PlanError, Result, TransferError};
pub use path::{PathKind, RemotePath, loop_key, object_key, resolve_local_path};
pub use retry::{RetryBuilder, RetryConfig, is_retryable_error, retry_with_backoff};
pub use traits::{CompletedPart, ListOptions, ListResult, ObjectInfo, ObjectStore, UploadSession};
pub use transfer::{
    BatchUploadWalker, MultipartUploadCoordinator, PartUploader, ProgressCallback,
    ProgressTracker, ProgressUpdate, TransferManager, UploadKind, UploadOutcome,
};
