//! Upload engine
//!
//! [`TransferManager`] picks between a single `put_object` and a
//! [`MultipartUploadCoordinator`] for each file. The coordinator plans the
//! file into parts, hands each to a [`PartUploader`] and reports read
//! progress through a [`ProgressTracker`]. [`BatchUploadWalker`] drives the
//! manager over a directory tree.

pub mod manager;
pub mod multipart;
pub mod part;
pub mod plan;
pub mod progress;
pub mod walk;

#[cfg(test)]
pub(crate) mod testing;

pub use manager::{TransferManager, UploadKind, UploadOutcome};
pub use multipart::{MultipartSummary, MultipartUploadCoordinator};
pub use part::PartUploader;
pub use plan::{MAX_PARTS, PartDescriptor, plan_parts};
pub use progress::{ProgressCallback, ProgressReader, ProgressTracker, ProgressUpdate};
pub use walk::BatchUploadWalker;
