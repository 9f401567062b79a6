//! Uploading a single part with bounded retry

use bytes::Bytes;
use tracing::Instrument;

use crate::error::TransferError;
use crate::retry::{RetryConfig, retry_with_backoff};
use crate::traits::{CompletedPart, ObjectStore, UploadSession};
use crate::transfer::plan::PartDescriptor;

/// Uploads parts of one session
///
/// Each call has its own retry budget; a failing part never consumes the
/// budget of another.
pub struct PartUploader<'a> {
    store: &'a dyn ObjectStore,
    retry: RetryConfig,
}

impl<'a> PartUploader<'a> {
    pub fn new(store: &'a dyn ObjectStore, retry: RetryConfig) -> Self {
        Self { store, retry }
    }

    /// Upload `body` as `part`, retrying every failure until the budget is
    /// spent
    pub async fn upload_part(
        &self,
        session: &UploadSession,
        part: &PartDescriptor,
        body: Bytes,
    ) -> Result<CompletedPart, TransferError> {
        let mut attempts = 0u32;

        let result = retry_with_backoff(
            &self.retry,
            || {
                attempts += 1;
                let body = body.clone();
                async move {
                    self.store
                        .upload_part(session, part.part_number, body)
                        .await
                }
            },
            |_| true,
        )
        .instrument(tracing::info_span!(
            "upload_part",
            upload_id = %session.upload_id,
            part_number = part.part_number
        ))
        .await;

        match result {
            Ok(etag) => {
                tracing::debug!(
                    upload_id = %session.upload_id,
                    part_number = part.part_number,
                    bytes = part.length,
                    attempts,
                    "Part uploaded"
                );
                Ok(CompletedPart {
                    part_number: part.part_number,
                    etag,
                })
            }
            Err(source) => {
                tracing::error!(
                    upload_id = %session.upload_id,
                    part_number = part.part_number,
                    attempts,
                    error = %source,
                    "Part upload failed, retries exhausted"
                );
                Err(TransferError::PartTransfer {
                    part_number: part.part_number,
                    attempts,
                    source,
                })
            }
        }
    }
}
