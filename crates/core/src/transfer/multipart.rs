//! Multipart upload of a single file
//!
//! The coordinator owns the whole life of an upload session: it initiates
//! the session, streams each planned part from disk, and then either
//! completes the session or aborts it. Every session it initiates ends in
//! exactly one complete or abort call, except when the process itself is
//! killed.

use std::fs::File;
use std::future::Future;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::config::TransferConfig;
use crate::error::{PlanError, TransferError};
use crate::path::RemotePath;
use crate::retry::{is_retryable_error, retry_with_backoff};
use crate::traits::{CompletedPart, ObjectStore, UploadSession};
use crate::transfer::part::PartUploader;
use crate::transfer::plan::{PartDescriptor, plan_parts};
use crate::transfer::progress::{ProgressCallback, ProgressReader, ProgressTracker};

/// Largest single read from the source file; keeps progress updates flowing
/// within a part
const READ_CHUNK: usize = 256 * 1024;

/// Result of a completed multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartSummary {
    pub upload_id: String,
    pub parts: usize,
    pub bytes: u64,
}

/// Drives one multipart upload from initiation to completion or abort
pub struct MultipartUploadCoordinator<'a> {
    store: &'a dyn ObjectStore,
    config: &'a TransferConfig,
    progress: Option<ProgressCallback>,
}

impl<'a> MultipartUploadCoordinator<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a TransferConfig) -> Self {
        Self {
            store,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    pub async fn upload(
        &self,
        target: &RemotePath,
        path: &Path,
    ) -> Result<MultipartSummary, TransferError> {
        self.upload_until(target, path, std::future::pending()).await
    }

    /// Upload `path` to `target`, aborting the session if `interrupt`
    /// resolves before every part is acknowledged
    pub async fn upload_until<F>(
        &self,
        target: &RemotePath,
        path: &Path,
        interrupt: F,
    ) -> Result<MultipartSummary, TransferError>
    where
        F: Future<Output = ()>,
    {
        let open_error = |source| TransferError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_error)?;
        let size = file.metadata().map_err(open_error)?.len();

        if size == 0 {
            return Err(PlanError::EmptySource.into());
        }
        let parts = plan_parts(size, self.config.part_size)?;

        let content_type = mime_guess::from_path(path).first_raw().map(str::to_string);
        let upload_id = self
            .store
            .create_multipart_upload(target, content_type)
            .await
            .map_err(|source| TransferError::Initiate {
                target: target.clone(),
                source,
            })?;
        let session = UploadSession::new(target.clone(), upload_id);

        tracing::info!(
            target = %target,
            upload_id = %session.upload_id,
            bytes = size,
            parts = parts.len(),
            concurrency = self.config.concurrency,
            "Multipart upload started"
        );

        let tracker = Arc::new(ProgressTracker::new(size, self.progress.clone()));
        let source = PartSource::new(file, tracker);

        let outcome = tokio::select! {
            result = self.upload_parts(&session, &parts, source) => result,
            () = interrupt => {
                tracing::warn!(upload_id = %session.upload_id, "Upload interrupted");
                Err(TransferError::Interrupted)
            }
        };

        let completed = match outcome {
            Ok(completed) => completed,
            Err(cause) => return Err(self.abort(&session, cause).await),
        };

        self.store
            .complete_multipart_upload(&session, &completed)
            .await
            .map_err(|source| {
                tracing::error!(
                    upload_id = %session.upload_id,
                    error = %source,
                    "Completing multipart upload failed"
                );
                TransferError::SessionComplete {
                    upload_id: session.upload_id.clone(),
                    source,
                }
            })?;

        tracing::info!(target = %target, upload_id = %session.upload_id, "Multipart upload completed");

        Ok(MultipartSummary {
            upload_id: session.upload_id,
            parts: completed.len(),
            bytes: size,
        })
    }

    /// Upload every part, at most `concurrency` at a time
    ///
    /// Returns the acknowledged parts sorted by part number, or the first
    /// failure. Parts still in flight when a failure arrives are dropped.
    async fn upload_parts(
        &self,
        session: &UploadSession,
        parts: &[PartDescriptor],
        source: PartSource,
    ) -> Result<Vec<CompletedPart>, TransferError> {
        let source = Arc::new(Mutex::new(source));
        let uploader = &PartUploader::new(self.store, self.config.retry_config());

        let mut in_flight = stream::iter(parts)
            .map(|part| {
                let source = Arc::clone(&source);
                async move {
                    let body = read_part(source, *part).await.map_err(|e| {
                        TransferError::ReadPart {
                            part_number: part.part_number,
                            source: e,
                        }
                    })?;
                    uploader.upload_part(session, part, body).await
                }
            })
            .buffer_unordered(self.config.concurrency.max(1));

        let total: u64 = parts.iter().map(|p| p.length).sum();
        let mut transferred = 0;
        let mut completed = Vec::with_capacity(parts.len());

        while let Some(result) = in_flight.next().await {
            let part = result?;
            transferred += parts
                .get((part.part_number - 1) as usize)
                .map_or(0, |p| p.length);
            tracing::debug!(
                part_number = part.part_number,
                remaining_bytes = total - transferred,
                "Part complete"
            );
            completed.push(part);
        }

        completed.sort_by_key(|p| p.part_number);
        Ok(completed)
    }

    /// Abort the session after `cause`; transient abort failures are retried
    async fn abort(&self, session: &UploadSession, cause: TransferError) -> TransferError {
        tracing::warn!(
            upload_id = %session.upload_id,
            error = %cause,
            "Aborting multipart upload"
        );

        let result = retry_with_backoff(
            &self.config.retry_config(),
            || self.store.abort_multipart_upload(session),
            is_retryable_error,
        )
        .await;

        match result {
            Ok(()) => {
                tracing::info!(upload_id = %session.upload_id, "Multipart upload aborted");
                cause
            }
            Err(source) => {
                tracing::error!(
                    upload_id = %session.upload_id,
                    error = %source,
                    "Aborting multipart upload failed; session left dangling"
                );
                TransferError::SessionAbort {
                    upload_id: session.upload_id.clone(),
                    cause: Box::new(cause),
                    source,
                }
            }
        }
    }
}

/// Read one part on the blocking pool so in-flight uploads keep being polled
async fn read_part(source: Arc<Mutex<PartSource>>, part: PartDescriptor) -> io::Result<Bytes> {
    tokio::task::spawn_blocking(move || {
        let mut source = source
            .lock()
            .map_err(|_| io::Error::other("part reader poisoned"))?;
        source.read_part(&part)
    })
    .await
    .map_err(io::Error::other)?
}

/// Reads planned byte ranges from the source file
struct PartSource {
    reader: ProgressReader<File>,
}

impl PartSource {
    fn new(file: File, tracker: Arc<ProgressTracker>) -> Self {
        Self {
            reader: ProgressReader::new(file, tracker),
        }
    }

    fn read_part(&mut self, part: &PartDescriptor) -> io::Result<Bytes> {
        self.reader.get_mut().seek(SeekFrom::Start(part.offset))?;

        let mut buf = vec![0u8; part.length as usize];
        let mut filled = 0;
        while filled < buf.len() {
            let end = (filled + READ_CHUNK).min(buf.len());
            match self.reader.read(&mut buf[filled..end]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "source file shrank during upload",
                    ));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        Ok(Bytes::from(buf))
    }
}
