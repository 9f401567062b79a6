//! Single entry point for uploading a file
//!
//! Small files go up in one `put_object` call; files above the configured
//! multipart threshold go through [`MultipartUploadCoordinator`]. Empty
//! files always take the single-shot path, since a multipart upload needs at
//! least one part.

use std::fs::File;
use std::future::Future;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::TransferConfig;
use crate::error::TransferError;
use crate::path::RemotePath;
use crate::retry::{is_retryable_error, retry_with_backoff};
use crate::traits::ObjectStore;
use crate::transfer::multipart::MultipartUploadCoordinator;
use crate::transfer::progress::{ProgressCallback, ProgressReader, ProgressTracker};

/// How a file reached the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadKind {
    Single { etag: Option<String> },
    Multipart { upload_id: String, parts: usize },
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub target: RemotePath,
    pub bytes: u64,
    pub kind: UploadKind,
}

/// Uploads files through a shared storage client
///
/// Every call is its own transfer with a fresh progress counter.
pub struct TransferManager {
    store: Arc<dyn ObjectStore>,
    config: TransferConfig,
    progress: Option<ProgressCallback>,
}

impl TransferManager {
    pub fn new(store: Arc<dyn ObjectStore>, config: TransferConfig) -> Self {
        Self {
            store,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub async fn upload_file(
        &self,
        target: &RemotePath,
        path: &Path,
    ) -> Result<UploadOutcome, TransferError> {
        self.upload_file_until(target, path, std::future::pending())
            .await
    }

    /// Upload `path`, giving up when `interrupt` resolves
    ///
    /// An interrupted multipart upload is aborted before this returns.
    pub async fn upload_file_until<F>(
        &self,
        target: &RemotePath,
        path: &Path,
        interrupt: F,
    ) -> Result<UploadOutcome, TransferError>
    where
        F: Future<Output = ()>,
    {
        let size = std::fs::metadata(path)
            .map_err(|source| TransferError::Open {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        if size > self.config.multipart_threshold {
            let summary = MultipartUploadCoordinator::new(self.store.as_ref(), &self.config)
                .with_progress(self.progress.clone())
                .upload_until(target, path, interrupt)
                .await?;
            return Ok(UploadOutcome {
                target: target.clone(),
                bytes: summary.bytes,
                kind: UploadKind::Multipart {
                    upload_id: summary.upload_id,
                    parts: summary.parts,
                },
            });
        }

        tokio::select! {
            result = self.put_single(target, path) => result,
            () = interrupt => Err(TransferError::Interrupted),
        }
    }

    async fn put_single(
        &self,
        target: &RemotePath,
        path: &Path,
    ) -> Result<UploadOutcome, TransferError> {
        let open_error = |source| TransferError::Open {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(open_error)?;
        let size = file.metadata().map_err(open_error)?.len();

        let tracker = Arc::new(ProgressTracker::new(size, self.progress.clone()));
        let mut data = Vec::with_capacity(size as usize);
        ProgressReader::new(file, tracker)
            .read_to_end(&mut data)
            .map_err(open_error)?;
        let data = Bytes::from(data);

        let content_type = mime_guess::from_path(path).first_raw().map(str::to_string);

        tracing::debug!(target = %target, bytes = size, "Uploading in a single request");

        let info = retry_with_backoff(
            &self.config.retry_config(),
            || {
                self.store
                    .put_object(target, data.clone(), content_type.clone())
            },
            is_retryable_error,
        )
        .await
        .map_err(|source| TransferError::Put {
            target: target.clone(),
            source,
        })?;

        Ok(UploadOutcome {
            target: target.clone(),
            bytes: data.len() as u64,
            kind: UploadKind::Single { etag: info.etag },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::progress::ProgressUpdate;
    use crate::transfer::testing::StubStore;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn manager(store: Arc<StubStore>, threshold: u64) -> TransferManager {
        let config = TransferConfig {
            part_size: 4,
            multipart_threshold: threshold,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            ..Default::default()
        };
        TransferManager::new(store, config)
    }

    fn write(dir: &TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![b'x'; len]).unwrap();
        path
    }

    #[tokio::test]
    async fn test_small_file_uses_single_put() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "small.txt", 4);
        let store = Arc::new(StubStore::new());

        let outcome = manager(store.clone(), 4)
            .upload_file(&RemotePath::new("b", "small.txt"), &path)
            .await
            .unwrap();

        assert_eq!(outcome.bytes, 4);
        assert!(matches!(outcome.kind, UploadKind::Single { .. }));
        let calls = store.calls();
        assert_eq!(calls.put.len(), 1);
        assert_eq!(calls.initiate, 0);
    }

    #[tokio::test]
    async fn test_large_file_uses_multipart() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "large.bin", 10);
        let store = Arc::new(StubStore::new());

        let outcome = manager(store.clone(), 4)
            .upload_file(&RemotePath::new("b", "large.bin"), &path)
            .await
            .unwrap();

        assert_eq!(
            outcome.kind,
            UploadKind::Multipart {
                upload_id: "upload-1".to_string(),
                parts: 3
            }
        );
        let calls = store.calls();
        assert!(calls.put.is_empty());
        assert_eq!(calls.initiate, 1);
        assert_eq!(calls.complete.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_file_falls_back_to_single_put() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty", 0);
        let store = Arc::new(StubStore::new());

        let outcome = manager(store.clone(), 0)
            .upload_file(&RemotePath::new("b", "empty"), &path)
            .await
            .unwrap();

        assert_eq!(outcome.bytes, 0);
        let calls = store.calls();
        assert_eq!(calls.put.len(), 1);
        assert_eq!(calls.initiate, 0);
    }

    #[tokio::test]
    async fn test_put_failure_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "denied.txt", 2);
        let store = Arc::new(StubStore::new().fail_put_when(|_| true));

        let err = manager(store.clone(), 4)
            .upload_file(&RemotePath::new("b", "denied.txt"), &path)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Put { .. }));
        // Auth failures are not transient, so there is no retry
        assert_eq!(store.calls().put.len(), 1);
    }

    #[tokio::test]
    async fn test_each_transfer_starts_progress_from_zero() {
        let dir = TempDir::new().unwrap();
        let first = write(&dir, "one", 3);
        let second = write(&dir, "two", 2);
        let store = Arc::new(StubStore::new());

        let seen = Arc::new(Mutex::new(Vec::<ProgressUpdate>::new()));
        let sink = seen.clone();
        let manager = manager(store, 4).with_progress(Arc::new(move |update: ProgressUpdate| {
            sink.lock().unwrap().push(update)
        }));

        manager
            .upload_file(&RemotePath::new("b", "one"), &first)
            .await
            .unwrap();
        manager
            .upload_file(&RemotePath::new("b", "two"), &second)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        let last_of = |total| {
            seen.iter()
                .filter(|u| u.total_bytes == total)
                .map(|u| u.bytes_read)
                .max()
        };
        assert_eq!(last_of(3), Some(3));
        assert_eq!(last_of(2), Some(2));
    }
}
