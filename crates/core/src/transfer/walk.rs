//! Uploading every file under a directory

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::TransferError;
use crate::path::{RemotePath, loop_key, object_key};
use crate::transfer::manager::TransferManager;

/// Uploads a directory tree one file at a time, stopping at the first
/// failure
pub struct BatchUploadWalker<'a> {
    manager: &'a TransferManager,
    include: Option<glob::Pattern>,
}

impl<'a> BatchUploadWalker<'a> {
    pub fn new(manager: &'a TransferManager) -> Self {
        Self {
            manager,
            include: None,
        }
    }

    /// Only upload files whose key matches `pattern`
    pub fn with_include(mut self, pattern: glob::Pattern) -> Self {
        self.include = Some(pattern);
        self
    }

    /// Upload every regular file under `root` once; returns the number of
    /// files uploaded
    pub async fn walk(&self, bucket: &str, root: &Path) -> Result<usize, TransferError> {
        self.walk_until(bucket, root, std::future::pending()).await
    }

    /// Like [`walk`](Self::walk), giving up when `interrupt` resolves
    ///
    /// `interrupt` is cloned for every file, so it should be a shared
    /// future. A multipart upload in flight when it fires is aborted.
    pub async fn walk_until<I>(
        &self,
        bucket: &str,
        root: &Path,
        interrupt: I,
    ) -> Result<usize, TransferError>
    where
        I: Future<Output = ()> + Clone,
    {
        self.pass(bucket, root, 0, interrupt).await
    }

    /// One pass over `root`, with keys suffixed by `iteration` after the
    /// first pass
    pub async fn walk_iteration(
        &self,
        bucket: &str,
        root: &Path,
        iteration: u64,
    ) -> Result<usize, TransferError> {
        self.pass(bucket, root, iteration, std::future::pending()).await
    }

    /// Upload `root` over and over, suffixing keys from the second pass on
    ///
    /// Only returns on failure. A pass that uploads nothing is a failure, so
    /// an empty directory cannot spin forever.
    pub async fn walk_loop(&self, bucket: &str, root: &Path) -> TransferError {
        self.walk_loop_until(bucket, root, std::future::pending()).await
    }

    /// Like [`walk_loop`](Self::walk_loop), returning
    /// [`TransferError::Interrupted`] once `interrupt` resolves
    pub async fn walk_loop_until<I>(
        &self,
        bucket: &str,
        root: &Path,
        interrupt: I,
    ) -> TransferError
    where
        I: Future<Output = ()> + Clone,
    {
        let mut iteration = 0;
        loop {
            match self.pass(bucket, root, iteration, interrupt.clone()).await {
                Ok(0) => {
                    return TransferError::NothingToUpload {
                        path: root.to_path_buf(),
                    };
                }
                Ok(count) => {
                    tracing::info!(iteration, files = count, "Batch pass complete");
                }
                Err(e) => return e,
            }
            iteration += 1;
        }
    }

    async fn pass<I>(
        &self,
        bucket: &str,
        root: &Path,
        iteration: u64,
        interrupt: I,
    ) -> Result<usize, TransferError>
    where
        I: Future<Output = ()> + Clone,
    {
        let mut files = Vec::new();
        collect_files(root, &mut files)?;

        let mut uploaded = 0;
        for file in files {
            let key = object_key(root, &file).map_err(|e| TransferError::Walk {
                path: file.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
            })?;

            if let Some(pattern) = &self.include
                && !pattern.matches(&key)
            {
                continue;
            }

            let target = RemotePath::new(bucket, loop_key(&key, iteration));
            match self
                .manager
                .upload_file_until(&target, &file, interrupt.clone())
                .await
            {
                Ok(outcome) => {
                    tracing::info!(
                        file = %file.display(),
                        target = %outcome.target,
                        bytes = outcome.bytes,
                        "Uploaded file"
                    );
                    uploaded += 1;
                }
                Err(TransferError::Interrupted) => {
                    tracing::warn!(file = %file.display(), "Batch upload interrupted");
                    return Err(TransferError::Interrupted);
                }
                Err(e) => {
                    tracing::error!(
                        file = %file.display(),
                        target = %target,
                        error = %e,
                        "Failed to upload file"
                    );
                    return Err(e);
                }
            }
        }

        Ok(uploaded)
    }
}

/// Regular files under `dir` in name order, depth first
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), TransferError> {
    let walk_error = |source| TransferError::Walk {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = std::fs::read_dir(dir)
        .map_err(walk_error)?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(walk_error)?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let file_type = entry.file_type().map_err(walk_error)?;
        let path = entry.path();
        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if file_type.is_file() {
            files.push(path);
        } else {
            tracing::debug!(path = %path.display(), "Skipping non-regular file");
        }
    }

    Ok(())
}
