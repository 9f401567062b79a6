//! Recording `ObjectStore` stub for transfer tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::{CompletedPart, ListOptions, ListResult, ObjectInfo, ObjectStore, UploadSession};

#[derive(Debug, Default)]
pub(crate) struct Calls {
    pub initiate: usize,
    /// (part number, body length) for every attempt
    pub upload_part: Vec<(i32, usize)>,
    /// Part numbers in the order the stub acknowledged them
    pub acknowledged: Vec<i32>,
    pub complete: Vec<Vec<CompletedPart>>,
    pub abort: usize,
    /// (target, body length) for every put attempt
    pub put: Vec<(RemotePath, usize)>,
}

type KeyPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Default)]
pub(crate) struct StubStore {
    pub calls: Mutex<Calls>,
    failing_part: Option<i32>,
    part_delay_ms: Option<fn(i32) -> u64>,
    fail_initiate: bool,
    fail_complete: bool,
    fail_abort: bool,
    fail_put: Option<KeyPredicate>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attempt at this part fails
    pub fn failing_part(mut self, part_number: i32) -> Self {
        self.failing_part = Some(part_number);
        self
    }

    pub fn part_delay_ms(mut self, delay: fn(i32) -> u64) -> Self {
        self.part_delay_ms = Some(delay);
        self
    }

    pub fn fail_initiate(mut self) -> Self {
        self.fail_initiate = true;
        self
    }

    pub fn fail_complete(mut self) -> Self {
        self.fail_complete = true;
        self
    }

    pub fn fail_abort(mut self) -> Self {
        self.fail_abort = true;
        self
    }

    pub fn fail_put_when(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.fail_put = Some(Box::new(predicate));
        self
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }

    pub fn put_keys(&self) -> Vec<String> {
        self.calls().put.iter().map(|(path, _)| path.key.clone()).collect()
    }
}

#[async_trait]
impl ObjectStore for StubStore {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        Ok(Vec::new())
    }

    async fn create_bucket(&self, _bucket: &str) -> Result<()> {
        Ok(())
    }

    async fn list_objects(&self, _bucket: &str, _options: ListOptions) -> Result<ListResult> {
        Ok(ListResult::default())
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Bytes> {
        Err(Error::NotFound(path.to_string()))
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Bytes,
        _content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        self.calls().put.push((path.clone(), data.len()));
        if let Some(predicate) = &self.fail_put
            && predicate(&path.key)
        {
            return Err(Error::Auth(format!("access denied for {}", path.key)));
        }
        Ok(ObjectInfo::file(&path.key, data.len() as i64))
    }

    async fn delete_object(&self, _path: &RemotePath) -> Result<()> {
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        _path: &RemotePath,
        _content_type: Option<String>,
    ) -> Result<String> {
        self.calls().initiate += 1;
        if self.fail_initiate {
            return Err(Error::Auth("access denied".to_string()));
        }
        Ok("upload-1".to_string())
    }

    async fn upload_part(
        &self,
        _session: &UploadSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        self.calls().upload_part.push((part_number, body.len()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.part_delay_ms {
            tokio::time::sleep(Duration::from_millis(delay(part_number))).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_part == Some(part_number) {
            return Err(Error::Network(format!("part {part_number} rejected")));
        }
        self.calls().acknowledged.push(part_number);
        Ok(format!("etag-{part_number}"))
    }

    async fn complete_multipart_upload(
        &self,
        _session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<()> {
        self.calls().complete.push(parts.to_vec());
        if self.fail_complete {
            return Err(Error::Network("InvalidPart".to_string()));
        }
        Ok(())
    }

    async fn abort_multipart_upload(&self, _session: &UploadSession) -> Result<()> {
        self.calls().abort += 1;
        if self.fail_abort {
            return Err(Error::Auth("abort denied".to_string()));
        }
        Ok(())
    }
}
