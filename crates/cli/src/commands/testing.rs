//! In-memory `ObjectStore` for command tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use mineral_core::{
    CompletedPart, Error, ListOptions, ListResult, ObjectInfo, ObjectStore, RemotePath, Result,
    UploadSession,
};

#[derive(Default)]
pub(crate) struct MemoryStore {
    /// bucket -> key -> body
    pub buckets: Mutex<BTreeMap<String, BTreeMap<String, Bytes>>>,
    /// upload id -> (target, part number -> body)
    pub uploads: Mutex<BTreeMap<String, (RemotePath, BTreeMap<i32, Bytes>)>>,
    /// Page size for listings
    pub page_size: usize,
    pub list_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self {
            page_size: 1000,
            ..Default::default()
        };
        store
            .buckets
            .lock()
            .unwrap()
            .insert(bucket.to_string(), BTreeMap::new());
        store
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        self.buckets
            .lock()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), Bytes::copy_from_slice(body));
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn open_uploads(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        Ok(self
            .buckets
            .lock()
            .unwrap()
            .keys()
            .map(|name| {
                let mut info = ObjectInfo::bucket(name);
                info.last_modified = Some(jiff::Timestamp::UNIX_EPOCH);
                info
            })
            .collect())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        if buckets.contains_key(bucket) {
            return Err(Error::Conflict(format!("Bucket already exists: {bucket}")));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult> {
        *self.list_calls.lock().unwrap() += 1;

        let buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| Error::NotFound(bucket.to_string()))?;

        let start: usize = options
            .continuation_token
            .as_deref()
            .and_then(|token| token.parse().ok())
            .unwrap_or(0);
        let page_size = self.page_size.max(1);
        let items: Vec<ObjectInfo> = objects
            .iter()
            .skip(start)
            .take(page_size)
            .map(|(key, body)| ObjectInfo::file(key, body.len() as i64))
            .collect();
        let next = start + items.len();
        let truncated = next < objects.len();

        Ok(ListResult {
            items,
            truncated,
            continuation_token: truncated.then(|| next.to_string()),
        })
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Bytes> {
        self.object(&path.bucket, &path.key)
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Bytes,
        _content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(&path.bucket)
            .ok_or_else(|| Error::NotFound(path.bucket.clone()))?;
        let size = data.len() as i64;
        objects.insert(path.key.clone(), data);
        Ok(ObjectInfo::file(&path.key, size))
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(&path.bucket)
            .ok_or_else(|| Error::NotFound(path.bucket.clone()))?;
        objects.remove(&path.key);
        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        path: &RemotePath,
        _content_type: Option<String>,
    ) -> Result<String> {
        if !self.buckets.lock().unwrap().contains_key(&path.bucket) {
            return Err(Error::NotFound(path.bucket.clone()));
        }
        let mut uploads = self.uploads.lock().unwrap();
        let upload_id = format!("upload-{}", uploads.len() + 1);
        uploads.insert(upload_id.clone(), (path.clone(), BTreeMap::new()));
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        let (_, parts) = uploads
            .get_mut(&session.upload_id)
            .ok_or_else(|| Error::NotFound(session.upload_id.clone()))?;
        parts.insert(part_number, body);
        Ok(format!("\"etag-{part_number}\""))
    }

    async fn complete_multipart_upload(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<()> {
        let (target, bodies) = self
            .uploads
            .lock()
            .unwrap()
            .remove(&session.upload_id)
            .ok_or_else(|| Error::NotFound(session.upload_id.clone()))?;

        let mut data = Vec::new();
        for part in parts {
            let body = bodies
                .get(&part.part_number)
                .ok_or_else(|| Error::General(format!("InvalidPart {}", part.part_number)))?;
            data.extend_from_slice(body);
        }
        self.insert(&target.bucket, &target.key, &data);
        Ok(())
    }

    async fn abort_multipart_upload(&self, session: &UploadSession) -> Result<()> {
        self.uploads.lock().unwrap().remove(&session.upload_id);
        Ok(())
    }
}
