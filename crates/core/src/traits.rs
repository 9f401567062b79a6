//! Storage service abstraction
//!
//! `ObjectStore` is the collaborator the transfer engine drives. The S3
//! adapter implements it on top of the AWS SDK; tests substitute mocks.

use async_trait::async_trait;
use bytes::Bytes;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path::RemotePath;

/// Metadata for a bucket or an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key, or the bucket name for bucket listings
    pub key: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

impl ObjectInfo {
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            last_modified: None,
            etag: None,
            content_type: None,
            storage_class: None,
        }
    }

    pub fn bucket(name: impl Into<String>) -> Self {
        Self {
            key: name.into(),
            size_bytes: None,
            last_modified: None,
            etag: None,
            content_type: None,
            storage_class: None,
        }
    }
}

/// Options for a single page of an object listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub max_keys: Option<i32>,
    pub continuation_token: Option<String>,
}

/// One page of an object listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListResult {
    pub items: Vec<ObjectInfo>,
    /// More pages follow
    pub truncated: bool,
    pub continuation_token: Option<String>,
}

/// An initiated multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub target: RemotePath,
    /// Opaque identifier issued by the service
    pub upload_id: String,
}

impl UploadSession {
    pub fn new(target: RemotePath, upload_id: impl Into<String>) -> Self {
        Self {
            target,
            upload_id: upload_id.into(),
        }
    }
}

/// A part the service has acknowledged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// 1-based part number as planned, not as echoed by the service
    pub part_number: i32,
    pub etag: String,
}

/// Object storage operations used by the CLI and the transfer engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>>;

    async fn create_bucket(&self, bucket: &str) -> Result<()>;

    /// Fetch one page of objects; follow `continuation_token` for the rest
    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult>;

    async fn get_object(&self, path: &RemotePath) -> Result<Bytes>;

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Bytes,
        content_type: Option<String>,
    ) -> Result<ObjectInfo>;

    async fn delete_object(&self, path: &RemotePath) -> Result<()>;

    /// Start a multipart upload and return the service's upload id
    async fn create_multipart_upload(
        &self,
        path: &RemotePath,
        content_type: Option<String>,
    ) -> Result<String>;

    /// Upload one part and return its entity tag
    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<String>;

    /// Finish the upload; `parts` must be sorted by ascending part number
    async fn complete_multipart_upload(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<()>;

    async fn abort_multipart_upload(&self, session: &UploadSession) -> Result<()>;
}
