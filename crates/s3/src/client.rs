//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from mineral-core.

use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use bytes::Bytes;
use mineral_core::{
    CompletedPart, ConnectionConfig, Error, ListOptions, ListResult, ObjectInfo, ObjectStore,
    RemotePath, Result, UploadSession,
};

/// S3 client wrapper
///
/// Built once per process and shared by every command through
/// `Arc<dyn ObjectStore>`.
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from connection settings
    ///
    /// Explicit keys are used as static credentials; without them the SDK's
    /// default provider chain applies.
    pub async fn new(connection: &ConnectionConfig) -> Result<Self> {
        connection.validate()?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(connection.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&connection.access_key, &connection.secret_key)
        {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "mineral-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &connection.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(connection.path_style)
            .build();

        tracing::debug!(
            endpoint = connection.endpoint.as_deref().unwrap_or("default"),
            region = %connection.region,
            path_style = connection.path_style,
            "Created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &SdkError<E>) -> String {
        match error {
            SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let meta = service_err.raw();
                let mut msg = format!("Service error: {}", err);
                if let Some(code) = meta.headers().get("x-amz-error-code")
                    && let Ok(code_str) = std::str::from_utf8(code.as_bytes())
                {
                    msg.push_str(&format!(" (code: {})", code_str));
                }
                msg.push_str(&format!(" (status: {})", meta.status().as_u16()));
                msg
            }
            SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {:?}", err)
            }
            SdkError::TimeoutError(_) => "Request timeout".to_string(),
            SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {:?}", err)
            }
            SdkError::ResponseError(err) => {
                format!("Response error: {:?}", err)
            }
            _ => error.to_string(),
        }
    }

    /// Map an SDK failure onto the core error taxonomy
    fn map_sdk_error<E>(error: SdkError<E>, resource: &str) -> Error
    where
        E: ProvideErrorMetadata + std::fmt::Display,
    {
        let code = error.code().map(str::to_string);
        classify(code.as_deref(), Self::format_sdk_error(&error), resource)
    }
}

/// Pick an error kind from the service error code
fn classify(code: Option<&str>, message: String, resource: &str) -> Error {
    match code {
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound" | "NoSuchUpload") => {
            Error::NotFound(resource.to_string())
        }
        Some(
            "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken"
            | "InvalidToken",
        ) => Error::Auth(format!("{resource}: {message}")),
        Some("BucketAlreadyExists" | "BucketAlreadyOwnedByYou") => {
            Error::Conflict(format!("Bucket already exists: {resource}"))
        }
        Some("InvalidBucketName" | "KeyTooLongError") => {
            Error::InvalidPath(format!("{resource}: {message}"))
        }
        _ => Error::Network(message),
    }
}

fn timestamp(dt: &aws_sdk_s3::primitives::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(dt.secs()).ok()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, "buckets"))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| {
                let mut info = ObjectInfo::bucket(b.name().unwrap_or_default());
                info.last_modified = b.creation_date().and_then(timestamp);
                info
            })
            .collect();

        Ok(buckets)
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        self.inner
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, bucket))?;

        Ok(())
    }

    async fn list_objects(&self, bucket: &str, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(bucket);

        if let Some(prefix) = &options.prefix {
            request = request.prefix(prefix);
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, bucket))?;

        let items = response
            .contents()
            .iter()
            .map(|object| {
                let mut info =
                    ObjectInfo::file(object.key().unwrap_or_default(), object.size().unwrap_or(0));
                info.last_modified = object.last_modified().and_then(timestamp);
                info.etag = object.e_tag().map(|etag| etag.trim_matches('"').to_string());
                info.storage_class = object.storage_class().map(|sc| sc.as_str().to_string());
                info
            })
            .collect();

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Bytes> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &path.to_string()))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes();

        Ok(data)
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Bytes,
        content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        let size = data.len() as i64;

        let response = self
            .inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .content_length(size)
            .set_content_type(content_type.clone())
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &path.to_string()))?;

        let mut info = ObjectInfo::file(&path.key, size);
        info.etag = response.e_tag().map(|etag| etag.trim_matches('"').to_string());
        info.content_type = content_type;
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &path.to_string()))?;

        Ok(())
    }

    async fn create_multipart_upload(
        &self,
        path: &RemotePath,
        content_type: Option<String>,
    ) -> Result<String> {
        let response = self
            .inner
            .create_multipart_upload()
            .bucket(&path.bucket)
            .key(&path.key)
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &path.to_string()))?;

        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::General(format!("no upload id returned for {path}")))
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        let length = body.len() as i64;

        let response = self
            .inner
            .upload_part()
            .bucket(&session.target.bucket)
            .key(&session.target.key)
            .upload_id(&session.upload_id)
            .part_number(part_number)
            .content_length(length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &session.target.to_string()))?;

        // Passed back verbatim on completion, quotes included
        response.e_tag().map(str::to_string).ok_or_else(|| {
            Error::General(format!(
                "no entity tag returned for part {part_number} of {}",
                session.target
            ))
        })
    }

    async fn complete_multipart_upload(
        &self,
        session: &UploadSession,
        parts: &[CompletedPart],
    ) -> Result<()> {
        let completed = parts
            .iter()
            .map(|part| {
                S3CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(&part.etag)
                    .build()
            })
            .collect::<Vec<_>>();

        self.inner
            .complete_multipart_upload()
            .bucket(&session.target.bucket)
            .key(&session.target.key)
            .upload_id(&session.upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &session.target.to_string()))?;

        Ok(())
    }

    async fn abort_multipart_upload(&self, session: &UploadSession) -> Result<()> {
        self.inner
            .abort_multipart_upload()
            .bucket(&session.target.bucket)
            .key(&session.target.key)
            .upload_id(&session.upload_id)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, &session.target.to_string()))?;

        Ok(())
    }
}
