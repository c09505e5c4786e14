// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! S3-compatible object store adapter.
//!
//! Wraps the AWS S3 SDK against any S3-compatible endpoint (MinIO in
//! development). Two upload paths: single `PutObject` for small files and
//! multipart for everything above the chunk size. Transient errors are
//! retried inside the SDK with adaptive backoff (three attempts); a
//! missing bucket on write is self-healing — the adapter creates it and
//! retries once.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Delete, ObjectIdentifier};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::upload::PartRecord;

const DELETE_BATCH: usize = 1000;

/// RFC 5987 `attr-char`: ALPHA / DIGIT / "!" / "#" / "$" / "&" / "+" /
/// "-" / "." / "^" / "_" / "`" / "|" / "~". Everything else is escaped.
const RFC5987_ESCAPED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("object store unavailable: {0}")]
    Unavailable(String),

    #[error("object store error: {0}")]
    Backend(String),
}

/// Result of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadResult {
    pub storage_key: String,
    pub size_bytes: i64,
    /// SHA-256 for single-part uploads. Multipart completion surfaces the
    /// ETag as a stand-in; callers needing a true digest must compute it
    /// before upload.
    pub checksum_sha256: String,
    pub content_type: String,
    pub etag: String,
}

/// Metadata from a HEAD request.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub size_bytes: i64,
    pub content_type: String,
    pub etag: String,
}

/// Object store operations used by the file and trash services.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Idempotent: false when the bucket already belongs to us.
    async fn create_bucket(&self, bucket: &str) -> Result<bool, StorageError>;
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;
    /// `force` deletes every object first.
    async fn delete_bucket(&self, bucket: &str, force: bool) -> Result<(), StorageError>;

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<UploadResult, StorageError>;

    async fn start_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<String, StorageError>;

    /// `part_number` ∈ [1, 10000].
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<PartRecord, StorageError>;

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> Result<UploadResult, StorageError>;

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StorageError>;

    async fn download_file(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;

    /// Lazy chunk stream; finite and not restartable. Stops pulling from
    /// the store as soon as the consumer drops the stream.
    async fn download_file_stream(
        &self,
        bucket: &str,
        key: &str,
        chunk_size: usize,
    ) -> Result<std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>, StorageError>;

    async fn generate_presigned_download_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: u64,
        filename: Option<&str>,
    ) -> Result<String, StorageError>;

    async fn generate_presigned_upload_url(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_in: u64,
    ) -> Result<String, StorageError>;

    async fn delete_file(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
    async fn delete_files(&self, bucket: &str, keys: &[String]) -> Result<(), StorageError>;
    async fn copy_file(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<(), StorageError>;
    async fn file_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;
    async fn get_file_info(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StorageError>;
    async fn list_files(&self, bucket: &str, prefix: &str, max_keys: i32) -> Result<Vec<String>, StorageError>;
}

/// Storage key format: `{library_id}/{dir_path}/{filename}_v{version}`,
/// or `{library_id}/{filename}_v{version}` at the root.
pub fn generate_storage_key(library_id: Uuid, directory_path: &str, filename: &str, version: i32) -> String {
    let path = directory_path.trim_matches('/');
    if path.is_empty() {
        format!("{library_id}/{filename}_v{version}")
    } else {
        format!("{library_id}/{path}/{filename}_v{version}")
    }
}

/// SHA-256 hex digest.
pub fn calculate_checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// `Content-Disposition` with an ASCII fallback and the RFC 5987 UTF-8
/// form for non-ASCII filenames.
pub fn content_disposition_for(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let utf8 = utf8_percent_encode(filename, RFC5987_ESCAPED);
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{utf8}")
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub async fn new(endpoint: &str, access_key: &str, secret_key: &str, region: &str) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "static");
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::adaptive().with_max_attempts(3))
            .load()
            .await;

        // MinIO and other self-hosted endpoints need path-style addressing.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
        }
    }
}

fn backend_error<E>(err: &aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    match err {
        aws_sdk_s3::error::SdkError::TimeoutError(_) | aws_sdk_s3::error::SdkError::DispatchFailure(_) => {
            StorageError::Unavailable(format!("{err:?}"))
        }
        other => StorageError::Backend(
            other
                .as_service_error()
                .and_then(|e| e.message().map(str::to_string))
                .unwrap_or_else(|| format!("{other:?}")),
        ),
    }
}

fn error_code<E>(err: &aws_sdk_s3::error::SdkError<E>) -> Option<String>
where
    E: ProvideErrorMetadata + std::fmt::Debug,
{
    err.as_service_error().and_then(|e| e.code().map(str::to_string))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!(bucket, "bucket created");
                Ok(true)
            }
            Err(err) => match error_code(&err).as_deref() {
                Some("BucketAlreadyOwnedByYou") | Some("BucketAlreadyExists") => {
                    debug!(bucket, "bucket exists");
                    Ok(false)
                }
                _ => Err(backend_error(&err)),
            },
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    async fn delete_bucket(&self, bucket: &str, force: bool) -> Result<(), StorageError> {
        if force {
            loop {
                let listing = self
                    .client
                    .list_objects_v2()
                    .bucket(bucket)
                    .max_keys(DELETE_BATCH as i32)
                    .send()
                    .await
                    .map_err(|e| backend_error(&e))?;

                let keys: Vec<String> = listing
                    .contents()
                    .iter()
                    .filter_map(|o| o.key().map(str::to_string))
                    .collect();
                if keys.is_empty() {
                    break;
                }
                self.delete_files(bucket, &keys).await?;
            }
        }

        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;
        info!(bucket, "bucket deleted");
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<UploadResult, StorageError> {
        let checksum = calculate_checksum(&data);
        let size = data.len() as i64;

        let put = |data: Bytes| {
            let mut request = self
                .client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(data))
                .content_type(content_type);
            if let Some(metadata) = &metadata {
                request = request.set_metadata(Some(metadata.clone()));
            }
            request.send()
        };

        let response = match put(data.clone()).await {
            Ok(response) => response,
            Err(err) if error_code(&err).as_deref() == Some("NoSuchBucket") => {
                // Self-healing: create the bucket and retry once.
                info!(bucket, "bucket missing, creating");
                self.create_bucket(bucket).await?;
                put(data).await.map_err(|e| backend_error(&e))?
            }
            Err(err) => return Err(backend_error(&err)),
        };

        info!(bucket, key, size, content_type, "file uploaded");

        Ok(UploadResult {
            storage_key: key.to_string(),
            size_bytes: size,
            checksum_sha256: checksum,
            content_type: content_type.to_string(),
            etag: response.e_tag().unwrap_or_default().trim_matches('"').to_string(),
        })
    }

    async fn start_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        metadata: Option<HashMap<String, String>>,
    ) -> Result<String, StorageError> {
        let create = || {
            let mut request = self
                .client
                .create_multipart_upload()
                .bucket(bucket)
                .key(key)
                .content_type(content_type);
            if let Some(metadata) = &metadata {
                request = request.set_metadata(Some(metadata.clone()));
            }
            request.send()
        };

        let response = match create().await {
            Ok(response) => response,
            Err(err) if error_code(&err).as_deref() == Some("NoSuchBucket") => {
                info!(bucket, "bucket missing, creating");
                self.create_bucket(bucket).await?;
                create().await.map_err(|e| backend_error(&e))?
            }
            Err(err) => return Err(backend_error(&err)),
        };

        let upload_id = response
            .upload_id()
            .ok_or_else(|| StorageError::Backend("multipart upload id missing".into()))?
            .to_string();

        info!(bucket, key, upload_id, "multipart upload started");
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<PartRecord, StorageError> {
        if !(1..=10_000).contains(&part_number) {
            return Err(StorageError::InvalidKey(format!(
                "part number {part_number} out of range 1..=10000"
            )));
        }

        let size = data.len() as u64;
        let response = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| backend_error(&e))?;

        debug!(upload_id, part_number, size, "multipart part uploaded");

        Ok(PartRecord {
            part_number,
            etag: response.e_tag().unwrap_or_default().trim_matches('"').to_string(),
            size_bytes: size,
        })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> Result<UploadResult, StorageError> {
        if parts.is_empty() {
            return Err(StorageError::InvalidKey("no parts provided for completion".into()));
        }

        let mut sorted: Vec<&PartRecord> = parts.iter().collect();
        sorted.sort_by_key(|p| p.part_number);

        let completed_parts: Vec<CompletedPart> = sorted
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number)
                    .e_tag(&p.etag)
                    .build()
            })
            .collect();

        let response = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| backend_error(&e))?;

        // The true object size comes from a HEAD after completion.
        let head = self.get_file_info(bucket, key).await?;
        let etag = response.e_tag().unwrap_or_default().trim_matches('"').to_string();

        info!(bucket, key, upload_id, size = head.size_bytes, "multipart upload completed");

        Ok(UploadResult {
            storage_key: key.to_string(),
            size_bytes: head.size_bytes,
            checksum_sha256: etag.clone(),
            content_type: head.content_type,
            etag,
        })
    }

    async fn abort_multipart_upload(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StorageError> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;
        info!(bucket, key, upload_id, "multipart upload aborted");
        Ok(())
    }

    async fn download_file(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match error_code(&err).as_deref() {
                Some("NoSuchKey") => StorageError::NotFound(format!("{bucket}/{key}")),
                _ => backend_error(&err),
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(data.into_bytes())
    }

    async fn download_file_stream(
        &self,
        bucket: &str,
        key: &str,
        chunk_size: usize,
    ) -> Result<std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| match error_code(&err).as_deref() {
                Some("NoSuchKey") => StorageError::NotFound(format!("{bucket}/{key}")),
                _ => backend_error(&err),
            })?;

        let mut body = response.body;
        let stream = async_stream::try_stream! {
            let mut buffer = BytesMut::new();
            while let Some(bytes) = body
                .try_next()
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?
            {
                buffer.extend_from_slice(&bytes);
                while buffer.len() >= chunk_size {
                    yield buffer.split_to(chunk_size).freeze();
                }
            }
            if !buffer.is_empty() {
                yield buffer.freeze();
            }
        };

        Ok(Box::pin(stream))
    }

    async fn generate_presigned_download_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: u64,
        filename: Option<&str>,
    ) -> Result<String, StorageError> {
        let config = PresigningConfig::expires_in(Duration::from_secs(expires_in))
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut request = self.client.get_object().bucket(bucket).key(key);
        if let Some(filename) = filename {
            request = request.response_content_disposition(content_disposition_for(filename));
        }

        let presigned = request
            .presigned(config)
            .await
            .map_err(|e| backend_error(&e))?;
        Ok(presigned.uri().to_string())
    }

    async fn generate_presigned_upload_url(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_in: u64,
    ) -> Result<String, StorageError> {
        let config = PresigningConfig::expires_in(Duration::from_secs(expires_in))
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let presigned = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .presigned(config)
            .await
            .map_err(|e| backend_error(&e))?;
        Ok(presigned.uri().to_string())
    }

    async fn delete_file(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;
        info!(bucket, key, "file deleted");
        Ok(())
    }

    async fn delete_files(&self, bucket: &str, keys: &[String]) -> Result<(), StorageError> {
        for batch in keys.chunks(DELETE_BATCH) {
            let objects: Result<Vec<ObjectIdentifier>, _> = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect();
            let objects = objects.map_err(|e| StorageError::Backend(e.to_string()))?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(|e| StorageError::Backend(e.to_string()))?;

            self.client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| backend_error(&e))?;
        }
        info!(bucket, count = keys.len(), "files deleted");
        Ok(())
    }

    async fn copy_file(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<(), StorageError> {
        self.client
            .copy_object()
            .bucket(dest_bucket)
            .key(dest_key)
            .copy_source(format!("{source_bucket}/{source_key}"))
            .send()
            .await
            .map_err(|e| backend_error(&e))?;
        info!(
            source = format!("{source_bucket}/{source_key}"),
            dest = format!("{dest_bucket}/{dest_key}"),
            "file copied"
        );
        Ok(())
    }

    async fn file_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(false)
                } else {
                    Err(backend_error(&err))
                }
            }
        }
    }

    async fn get_file_info(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StorageError> {
        let response = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    StorageError::NotFound(format!("{bucket}/{key}"))
                } else {
                    backend_error(&err)
                }
            })?;

        Ok(ObjectInfo {
            size_bytes: response.content_length().unwrap_or(0),
            content_type: response
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string(),
            etag: response.e_tag().unwrap_or_default().trim_matches('"').to_string(),
        })
    }

    async fn list_files(&self, bucket: &str, prefix: &str, max_keys: i32) -> Result<Vec<String>, StorageError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| backend_error(&e))?;

        Ok(response
            .contents()
            .iter()
            .filter_map(|o| o.key().map(str::to_string))
            .collect())
    }
}

// ============================================================================
// In-memory implementation (development and testing)
// ============================================================================

/// In-memory [`ObjectStore`] mirroring the S3 adapter's observable
/// behavior, including multipart assembly and missing-bucket self-healing.
#[derive(Default)]
pub struct MemoryObjectStore {
    buckets: dashmap::DashMap<String, HashMap<String, (Bytes, String)>>,
    multipart: dashmap::DashMap<String, (String, String, Vec<(i32, Bytes)>)>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn create_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        if self.buckets.contains_key(bucket) {
            return Ok(false);
        }
        self.buckets.insert(bucket.to_string(), HashMap::new());
        Ok(true)
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.contains_key(bucket))
    }

    async fn delete_bucket(&self, bucket: &str, force: bool) -> Result<(), StorageError> {
        if let Some(objects) = self.buckets.get(bucket) {
            if !objects.is_empty() && !force {
                return Err(StorageError::Backend("bucket not empty".into()));
            }
        }
        self.buckets
            .remove(bucket)
            .ok_or_else(|| StorageError::NotFound(bucket.to_string()))?;
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
        _metadata: Option<HashMap<String, String>>,
    ) -> Result<UploadResult, StorageError> {
        let checksum = calculate_checksum(&data);
        let size = data.len() as i64;
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(UploadResult {
            storage_key: key.to_string(),
            size_bytes: size,
            checksum_sha256: checksum.clone(),
            content_type: content_type.to_string(),
            etag: checksum,
        })
    }

    async fn start_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        _metadata: Option<HashMap<String, String>>,
    ) -> Result<String, StorageError> {
        let upload_id = Uuid::new_v4().to_string();
        self.multipart.insert(
            upload_id.clone(),
            (bucket.to_string(), key.to_string(), Vec::new()),
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<PartRecord, StorageError> {
        if !(1..=10_000).contains(&part_number) {
            return Err(StorageError::InvalidKey(format!(
                "part number {part_number} out of range 1..=10000"
            )));
        }
        let etag = calculate_checksum(&data);
        let size = data.len() as u64;
        let mut entry = self
            .multipart
            .get_mut(upload_id)
            .ok_or_else(|| StorageError::NotFound(format!("upload {upload_id}")))?;
        entry.2.push((part_number, data));
        Ok(PartRecord {
            part_number,
            etag,
            size_bytes: size,
        })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[PartRecord],
    ) -> Result<UploadResult, StorageError> {
        if parts.is_empty() {
            return Err(StorageError::InvalidKey("no parts provided for completion".into()));
        }
        let (_, _, mut stored) = self
            .multipart
            .remove(upload_id)
            .map(|(_, v)| v)
            .ok_or_else(|| StorageError::NotFound(format!("upload {upload_id}")))?;
        stored.sort_by_key(|(n, _)| *n);

        let mut assembled = BytesMut::new();
        for (_, data) in stored {
            assembled.extend_from_slice(&data);
        }
        let data = assembled.freeze();
        let etag = calculate_checksum(&data);
        let size = data.len() as i64;
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), (data, "application/octet-stream".to_string()));

        Ok(UploadResult {
            storage_key: key.to_string(),
            size_bytes: size,
            checksum_sha256: etag.clone(),
            content_type: "application/octet-stream".to_string(),
            etag,
        })
    }

    async fn abort_multipart_upload(&self, _bucket: &str, _key: &str, upload_id: &str) -> Result<(), StorageError> {
        self.multipart.remove(upload_id);
        Ok(())
    }

    async fn download_file(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        self.buckets
            .get(bucket)
            .and_then(|objects| objects.get(key).map(|(data, _)| data.clone()))
            .ok_or_else(|| StorageError::NotFound(format!("{bucket}/{key}")))
    }

    async fn download_file_stream(
        &self,
        bucket: &str,
        key: &str,
        chunk_size: usize,
    ) -> Result<std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>, StorageError> {
        let data = self.download_file(bucket, key).await?;
        let chunks: Vec<Result<Bytes, StorageError>> = data
            .chunks(chunk_size.max(1))
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn generate_presigned_download_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: u64,
        _filename: Option<&str>,
    ) -> Result<String, StorageError> {
        Ok(format!("memory://{bucket}/{key}?expires={expires_in}"))
    }

    async fn generate_presigned_upload_url(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        expires_in: u64,
    ) -> Result<String, StorageError> {
        Ok(format!("memory://{bucket}/{key}?upload&expires={expires_in}"))
    }

    async fn delete_file(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        if let Some(mut objects) = self.buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn delete_files(&self, bucket: &str, keys: &[String]) -> Result<(), StorageError> {
        if let Some(mut objects) = self.buckets.get_mut(bucket) {
            for key in keys {
                objects.remove(key);
            }
        }
        Ok(())
    }

    async fn copy_file(
        &self,
        source_bucket: &str,
        source_key: &str,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<(), StorageError> {
        let data = self.download_file(source_bucket, source_key).await?;
        self.buckets
            .entry(dest_bucket.to_string())
            .or_default()
            .insert(dest_key.to_string(), (data, "application/octet-stream".to_string()));
        Ok(())
    }

    async fn file_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self
            .buckets
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    async fn get_file_info(&self, bucket: &str, key: &str) -> Result<ObjectInfo, StorageError> {
        let entry = self
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key).map(|(d, ct)| (d.clone(), ct.clone())))
            .ok_or_else(|| StorageError::NotFound(format!("{bucket}/{key}")))?;
        Ok(ObjectInfo {
            size_bytes: entry.0.len() as i64,
            content_type: entry.1,
            etag: calculate_checksum(&entry.0),
        })
    }

    async fn list_files(&self, bucket: &str, prefix: &str, max_keys: i32) -> Result<Vec<String>, StorageError> {
        Ok(self
            .buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .take(max_keys.max(0) as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_format_nested() {
        let id = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
        assert_eq!(
            generate_storage_key(id, "/reports/2026", "q1.pdf", 3),
            format!("{id}/reports/2026/q1.pdf_v3")
        );
    }

    #[test]
    fn storage_key_format_root() {
        let id = Uuid::new_v4();
        assert_eq!(generate_storage_key(id, "/", "a.txt", 1), format!("{id}/a.txt_v1"));
        assert_eq!(generate_storage_key(id, "", "a.txt", 1), format!("{id}/a.txt_v1"));
    }

    #[test]
    fn checksum_of_empty_input() {
        assert_eq!(
            calculate_checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn content_disposition_ascii_only() {
        let cd = content_disposition_for("report.pdf");
        assert_eq!(cd, "attachment; filename=\"report.pdf\"; filename*=UTF-8''report.pdf");
    }

    #[test]
    fn content_disposition_non_ascii_has_both_forms() {
        let cd = content_disposition_for("résumé 2026.pdf");
        // ASCII fallback replaces non-ASCII characters.
        assert!(cd.contains("filename=\"r_sum_ 2026.pdf\""));
        // RFC 5987 form percent-encodes UTF-8 bytes.
        assert!(cd.contains("filename*=UTF-8''r%C3%A9sum%C3%A9%202026.pdf"));
    }

    #[test]
    fn content_disposition_escapes_quotes_in_fallback() {
        let cd = content_disposition_for("a\"b.txt");
        assert!(cd.contains("filename=\"a_b.txt\""));
    }
}
