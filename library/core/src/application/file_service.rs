// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! File operations and the upload state machine.
//!
//! Uploads are driven by `init → part* → complete`. `init` performs size
//! and duplicate checks and registers an upload record holding everything
//! completion needs; parts either stream to the object store (multipart)
//! or buffer in the record (single-part); `complete` commits the metadata
//! in one transaction, invalidates caches, emits the realtime event, and
//! best-effort enqueues indexing. The registry is process-local — callers
//! restart interrupted uploads from `init`.

use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use futures::Stream;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::audit::actions;
use crate::domain::directory::join_path;
use crate::domain::events::library_channel;
use crate::domain::file::{unique_filename, validate_filename, FileMetadata, FileVersion};
use crate::domain::identity::RequestContext;
use crate::domain::library::Library;
use crate::domain::repository::{DirectoryRepository, FileRepository, LibraryRepository};
use crate::domain::upload::{OnDuplicate, PartRecord, PendingUpload};
use crate::error::ServiceError;
use crate::infrastructure::cache::EntityCache;
use crate::infrastructure::event_bus::RealtimeBus;
use crate::infrastructure::object_store::{
    content_disposition_for, generate_storage_key, ObjectStore, StorageError,
};
use super::audit_service::AuditService;
use super::indexing::IndexingService;

#[derive(Debug, Clone)]
pub struct InitUploadRequest {
    pub library_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub directory_id: Option<Uuid>,
    pub on_duplicate: OnDuplicate,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadInitResponse {
    pub upload_id: String,
    pub file_id: Uuid,
    /// Resolved filename; differs from the request under `rename`.
    pub filename: String,
    pub chunk_size: u64,
    pub total_chunks: u64,
}

/// Outcome of `init`: either the upload started, or — under
/// `on_duplicate = ask` — a typed conflict carrying the existing file and
/// a proposed unique name.
#[derive(Debug)]
pub enum InitUploadOutcome {
    Started(UploadInitResponse),
    DuplicateConflict {
        existing: FileMetadata,
        suggested_name: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadPartResponse {
    pub part_number: i32,
    pub etag: String,
    pub size_bytes: u64,
}

/// Number of parts an upload of `size_bytes` needs at `chunk_size`.
/// Zero-byte files are legal and travel the single-chunk path.
pub fn total_chunks_for(size_bytes: i64, chunk_size: u64) -> u64 {
    if size_bytes <= 0 {
        return 1;
    }
    (size_bytes as u64).div_ceil(chunk_size)
}

pub struct FileService {
    files: Arc<dyn FileRepository>,
    directories: Arc<dyn DirectoryRepository>,
    libraries: Arc<dyn LibraryRepository>,
    storage: Arc<dyn ObjectStore>,
    cache: EntityCache,
    bus: Arc<RealtimeBus>,
    audit: Arc<AuditService>,
    indexer: Arc<IndexingService>,
    uploads: DashMap<String, PendingUpload>,
    chunk_size: u64,
    max_file_size: u64,
    presigned_url_expiry: u64,
}

impl FileService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: Arc<dyn FileRepository>,
        directories: Arc<dyn DirectoryRepository>,
        libraries: Arc<dyn LibraryRepository>,
        storage: Arc<dyn ObjectStore>,
        cache: EntityCache,
        bus: Arc<RealtimeBus>,
        audit: Arc<AuditService>,
        indexer: Arc<IndexingService>,
        chunk_size: u64,
        max_file_size: u64,
        presigned_url_expiry: u64,
    ) -> Self {
        Self {
            files,
            directories,
            libraries,
            storage,
            cache,
            bus,
            audit,
            indexer,
            uploads: DashMap::new(),
            chunk_size,
            max_file_size,
            presigned_url_expiry,
        }
    }

    async fn library_for(&self, ctx: &RequestContext, library_id: Uuid) -> Result<Library, ServiceError> {
        let library = self
            .libraries
            .find_by_id(library_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("library".into()))?;
        if library.owner_id != ctx.user.user_id && !ctx.user.is_admin() {
            return Err(ServiceError::Forbidden("access denied".into()));
        }
        Ok(library)
    }

    async fn file_with_library(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
    ) -> Result<(FileMetadata, Library), ServiceError> {
        let file = self
            .files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("file".into()))?;
        let library = self.library_for(ctx, file.library_id).await?;
        Ok((file, library))
    }

    // ------------------------------------------------------------------
    // Upload state machine
    // ------------------------------------------------------------------

    pub async fn init_upload(
        &self,
        ctx: &RequestContext,
        request: InitUploadRequest,
    ) -> Result<InitUploadOutcome, ServiceError> {
        validate_filename(&request.filename).map_err(ServiceError::Validation)?;
        if request.size_bytes < 0 {
            return Err(ServiceError::Validation("size_bytes must be non-negative".into()));
        }

        let library = self.library_for(ctx, request.library_id).await?;

        let max_size = library
            .max_file_size_bytes
            .map(|s| s as u64)
            .unwrap_or(self.max_file_size);
        if request.size_bytes as u64 > max_size {
            return Err(ServiceError::LimitExceeded {
                message: format!("file size exceeds limit of {max_size} bytes"),
                remaining: None,
            });
        }

        let dir_path = match request.directory_id {
            None => "/".to_string(),
            Some(directory_id) => self
                .directories
                .find_by_id(request.library_id, directory_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("directory".into()))?
                .full_path(),
        };

        let existing = self
            .files
            .find_by_name(request.library_id, request.directory_id, &request.filename)
            .await?;

        let mut filename = request.filename.clone();
        let mut existing_file_id = None;
        let mut target_version = 1;

        if let Some(existing) = existing {
            match request.on_duplicate {
                OnDuplicate::Ask => {
                    let suggested_name = unique_filename(&filename, Utc::now().timestamp());
                    return Ok(InitUploadOutcome::DuplicateConflict {
                        existing,
                        suggested_name,
                    });
                }
                OnDuplicate::Overwrite => {
                    target_version = existing.current_version + 1;
                    existing_file_id = Some(existing.id);
                }
                OnDuplicate::Rename => {
                    filename = unique_filename(&filename, Utc::now().timestamp());
                }
            }
        }

        let file_id = Uuid::new_v4();
        let storage_key = generate_storage_key(request.library_id, &dir_path, &filename, target_version);
        let total_chunks = total_chunks_for(request.size_bytes, self.chunk_size);
        let multipart = total_chunks > 1;

        let upload_id = if multipart {
            self.storage
                .start_multipart_upload(&library.bucket_name, &storage_key, &request.content_type, None)
                .await?
        } else {
            Uuid::new_v4().to_string()
        };

        self.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                upload_id: upload_id.clone(),
                file_id,
                library_id: request.library_id,
                directory_id: request.directory_id,
                filename: filename.clone(),
                content_type: request.content_type,
                size_bytes: request.size_bytes,
                storage_key,
                bucket: library.bucket_name,
                user_id: ctx.user.user_id,
                dir_path,
                existing_file_id,
                multipart,
                parts: Vec::new(),
                data: None,
                created_at: Utc::now(),
            },
        );

        Ok(InitUploadOutcome::Started(UploadInitResponse {
            upload_id,
            file_id,
            filename,
            chunk_size: self.chunk_size,
            total_chunks,
        }))
    }

    pub async fn upload_part(
        &self,
        upload_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> Result<UploadPartResponse, ServiceError> {
        if !(1..=10_000).contains(&part_number) {
            return Err(ServiceError::Validation(format!(
                "part number {part_number} out of range 1..=10000"
            )));
        }

        // Snapshot what the storage call needs, then release the map entry
        // so the (slow) part upload runs without holding a shard lock.
        let (multipart, bucket, key) = {
            let record = self
                .uploads
                .get(upload_id)
                .ok_or_else(|| ServiceError::NotFound("upload (may have expired)".into()))?;
            (record.multipart, record.bucket.clone(), record.storage_key.clone())
        };

        if multipart {
            let part = self
                .storage
                .upload_part(&bucket, &key, upload_id, part_number, data)
                .await?;

            let response = UploadPartResponse {
                part_number: part.part_number,
                etag: part.etag.clone(),
                size_bytes: part.size_bytes,
            };

            match self.uploads.get_mut(upload_id) {
                Some(mut record) => record.parts.push(part),
                None => return Err(ServiceError::NotFound("upload (may have expired)".into())),
            }
            Ok(response)
        } else {
            let size = data.len() as u64;
            match self.uploads.get_mut(upload_id) {
                Some(mut record) => record.data = Some(data),
                None => return Err(ServiceError::NotFound("upload (may have expired)".into())),
            }
            Ok(UploadPartResponse {
                part_number: 1,
                etag: "pending".into(),
                size_bytes: size,
            })
        }
    }

    pub async fn complete_upload(
        &self,
        ctx: &RequestContext,
        upload_id: &str,
        parts_override: Option<Vec<PartRecord>>,
        client_checksum: Option<String>,
    ) -> Result<(FileMetadata, FileVersion), ServiceError> {
        // The record is consumed either way: a failed completion requires a
        // fresh init.
        let (_, record) = self
            .uploads
            .remove(upload_id)
            .ok_or_else(|| ServiceError::NotFound("upload (may have expired)".into()))?;

        let (size, checksum) = if record.multipart {
            let parts = parts_override.unwrap_or_else(|| record.parts.clone());
            let result = self
                .storage
                .complete_multipart_upload(&record.bucket, &record.storage_key, upload_id, &parts)
                .await?;
            // The store surfaces an ETag, not a content digest; trust a
            // client-supplied SHA-256 when one was sent with completion.
            let checksum = client_checksum.unwrap_or(result.checksum_sha256);
            (result.size_bytes, checksum)
        } else {
            let data = record
                .data
                .clone()
                .ok_or_else(|| ServiceError::Validation("no data uploaded".into()))?;
            let result = self
                .storage
                .upload_file(&record.bucket, &record.storage_key, data, &record.content_type, None)
                .await?;
            if let Some(client) = &client_checksum {
                if *client != result.checksum_sha256 {
                    warn!(
                        upload_id,
                        expected = %client,
                        actual = %result.checksum_sha256,
                        "checksum mismatch"
                    );
                }
            }
            (result.size_bytes, result.checksum_sha256)
        };

        let (file, version) = match record.existing_file_id {
            Some(existing_id) => {
                self.files
                    .commit_overwrite(existing_id, size, &checksum, &record.storage_key, record.user_id, None)
                    .await?
            }
            None => {
                let now = Utc::now();
                let file = FileMetadata {
                    id: record.file_id,
                    library_id: record.library_id,
                    directory_id: record.directory_id,
                    filename: record.filename.clone(),
                    path: record.dir_path.clone(),
                    size_bytes: size,
                    checksum_sha256: checksum.clone(),
                    content_type: record.content_type.clone(),
                    storage_key: record.storage_key.clone(),
                    current_version: 1,
                    created_by: record.user_id,
                    modified_by: record.user_id,
                    is_deleted: false,
                    deleted_at: None,
                    deleted_by: None,
                    created_at: now,
                    updated_at: now,
                };
                let version = FileVersion::new(
                    file.id,
                    1,
                    size,
                    checksum,
                    record.storage_key.clone(),
                    record.user_id,
                    None,
                );
                self.files.commit_new_file(&file, &version).await?;
                (file, version)
            }
        };

        self.cache.invalidate_file(file.id, file.library_id);

        self.bus.publish(
            &library_channel(file.library_id),
            "file_uploaded",
            json!({
                "file_id": file.id,
                "filename": file.filename,
                "path": file.full_path(),
                "size_bytes": file.size_bytes,
                "version": file.current_version,
            }),
        );

        self.audit
            .log_user_action(
                ctx,
                actions::FILE_UPLOAD,
                "file",
                file.id,
                Some(file.library_id),
                json!({
                    "filename": file.filename,
                    "size_bytes": file.size_bytes,
                    "version": file.current_version,
                }),
            )
            .await;

        // Indexing is best-effort and outside the upload's transaction.
        let indexer = self.indexer.clone();
        let file_id = file.id;
        tokio::spawn(async move {
            if let Err(e) = indexer.index_file(file_id).await {
                warn!(%file_id, error = %e, "indexing enqueue failed");
            }
        });

        Ok((file, version))
    }

    /// Idempotent: an unknown upload id is already aborted.
    pub async fn abort_upload(&self, upload_id: &str) -> Result<(), ServiceError> {
        let Some((_, record)) = self.uploads.remove(upload_id) else {
            return Ok(());
        };
        if record.multipart {
            if let Err(e) = self
                .storage
                .abort_multipart_upload(&record.bucket, &record.storage_key, upload_id)
                .await
            {
                warn!(upload_id, error = %e, "multipart abort failed");
            }
        }
        Ok(())
    }

    /// Garbage-collect upload registrations older than `max_age_seconds`,
    /// aborting any server-side multipart state. Returns the number swept.
    pub async fn sweep_stale_uploads(&self, max_age_seconds: u64) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(max_age_seconds as i64);
        let stale: Vec<String> = self
            .uploads
            .iter()
            .filter(|entry| entry.created_at < cutoff)
            .map(|entry| entry.upload_id.clone())
            .collect();

        for upload_id in &stale {
            if let Err(e) = self.abort_upload(upload_id).await {
                warn!(upload_id, error = %e, "stale upload abort failed");
            }
        }
        stale.len()
    }

    pub fn pending_upload_count(&self) -> usize {
        self.uploads.len()
    }

    // ------------------------------------------------------------------
    // Read paths
    // ------------------------------------------------------------------

    pub async fn get_file(&self, ctx: &RequestContext, file_id: Uuid) -> Result<FileMetadata, ServiceError> {
        let key = self.cache.file_key(file_id);
        if let Some(file) = self.cache.get::<FileMetadata>(&key) {
            self.library_for(ctx, file.library_id).await?;
            return Ok(file);
        }

        let (file, _) = self.file_with_library(ctx, file_id).await?;
        self.cache.set(&key, &file);
        Ok(file)
    }

    pub async fn download_url(&self, ctx: &RequestContext, file_id: Uuid) -> Result<String, ServiceError> {
        let (file, library) = self.file_with_library(ctx, file_id).await?;
        Ok(self
            .storage
            .generate_presigned_download_url(
                &library.bucket_name,
                &file.storage_key,
                self.presigned_url_expiry,
                Some(&file.filename),
            )
            .await?)
    }

    /// Streaming download. Returns the metadata, the Content-Disposition
    /// value (ASCII fallback + RFC 5987 UTF-8 form), and a lazy byte
    /// stream that stops pulling when dropped.
    pub async fn download_stream(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        chunk_size: usize,
    ) -> Result<
        (
            FileMetadata,
            String,
            std::pin::Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>,
        ),
        ServiceError,
    > {
        let (file, library) = self.file_with_library(ctx, file_id).await?;
        let stream = self
            .storage
            .download_file_stream(&library.bucket_name, &file.storage_key, chunk_size)
            .await?;

        self.audit
            .log_user_action(
                ctx,
                actions::FILE_DOWNLOAD,
                "file",
                file.id,
                Some(file.library_id),
                json!({ "filename": file.filename }),
            )
            .await;

        let disposition = content_disposition_for(&file.filename);
        Ok((file, disposition, stream))
    }

    pub async fn versions(&self, ctx: &RequestContext, file_id: Uuid) -> Result<Vec<FileVersion>, ServiceError> {
        let (file, _) = self.file_with_library(ctx, file_id).await?;
        Ok(self.files.versions(file.id).await?)
    }

    pub async fn search(
        &self,
        ctx: &RequestContext,
        library_id: Uuid,
        query: &str,
        limit: i64,
    ) -> Result<Vec<FileMetadata>, ServiceError> {
        self.library_for(ctx, library_id).await?;
        Ok(self.files.search_by_name(library_id, query, limit).await?)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub async fn rename_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        new_filename: &str,
    ) -> Result<FileMetadata, ServiceError> {
        validate_filename(new_filename).map_err(ServiceError::Validation)?;
        let (file, _) = self.file_with_library(ctx, file_id).await?;

        if let Some(dup) = self
            .files
            .find_by_name(file.library_id, file.directory_id, new_filename)
            .await?
        {
            if dup.id != file.id {
                return Err(ServiceError::conflict("a file with this name already exists"));
            }
        }

        let old_name = file.filename.clone();
        let renamed = self.files.rename(file_id, new_filename, ctx.user.user_id).await?;
        self.cache.invalidate_file(file_id, renamed.library_id);

        self.bus.publish(
            &library_channel(renamed.library_id),
            "file_renamed",
            json!({ "file_id": file_id, "old_name": old_name, "new_name": new_filename }),
        );
        self.audit
            .log_user_action(
                ctx,
                actions::FILE_RENAME,
                "file",
                file_id,
                Some(renamed.library_id),
                json!({ "old_name": old_name, "new_name": new_filename }),
            )
            .await;

        Ok(renamed)
    }

    pub async fn move_file(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        new_directory_id: Option<Uuid>,
    ) -> Result<FileMetadata, ServiceError> {
        let (file, _) = self.file_with_library(ctx, file_id).await?;

        let new_path = match new_directory_id {
            None => "/".to_string(),
            Some(directory_id) => self
                .directories
                .find_by_id(file.library_id, directory_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("target directory".into()))?
                .full_path(),
        };

        if let Some(dup) = self
            .files
            .find_by_name(file.library_id, new_directory_id, &file.filename)
            .await?
        {
            if dup.id != file.id {
                return Err(ServiceError::conflict(
                    "a file with this name already exists in the target directory",
                ));
            }
        }

        let old_path = file.full_path();
        let moved = self
            .files
            .move_to(file_id, new_directory_id, &new_path, ctx.user.user_id)
            .await?;
        self.cache.invalidate_file(file_id, moved.library_id);

        self.bus.publish(
            &library_channel(moved.library_id),
            "file_moved",
            json!({ "file_id": file_id, "old_path": old_path, "new_path": moved.full_path() }),
        );
        self.audit
            .log_user_action(
                ctx,
                actions::FILE_MOVE,
                "file",
                file_id,
                Some(moved.library_id),
                json!({ "old_path": old_path, "new_path": moved.full_path() }),
            )
            .await;

        Ok(moved)
    }

    /// Soft delete. De-indexing is best-effort and never blocks the
    /// delete.
    pub async fn delete_file(&self, ctx: &RequestContext, file_id: Uuid) -> Result<(), ServiceError> {
        let (file, _) = self.file_with_library(ctx, file_id).await?;

        self.files.soft_delete(file_id, ctx.user.user_id, Utc::now()).await?;
        self.cache.invalidate_file(file_id, file.library_id);

        self.bus.publish(
            &library_channel(file.library_id),
            "file_deleted",
            json!({ "file_id": file_id, "filename": file.filename }),
        );
        self.audit
            .log_user_action(
                ctx,
                actions::FILE_DELETE,
                "file",
                file_id,
                Some(file.library_id),
                json!({ "filename": file.filename, "path": file.full_path() }),
            )
            .await;

        let indexer = self.indexer.clone();
        let library_id = file.library_id;
        tokio::spawn(async move {
            if let Err(e) = indexer.deindex_file(file_id, library_id).await {
                warn!(%file_id, error = %e, "deindex enqueue failed");
            }
        });

        Ok(())
    }

    /// Destination path a file would get in `directory_path`; exposed for
    /// browse responses.
    pub fn path_in(directory_path: &str, filename: &str) -> String {
        join_path(directory_path, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB5: u64 = 5 * 1024 * 1024;

    #[test]
    fn zero_byte_file_is_single_chunk() {
        assert_eq!(total_chunks_for(0, MIB5), 1);
    }

    #[test]
    fn exactly_chunk_size_is_single_part() {
        assert_eq!(total_chunks_for(MIB5 as i64, MIB5), 1);
    }

    #[test]
    fn chunk_size_plus_one_is_two_parts() {
        assert_eq!(total_chunks_for(MIB5 as i64 + 1, MIB5), 2);
    }

    #[test]
    fn large_file_part_count() {
        assert_eq!(total_chunks_for((MIB5 * 10) as i64, MIB5), 10);
        assert_eq!(total_chunks_for((MIB5 * 10) as i64 + 1, MIB5), 11);
    }
}
