// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository traits over the metadata store.
//!
//! All `find_*` methods exclude soft-deleted rows unless the name says
//! otherwise. Operations that must be atomic (upload commit, rename/move
//! with path cascade, soft-delete cascade) are single methods so each
//! implementation can wrap them in one database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::audit::AuditEvent;
use super::directory::Directory;
use super::file::{FileMetadata, FileVersion};
use super::library::Library;
use super::notification::Notification;
use super::share::ShareLink;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait LibraryRepository: Send + Sync {
    async fn insert(&self, library: &Library) -> RepoResult<()>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Library>>;
    /// Includes soft-deleted rows; used by trash and purge paths.
    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<Library>>;
    async fn list_non_deleted(&self) -> RepoResult<Vec<Library>>;
    async fn list_for_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Library>>;
    async fn update(&self, library: &Library) -> RepoResult<()>;
    async fn soft_delete(&self, id: Uuid, actor: Uuid, at: DateTime<Utc>) -> RepoResult<()>;
    async fn hard_delete(&self, id: Uuid) -> RepoResult<()>;
    /// (file count, directory count, total size) of non-deleted content.
    async fn stats(&self, id: Uuid) -> RepoResult<(i64, i64, i64)>;
}

#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn insert(&self, directory: &Directory) -> RepoResult<()>;
    async fn find_by_id(&self, library_id: Uuid, id: Uuid) -> RepoResult<Option<Directory>>;
    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<Directory>>;
    async fn find_child_by_name(
        &self,
        library_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> RepoResult<Option<Directory>>;
    async fn list_children(&self, library_id: Uuid, parent_id: Option<Uuid>) -> RepoResult<Vec<Directory>>;

    /// Rename and rewrite `path` on every descendant directory and file,
    /// in one transaction. Returns the updated directory.
    async fn rename(&self, id: Uuid, new_name: &str, actor: Uuid) -> RepoResult<Directory>;

    /// Re-parent and rewrite descendant paths, in one transaction.
    async fn move_to(
        &self,
        id: Uuid,
        new_parent_id: Option<Uuid>,
        new_parent_path: &str,
        actor: Uuid,
    ) -> RepoResult<Directory>;

    /// Depth-first soft-delete cascade over descendant directories and
    /// files, one transaction, all rows stamped with the same instant.
    /// Returns (directories, files) marked.
    async fn soft_delete_cascade(&self, id: Uuid, actor: Uuid, at: DateTime<Utc>) -> RepoResult<(u64, u64)>;

    /// Restore a soft-deleted directory and every descendant sharing the
    /// same soft-delete instant. Returns the restored directory.
    async fn restore_cascade(
        &self,
        id: Uuid,
        new_parent_id: Option<Uuid>,
        new_parent_path: &str,
        actor: Uuid,
    ) -> RepoResult<Directory>;

    async fn list_deleted(&self, library_id: Option<Uuid>) -> RepoResult<Vec<Directory>>;
    /// Soft-deleted immediate children (directories) of a deleted directory.
    async fn list_deleted_children(&self, parent_id: Uuid) -> RepoResult<Vec<Directory>>;
    async fn hard_delete(&self, id: Uuid) -> RepoResult<()>;
}

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<FileMetadata>>;
    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<FileMetadata>>;
    async fn find_by_name(
        &self,
        library_id: Uuid,
        directory_id: Option<Uuid>,
        filename: &str,
    ) -> RepoResult<Option<FileMetadata>>;
    async fn list_in_directory(&self, library_id: Uuid, directory_id: Option<Uuid>) -> RepoResult<Vec<FileMetadata>>;
    async fn list_non_deleted_by_library(&self, library_id: Uuid) -> RepoResult<Vec<FileMetadata>>;
    async fn search_by_name(&self, library_id: Uuid, query: &str, limit: i64) -> RepoResult<Vec<FileMetadata>>;

    /// Insert a new file row plus its version-1 row, one transaction.
    async fn commit_new_file(&self, file: &FileMetadata, version: &FileVersion) -> RepoResult<()>;

    /// Bump `current_version`, replace the file row's content fields, and
    /// insert the new version row — one transaction, serialized against
    /// concurrent commits on the same file so version numbers stay linear
    /// with no gaps. Returns the new version number.
    async fn commit_overwrite(
        &self,
        file_id: Uuid,
        size_bytes: i64,
        checksum_sha256: &str,
        storage_key: &str,
        modified_by: Uuid,
        comment: Option<String>,
    ) -> RepoResult<(FileMetadata, FileVersion)>;

    async fn rename(&self, id: Uuid, new_filename: &str, actor: Uuid) -> RepoResult<FileMetadata>;
    async fn move_to(
        &self,
        id: Uuid,
        directory_id: Option<Uuid>,
        new_path: &str,
        actor: Uuid,
    ) -> RepoResult<FileMetadata>;

    async fn soft_delete(&self, id: Uuid, actor: Uuid, at: DateTime<Utc>) -> RepoResult<()>;
    async fn restore(&self, id: Uuid, directory_id: Option<Uuid>, path: &str, actor: Uuid) -> RepoResult<FileMetadata>;
    async fn list_deleted(&self, library_id: Option<Uuid>) -> RepoResult<Vec<FileMetadata>>;
    /// Soft-deleted files directly inside a directory (any delete instant).
    async fn list_deleted_in_directory(&self, directory_id: Uuid) -> RepoResult<Vec<FileMetadata>>;

    async fn versions(&self, file_id: Uuid) -> RepoResult<Vec<FileVersion>>;
    /// Remove the file row and all version rows, one transaction.
    async fn hard_delete(&self, id: Uuid) -> RepoResult<()>;
}

#[async_trait]
pub trait ShareRepository: Send + Sync {
    async fn insert(&self, share: &ShareLink) -> RepoResult<()>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<ShareLink>>;
    async fn find_by_token(&self, token: &str) -> RepoResult<Option<ShareLink>>;
    async fn list_for_target(&self, target_type: &str, target_id: Uuid, created_by: Uuid) -> RepoResult<Vec<ShareLink>>;
    async fn list_for_user(&self, created_by: Uuid, include_expired: bool) -> RepoResult<Vec<ShareLink>>;
    async fn update(&self, share: &ShareLink) -> RepoResult<()>;
    /// Increment `access_count` and stamp `last_accessed_at`.
    async fn record_access(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()>;
    async fn deactivate(&self, id: Uuid, created_by: Uuid) -> RepoResult<bool>;
    async fn soft_delete(&self, id: Uuid, created_by: Uuid, at: DateTime<Utc>) -> RepoResult<bool>;
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> RepoResult<()>;
    async fn by_correlation(&self, correlation_id: Uuid) -> RepoResult<Vec<AuditEvent>>;
    async fn by_library(&self, library_id: Uuid, limit: i64, offset: i64) -> RepoResult<Vec<AuditEvent>>;
    async fn by_actor(&self, actor_id: Uuid, limit: i64, offset: i64) -> RepoResult<Vec<AuditEvent>>;
    async fn by_target(&self, target_type: &str, target_id: Uuid, limit: i64) -> RepoResult<Vec<AuditEvent>>;
    /// (action, count) pairs for a library since `since`.
    async fn summary(&self, library_id: Uuid, since: DateTime<Utc>) -> RepoResult<Vec<(String, i64)>>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &Notification) -> RepoResult<()>;
    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<Notification>>;
    async fn unread_count(&self, user_id: Uuid) -> RepoResult<i64>;
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;
    async fn mark_all_read(&self, user_id: Uuid) -> RepoResult<u64>;
    async fn delete(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;
}
