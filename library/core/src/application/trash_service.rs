// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Trash and retention.
//!
//! Soft-deleted files and directories stay restorable until
//! `deleted_at + retention_days`. Restore refuses expired items; directory
//! restore cascades to descendants sharing the same soft-delete instant.
//! Permanent deletion removes version blobs first (best-effort — metadata
//! removal does not roll back on storage errors), then the rows. The
//! `cleanup_expired` sweeper is idempotent and invoked periodically by the
//! daemon.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::audit::actions;
use crate::domain::directory::Directory;
use crate::domain::identity::RequestContext;
use crate::domain::library::Library;
use crate::domain::repository::{DirectoryRepository, FileRepository, LibraryRepository};
use crate::domain::trash::{TrashItem, TrashItemType};
use crate::error::ServiceError;
use crate::infrastructure::cache::EntityCache;
use crate::infrastructure::object_store::ObjectStore;
use super::audit_service::AuditService;
use super::indexing::IndexingService;

#[derive(Debug, Clone)]
pub struct RestoreRequest {
    pub item_type: TrashItemType,
    pub item_id: Uuid,
    pub restore_to_original: bool,
    pub new_parent_id: Option<Uuid>,
}

pub struct TrashService {
    files: Arc<dyn FileRepository>,
    directories: Arc<dyn DirectoryRepository>,
    libraries: Arc<dyn LibraryRepository>,
    storage: Arc<dyn ObjectStore>,
    cache: EntityCache,
    audit: Arc<AuditService>,
    indexer: Arc<IndexingService>,
    retention_days: i64,
}

impl TrashService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: Arc<dyn FileRepository>,
        directories: Arc<dyn DirectoryRepository>,
        libraries: Arc<dyn LibraryRepository>,
        storage: Arc<dyn ObjectStore>,
        cache: EntityCache,
        audit: Arc<AuditService>,
        indexer: Arc<IndexingService>,
        retention_days: i64,
    ) -> Self {
        Self {
            files,
            directories,
            libraries,
            storage,
            cache,
            audit,
            indexer,
            retention_days,
        }
    }

    async fn library_any(&self, library_id: Uuid) -> Result<Library, ServiceError> {
        self.libraries
            .find_any_by_id(library_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("library".into()))
    }

    async fn check_library_access(&self, ctx: &RequestContext, library_id: Uuid) -> Result<Library, ServiceError> {
        let library = self.library_any(library_id).await?;
        if library.owner_id != ctx.user.user_id && !ctx.user.is_admin() {
            return Err(ServiceError::Forbidden("access denied".into()));
        }
        Ok(library)
    }

    /// List trash, newest deletions first. Non-admins only see libraries
    /// they own.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        library_id: Option<Uuid>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<TrashItem>, usize, i64), ServiceError> {
        if let Some(library_id) = library_id {
            self.check_library_access(ctx, library_id).await?;
        }

        let owned: Option<Vec<Uuid>> = if ctx.user.is_admin() {
            None
        } else {
            Some(
                self.libraries
                    .list_for_owner(ctx.user.user_id)
                    .await?
                    .into_iter()
                    .map(|l| l.id)
                    .collect(),
            )
        };
        let visible = |lib: Uuid| owned.as_ref().is_none_or(|ids| ids.contains(&lib));

        let now = Utc::now();
        let mut items: Vec<TrashItem> = Vec::new();
        let mut total_size: i64 = 0;

        for file in self.files.list_deleted(library_id).await? {
            if !visible(file.library_id) {
                continue;
            }
            let deleted_at = file.deleted_at.unwrap_or(file.updated_at);
            let (expires_at, days, can_restore) = TrashItem::expiry_for(deleted_at, self.retention_days, now);
            total_size += file.size_bytes;
            items.push(TrashItem {
                item_type: TrashItemType::File,
                item_id: file.id,
                name: file.filename.clone(),
                original_path: file.full_path(),
                library_id: file.library_id,
                deleted_by: file.deleted_by,
                deleted_at,
                expires_at,
                size_bytes: Some(file.size_bytes),
                days_until_permanent: days,
                can_restore,
            });
        }

        for dir in self.directories.list_deleted(library_id).await? {
            if !visible(dir.library_id) {
                continue;
            }
            let deleted_at = dir.deleted_at.unwrap_or(dir.updated_at);
            let (expires_at, days, can_restore) = TrashItem::expiry_for(deleted_at, self.retention_days, now);
            items.push(TrashItem {
                item_type: TrashItemType::Directory,
                item_id: dir.id,
                name: dir.name.clone(),
                original_path: dir.full_path(),
                library_id: dir.library_id,
                deleted_by: dir.deleted_by,
                deleted_at,
                expires_at,
                size_bytes: None,
                days_until_permanent: days,
                can_restore,
            });
        }

        items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        let total = items.len();
        let page: Vec<TrashItem> = items.into_iter().skip(offset).take(limit).collect();
        Ok((page, total, total_size))
    }

    pub async fn restore(&self, ctx: &RequestContext, request: RestoreRequest) -> Result<String, ServiceError> {
        match request.item_type {
            TrashItemType::File => self.restore_file(ctx, &request).await,
            TrashItemType::Directory => self.restore_directory(ctx, &request).await,
        }
    }

    fn check_not_expired(&self, deleted_at: chrono::DateTime<Utc>) -> Result<(), ServiceError> {
        let expires_at = deleted_at + chrono::Duration::days(self.retention_days);
        if Utc::now() > expires_at {
            return Err(ServiceError::Validation(
                "item has passed its retention window and cannot be restored".into(),
            ));
        }
        Ok(())
    }

    async fn restore_file(&self, ctx: &RequestContext, request: &RestoreRequest) -> Result<String, ServiceError> {
        let file = self
            .files
            .find_any_by_id(request.item_id)
            .await?
            .filter(|f| f.is_deleted)
            .ok_or_else(|| ServiceError::NotFound("file in trash".into()))?;
        self.check_library_access(ctx, file.library_id).await?;
        self.check_not_expired(file.deleted_at.unwrap_or(file.updated_at))?;

        // Resolve the destination: the original parent when it survives,
        // an explicit new parent, or the library root.
        let (directory_id, path) = if request.restore_to_original {
            match file.directory_id {
                Some(dir_id) => match self.directories.find_by_id(file.library_id, dir_id).await? {
                    Some(dir) => (Some(dir_id), dir.full_path()),
                    None => (None, "/".to_string()),
                },
                None => (None, "/".to_string()),
            }
        } else if let Some(parent_id) = request.new_parent_id {
            let dir = self
                .directories
                .find_by_id(file.library_id, parent_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("target directory".into()))?;
            (Some(parent_id), dir.full_path())
        } else {
            (None, "/".to_string())
        };

        let restored = self
            .files
            .restore(request.item_id, directory_id, &path, ctx.user.user_id)
            .await?;
        self.cache.invalidate_file(restored.id, restored.library_id);

        self.audit
            .log_user_action(
                ctx,
                actions::FILE_RESTORE,
                "file",
                restored.id,
                Some(restored.library_id),
                json!({ "path": restored.full_path() }),
            )
            .await;

        let indexer = self.indexer.clone();
        let file_id = restored.id;
        tokio::spawn(async move {
            if let Err(e) = indexer.index_file(file_id).await {
                warn!(%file_id, error = %e, "restore reindex failed");
            }
        });

        Ok(restored.full_path())
    }

    async fn restore_directory(&self, ctx: &RequestContext, request: &RestoreRequest) -> Result<String, ServiceError> {
        let directory = self
            .directories
            .find_any_by_id(request.item_id)
            .await?
            .filter(|d| d.is_deleted)
            .ok_or_else(|| ServiceError::NotFound("directory in trash".into()))?;
        self.check_library_access(ctx, directory.library_id).await?;
        self.check_not_expired(directory.deleted_at.unwrap_or(directory.updated_at))?;

        let (parent_id, parent_path) = if request.restore_to_original {
            match directory.parent_id {
                Some(parent_id) => match self
                    .directories
                    .find_by_id(directory.library_id, parent_id)
                    .await?
                {
                    Some(parent) => (Some(parent_id), parent.full_path()),
                    None => (None, "/".to_string()),
                },
                None => (None, "/".to_string()),
            }
        } else if let Some(parent_id) = request.new_parent_id {
            let parent = self
                .directories
                .find_by_id(directory.library_id, parent_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("target directory".into()))?;
            (Some(parent_id), parent.full_path())
        } else {
            (None, "/".to_string())
        };

        let restored = self
            .directories
            .restore_cascade(request.item_id, parent_id, &parent_path, ctx.user.user_id)
            .await?;
        self.cache.invalidate_directory(restored.id, restored.library_id);

        self.audit
            .log_user_action(
                ctx,
                actions::DIRECTORY_RESTORE,
                "directory",
                restored.id,
                Some(restored.library_id),
                json!({ "path": restored.full_path() }),
            )
            .await;

        Ok(restored.full_path())
    }

    /// Permanently delete one trash item. Irreversible.
    pub async fn permanent_delete(
        &self,
        ctx: &RequestContext,
        item_type: TrashItemType,
        item_id: Uuid,
    ) -> Result<(), ServiceError> {
        match item_type {
            TrashItemType::File => {
                let file = self
                    .files
                    .find_any_by_id(item_id)
                    .await?
                    .filter(|f| f.is_deleted)
                    .ok_or_else(|| ServiceError::NotFound("file in trash".into()))?;
                let library = self.check_library_access(ctx, file.library_id).await?;
                self.purge_file(ctx, &file, &library.bucket_name).await
            }
            TrashItemType::Directory => {
                let directory = self
                    .directories
                    .find_any_by_id(item_id)
                    .await?
                    .filter(|d| d.is_deleted)
                    .ok_or_else(|| ServiceError::NotFound("directory in trash".into()))?;
                let library = self.check_library_access(ctx, directory.library_id).await?;
                self.purge_directory_tree(ctx, &directory, &library.bucket_name).await
            }
        }
    }

    async fn purge_file(
        &self,
        ctx: &RequestContext,
        file: &crate::domain::file::FileMetadata,
        bucket: &str,
    ) -> Result<(), ServiceError> {
        // Blob deletion is best-effort; an orphaned object is preferable to
        // metadata that claims a purged file still exists.
        let keys: Vec<String> = self
            .files
            .versions(file.id)
            .await?
            .into_iter()
            .map(|v| v.storage_key)
            .collect();
        if !keys.is_empty() {
            if let Err(e) = self.storage.delete_files(bucket, &keys).await {
                warn!(file_id = %file.id, error = %e, "version blob deletion failed");
            }
        }

        self.files.hard_delete(file.id).await?;
        self.cache.invalidate_file(file.id, file.library_id);

        self.audit
            .log_user_action(
                ctx,
                actions::TRASH_PURGE,
                "file",
                file.id,
                Some(file.library_id),
                json!({ "filename": file.filename, "versions": keys.len() }),
            )
            .await;

        let indexer = self.indexer.clone();
        let file_id = file.id;
        let library_id = file.library_id;
        tokio::spawn(async move {
            if let Err(e) = indexer.deindex_file(file_id, library_id).await {
                warn!(%file_id, error = %e, "purge deindex failed");
            }
        });

        Ok(())
    }

    /// Children first, then the directory itself.
    async fn purge_directory_tree(
        &self,
        ctx: &RequestContext,
        root: &Directory,
        bucket: &str,
    ) -> Result<(), ServiceError> {
        // Collect the subtree iteratively, then delete deepest-first.
        let mut ordered: Vec<Directory> = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let children = self.directories.list_deleted_children(dir.id).await?;
            ordered.push(dir);
            stack.extend(children);
        }

        for dir in ordered.iter().rev() {
            for file in self.files.list_deleted_in_directory(dir.id).await? {
                self.purge_file(ctx, &file, bucket).await?;
            }
            self.directories.hard_delete(dir.id).await?;
        }

        self.cache.invalidate_directory(root.id, root.library_id);
        self.audit
            .log_user_action(
                ctx,
                actions::TRASH_PURGE,
                "directory",
                root.id,
                Some(root.library_id),
                json!({ "path": root.full_path(), "subtree": ordered.len() }),
            )
            .await;

        Ok(())
    }

    /// Bulk permanent delete. Returns the number of items purged.
    pub async fn empty_trash(&self, ctx: &RequestContext, library_id: Option<Uuid>) -> Result<usize, ServiceError> {
        let (items, _, _) = self.list(ctx, library_id, usize::MAX, 0).await?;
        let mut purged = 0usize;

        // Files first, then directories — directory purges also remove any
        // files still inside them.
        for item in items.iter().filter(|i| i.item_type == TrashItemType::File) {
            match self.permanent_delete(ctx, item.item_type, item.item_id).await {
                Ok(()) => purged += 1,
                Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        for item in items.iter().filter(|i| i.item_type == TrashItemType::Directory) {
            match self.permanent_delete(ctx, item.item_type, item.item_id).await {
                Ok(()) => purged += 1,
                Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(purged)
    }

    /// Idempotent sweeper: permanently delete everything past its expiry.
    pub async fn cleanup_expired(&self) -> Result<usize, ServiceError> {
        let ctx = RequestContext::system();
        let now = Utc::now();
        let mut purged = 0usize;

        let expired_files: Vec<Uuid> = self
            .files
            .list_deleted(None)
            .await?
            .into_iter()
            .filter(|f| {
                let deleted_at = f.deleted_at.unwrap_or(f.updated_at);
                now > deleted_at + chrono::Duration::days(self.retention_days)
            })
            .map(|f| f.id)
            .collect();

        for file_id in expired_files {
            match self.permanent_delete(&ctx, TrashItemType::File, file_id).await {
                Ok(()) => purged += 1,
                Err(ServiceError::NotFound(_)) => {}
                Err(e) => warn!(%file_id, error = %e, "expired file purge failed"),
            }
        }

        let expired_dirs: Vec<Uuid> = self
            .directories
            .list_deleted(None)
            .await?
            .into_iter()
            .filter(|d| {
                let deleted_at = d.deleted_at.unwrap_or(d.updated_at);
                now > deleted_at + chrono::Duration::days(self.retention_days)
            })
            .map(|d| d.id)
            .collect();

        for dir_id in expired_dirs {
            match self.permanent_delete(&ctx, TrashItemType::Directory, dir_id).await {
                Ok(()) => purged += 1,
                Err(ServiceError::NotFound(_)) => {}
                Err(e) => warn!(%dir_id, error = %e, "expired directory purge failed"),
            }
        }

        Ok(purged)
    }
}
