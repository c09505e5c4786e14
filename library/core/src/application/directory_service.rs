// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Directory lifecycle: create, rename, move, soft-delete cascade, browse.
//!
//! Move validation tests the forbidden cases by path prefix: a directory
//! cannot move into itself or any descendant because the target's full
//! path would start with the source's full path.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::audit::actions;
use crate::domain::directory::{validate_directory_name, Directory};
use crate::domain::events::library_channel;
use crate::domain::file::FileMetadata;
use crate::domain::identity::RequestContext;
use crate::domain::repository::{DirectoryRepository, FileRepository, LibraryRepository};
use crate::error::ServiceError;
use crate::infrastructure::cache::EntityCache;
use crate::infrastructure::event_bus::RealtimeBus;
use super::audit_service::AuditService;
use super::indexing::IndexingService;

/// A directory listing: immediate children plus the files at that level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub directories: Vec<Directory>,
    pub files: Vec<FileMetadata>,
}

/// Whether `target_full_path` lies inside the subtree rooted at
/// `source_full_path` (or is the subtree root itself).
pub fn is_within_subtree(source_full_path: &str, target_full_path: &str) -> bool {
    target_full_path == source_full_path
        || target_full_path.starts_with(&format!("{}/", source_full_path.trim_end_matches('/')))
}

pub struct DirectoryService {
    directories: Arc<dyn DirectoryRepository>,
    files: Arc<dyn FileRepository>,
    libraries: Arc<dyn LibraryRepository>,
    cache: EntityCache,
    bus: Arc<RealtimeBus>,
    audit: Arc<AuditService>,
    indexer: Arc<IndexingService>,
}

impl DirectoryService {
    pub fn new(
        directories: Arc<dyn DirectoryRepository>,
        files: Arc<dyn FileRepository>,
        libraries: Arc<dyn LibraryRepository>,
        cache: EntityCache,
        bus: Arc<RealtimeBus>,
        audit: Arc<AuditService>,
        indexer: Arc<IndexingService>,
    ) -> Self {
        Self {
            directories,
            files,
            libraries,
            cache,
            bus,
            audit,
            indexer,
        }
    }

    async fn check_library(&self, ctx: &RequestContext, library_id: Uuid) -> Result<(), ServiceError> {
        let library = self
            .libraries
            .find_by_id(library_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("library".into()))?;
        if library.owner_id != ctx.user.user_id && !ctx.user.is_admin() {
            return Err(ServiceError::Forbidden("access denied".into()));
        }
        Ok(())
    }

    async fn load(&self, library_id: Uuid, directory_id: Uuid) -> Result<Directory, ServiceError> {
        self.directories
            .find_by_id(library_id, directory_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("directory".into()))
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        library_id: Uuid,
        parent_id: Option<Uuid>,
        name: String,
    ) -> Result<Directory, ServiceError> {
        validate_directory_name(&name).map_err(ServiceError::Validation)?;
        self.check_library(ctx, library_id).await?;

        let parent_path = match parent_id {
            None => "/".to_string(),
            Some(parent_id) => self.load(library_id, parent_id).await?.full_path(),
        };

        if self
            .directories
            .find_child_by_name(library_id, parent_id, &name)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict("a directory with this name already exists"));
        }

        let directory = Directory::new(library_id, parent_id, name, parent_path, ctx.user.user_id);
        self.directories.insert(&directory).await?;

        self.cache.invalidate_directory(directory.id, library_id);
        self.bus.publish(
            &library_channel(library_id),
            "directory_created",
            json!({ "directory_id": directory.id, "path": directory.full_path() }),
        );
        self.audit
            .log_user_action(
                ctx,
                actions::DIRECTORY_CREATE,
                "directory",
                directory.id,
                Some(library_id),
                json!({ "name": directory.name, "path": directory.full_path() }),
            )
            .await;

        Ok(directory)
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        library_id: Uuid,
        directory_id: Uuid,
    ) -> Result<Directory, ServiceError> {
        self.check_library(ctx, library_id).await?;
        self.load(library_id, directory_id).await
    }

    /// Cached listing of one level of the tree. `directory_id = None`
    /// lists the library root.
    pub async fn browse(
        &self,
        ctx: &RequestContext,
        library_id: Uuid,
        directory_id: Option<Uuid>,
    ) -> Result<DirectoryListing, ServiceError> {
        self.check_library(ctx, library_id).await?;

        let parent_path = match directory_id {
            None => "/".to_string(),
            Some(id) => self.load(library_id, id).await?.full_path(),
        };

        let key = self.cache.directory_listing_key(library_id, &parent_path);
        if let Some(listing) = self.cache.get::<DirectoryListing>(&key) {
            return Ok(listing);
        }

        let directories = self.directories.list_children(library_id, directory_id).await?;
        let files = self.files.list_in_directory(library_id, directory_id).await?;
        let listing = DirectoryListing { directories, files };
        self.cache.set(&key, &listing);
        Ok(listing)
    }

    pub async fn rename(
        &self,
        ctx: &RequestContext,
        library_id: Uuid,
        directory_id: Uuid,
        new_name: String,
    ) -> Result<Directory, ServiceError> {
        validate_directory_name(&new_name).map_err(ServiceError::Validation)?;
        self.check_library(ctx, library_id).await?;
        let directory = self.load(library_id, directory_id).await?;

        if let Some(dup) = self
            .directories
            .find_child_by_name(library_id, directory.parent_id, &new_name)
            .await?
        {
            if dup.id != directory_id {
                return Err(ServiceError::conflict("a directory with this name already exists"));
            }
        }

        let old_path = directory.full_path();
        let renamed = self.directories.rename(directory_id, &new_name, ctx.user.user_id).await?;
        self.cache.invalidate_directory(directory_id, library_id);

        self.bus.publish(
            &library_channel(library_id),
            "directory_renamed",
            json!({ "directory_id": directory_id, "old_path": old_path, "new_path": renamed.full_path() }),
        );
        self.audit
            .log_user_action(
                ctx,
                actions::DIRECTORY_RENAME,
                "directory",
                directory_id,
                Some(library_id),
                json!({ "old_path": old_path, "new_path": renamed.full_path() }),
            )
            .await;

        Ok(renamed)
    }

    pub async fn move_directory(
        &self,
        ctx: &RequestContext,
        library_id: Uuid,
        directory_id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> Result<Directory, ServiceError> {
        self.check_library(ctx, library_id).await?;
        let directory = self.load(library_id, directory_id).await?;

        let new_parent_path = match new_parent_id {
            None => "/".to_string(),
            Some(parent_id) => {
                if parent_id == directory_id {
                    return Err(ServiceError::Validation("cannot move a directory into itself".into()));
                }
                let parent = self.load(library_id, parent_id).await?;
                if is_within_subtree(&directory.full_path(), &parent.full_path()) {
                    return Err(ServiceError::Validation(
                        "cannot move a directory into its own subdirectory".into(),
                    ));
                }
                parent.full_path()
            }
        };

        if let Some(dup) = self
            .directories
            .find_child_by_name(library_id, new_parent_id, &directory.name)
            .await?
        {
            if dup.id != directory_id {
                return Err(ServiceError::conflict(
                    "a directory with this name already exists in the target location",
                ));
            }
        }

        let old_path = directory.full_path();
        let moved = self
            .directories
            .move_to(directory_id, new_parent_id, &new_parent_path, ctx.user.user_id)
            .await?;
        self.cache.invalidate_directory(directory_id, library_id);

        self.bus.publish(
            &library_channel(library_id),
            "directory_moved",
            json!({ "directory_id": directory_id, "old_path": old_path, "new_path": moved.full_path() }),
        );
        self.audit
            .log_user_action(
                ctx,
                actions::DIRECTORY_MOVE,
                "directory",
                directory_id,
                Some(library_id),
                json!({ "old_path": old_path, "new_path": moved.full_path() }),
            )
            .await;

        Ok(moved)
    }

    /// Depth-first soft-delete cascade over the subtree. De-indexing of
    /// the subtree's chunks is best-effort.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        library_id: Uuid,
        directory_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.check_library(ctx, library_id).await?;
        let directory = self.load(library_id, directory_id).await?;
        let full_path = directory.full_path();

        let (directories, files) = self
            .directories
            .soft_delete_cascade(directory_id, ctx.user.user_id, Utc::now())
            .await?;
        self.cache.invalidate_directory(directory_id, library_id);

        self.bus.publish(
            &library_channel(library_id),
            "directory_deleted",
            json!({ "directory_id": directory_id, "path": full_path }),
        );
        self.audit
            .log_user_action(
                ctx,
                actions::DIRECTORY_DELETE,
                "directory",
                directory_id,
                Some(library_id),
                json!({ "path": full_path, "directories": directories, "files": files }),
            )
            .await;

        let indexer = self.indexer.clone();
        let prefix = format!("{full_path}/");
        tokio::spawn(async move {
            if let Err(e) = indexer.deindex_path_prefix(library_id, &prefix).await {
                warn!(%library_id, error = %e, "subtree deindex failed");
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtree_check_catches_self() {
        assert!(is_within_subtree("/a/b/c", "/a/b/c"));
    }

    #[test]
    fn subtree_check_catches_descendants() {
        assert!(is_within_subtree("/a/b/c", "/a/b/c/d"));
        assert!(is_within_subtree("/a/b/c", "/a/b/c/d/e"));
    }

    #[test]
    fn subtree_check_allows_siblings_with_common_prefix() {
        // "/a/b/cd" merely shares a string prefix with "/a/b/c"; it is not
        // inside it.
        assert!(!is_within_subtree("/a/b/c", "/a/b/cd"));
        assert!(!is_within_subtree("/a/b/c", "/a/b"));
        assert!(!is_within_subtree("/a/b/c", "/"));
    }
}
