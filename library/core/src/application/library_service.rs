// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Library lifecycle.
//!
//! Creation allocates the object-store bucket; deletion is soft and leaves
//! the bucket in place (only a permanent trash purge destroys it).

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::audit::actions;
use crate::domain::identity::RequestContext;
use crate::domain::library::{validate_library_name, Library};
use crate::domain::repository::LibraryRepository;
use crate::error::ServiceError;
use crate::infrastructure::cache::EntityCache;
use crate::infrastructure::object_store::ObjectStore;
use super::audit_service::AuditService;

#[derive(Debug, Default)]
pub struct LibraryUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub mcp_write_enabled: Option<bool>,
    pub max_file_size_bytes: Option<Option<i64>>,
}

pub struct LibraryService {
    libraries: Arc<dyn LibraryRepository>,
    storage: Arc<dyn ObjectStore>,
    cache: EntityCache,
    audit: Arc<AuditService>,
    bucket_prefix: String,
}

impl LibraryService {
    pub fn new(
        libraries: Arc<dyn LibraryRepository>,
        storage: Arc<dyn ObjectStore>,
        cache: EntityCache,
        audit: Arc<AuditService>,
        bucket_prefix: String,
    ) -> Self {
        Self {
            libraries,
            storage,
            cache,
            audit,
            bucket_prefix,
        }
    }

    fn check_access(&self, library: &Library, ctx: &RequestContext) -> Result<(), ServiceError> {
        if library.owner_id != ctx.user.user_id && !ctx.user.is_admin() {
            return Err(ServiceError::Forbidden("access denied".into()));
        }
        Ok(())
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        name: String,
        description: Option<String>,
    ) -> Result<Library, ServiceError> {
        validate_library_name(&name).map_err(ServiceError::Validation)?;

        let library = Library::new(name, description, ctx.user.user_id, &self.bucket_prefix);

        self.storage.create_bucket(&library.bucket_name).await?;
        self.libraries.insert(&library).await?;

        self.cache.delete_prefix("library_list:");
        self.audit
            .log_user_action(
                ctx,
                actions::LIBRARY_CREATE,
                "library",
                library.id,
                Some(library.id),
                json!({ "name": library.name, "bucket": library.bucket_name }),
            )
            .await;

        Ok(library)
    }

    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> Result<Library, ServiceError> {
        let key = self.cache.library_key(id);
        if let Some(library) = self.cache.get::<Library>(&key) {
            self.check_access(&library, ctx)?;
            return Ok(library);
        }

        let library = self
            .libraries
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("library".into()))?;
        self.check_access(&library, ctx)?;
        self.cache.set(&key, &library);
        Ok(library)
    }

    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<Library>, ServiceError> {
        let key = self.cache.library_list_key(ctx.user.user_id);
        if let Some(libraries) = self.cache.get::<Vec<Library>>(&key) {
            return Ok(libraries);
        }

        let libraries = if ctx.user.is_admin() {
            self.libraries.list_non_deleted().await?
        } else {
            self.libraries.list_for_owner(ctx.user.user_id).await?
        };
        self.cache.set(&key, &libraries);
        Ok(libraries)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        update: LibraryUpdate,
    ) -> Result<Library, ServiceError> {
        let mut library = self
            .libraries
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("library".into()))?;
        self.check_access(&library, ctx)?;

        if let Some(name) = update.name {
            validate_library_name(&name).map_err(ServiceError::Validation)?;
            library.name = name;
        }
        if let Some(description) = update.description {
            library.description = description;
        }
        if let Some(enabled) = update.mcp_write_enabled {
            library.mcp_write_enabled = enabled;
        }
        if let Some(max_size) = update.max_file_size_bytes {
            if max_size.is_some_and(|s| s <= 0) {
                return Err(ServiceError::Validation("max_file_size_bytes must be positive".into()));
            }
            library.max_file_size_bytes = max_size;
        }
        library.updated_at = Utc::now();

        self.libraries.update(&library).await?;
        self.cache.invalidate_library(id);

        self.audit
            .log_user_action(
                ctx,
                actions::LIBRARY_UPDATE,
                "library",
                id,
                Some(id),
                json!({ "name": library.name }),
            )
            .await;

        Ok(library)
    }

    /// Soft delete. The bucket survives until a permanent purge.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), ServiceError> {
        let library = self
            .libraries
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("library".into()))?;
        self.check_access(&library, ctx)?;

        self.libraries.soft_delete(id, ctx.user.user_id, Utc::now()).await?;
        self.cache.invalidate_library_tree(id);

        self.audit
            .log_user_action(
                ctx,
                actions::LIBRARY_DELETE,
                "library",
                id,
                Some(id),
                json!({ "name": library.name }),
            )
            .await;

        Ok(())
    }

    /// (file count, directory count, total size).
    pub async fn stats(&self, ctx: &RequestContext, id: Uuid) -> Result<(i64, i64, i64), ServiceError> {
        let library = self
            .libraries
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("library".into()))?;
        self.check_access(&library, ctx)?;
        Ok(self.libraries.stats(id).await?)
    }
}
