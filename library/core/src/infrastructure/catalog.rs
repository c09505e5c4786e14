// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Library catalog seam for the agent access-control layer.
//!
//! `alexandria-vector` gates agent writes on each library's
//! `mcp_write_enabled` flag but cannot depend on this crate; it sees the
//! metadata store through the [`LibraryCatalog`] trait, implemented here
//! over the library repository.

use alexandria_vector::application::{CatalogEntry, LibraryCatalog};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::repository::LibraryRepository;

pub struct PostgresLibraryCatalog {
    libraries: Arc<dyn LibraryRepository>,
}

impl PostgresLibraryCatalog {
    pub fn new(libraries: Arc<dyn LibraryRepository>) -> Self {
        Self { libraries }
    }
}

#[async_trait]
impl LibraryCatalog for PostgresLibraryCatalog {
    async fn list_libraries(&self) -> anyhow::Result<Vec<CatalogEntry>> {
        let libraries = self.libraries.list_non_deleted().await?;
        Ok(libraries
            .into_iter()
            .map(|l| CatalogEntry {
                library_id: l.id,
                mcp_write_enabled: l.mcp_write_enabled,
            })
            .collect())
    }

    async fn write_flag(&self, library_id: Uuid) -> anyhow::Result<Option<bool>> {
        Ok(self
            .libraries
            .find_by_id(library_id)
            .await?
            .map(|l| l.mcp_write_enabled))
    }
}
