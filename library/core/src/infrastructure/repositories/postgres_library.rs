// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres library repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::map_db_err;
use crate::domain::library::Library;
use crate::domain::repository::{LibraryRepository, RepoResult, RepositoryError};

const COLUMNS: &str = "id, name, description, bucket_name, owner_id, created_by, \
     mcp_write_enabled, max_file_size_bytes, is_deleted, deleted_at, deleted_by, \
     created_at, updated_at";

pub struct PostgresLibraryRepository {
    pool: PgPool,
}

impl PostgresLibraryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_library_row(row: PgRow) -> Library {
    Library {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        bucket_name: row.get("bucket_name"),
        owner_id: row.get("owner_id"),
        created_by: row.get("created_by"),
        mcp_write_enabled: row.get("mcp_write_enabled"),
        max_file_size_bytes: row.get("max_file_size_bytes"),
        is_deleted: row.get("is_deleted"),
        deleted_at: row.get("deleted_at"),
        deleted_by: row.get("deleted_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl LibraryRepository for PostgresLibraryRepository {
    async fn insert(&self, library: &Library) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO libraries (
                id, name, description, bucket_name, owner_id, created_by,
                mcp_write_enabled, max_file_size_bytes, is_deleted, deleted_at,
                deleted_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(library.id)
        .bind(&library.name)
        .bind(&library.description)
        .bind(&library.bucket_name)
        .bind(library.owner_id)
        .bind(library.created_by)
        .bind(library.mcp_write_enabled)
        .bind(library.max_file_size_bytes)
        .bind(library.is_deleted)
        .bind(library.deleted_at)
        .bind(library.deleted_by)
        .bind(library.created_at)
        .bind(library.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<Library>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM libraries WHERE id = $1 AND is_deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(row.map(parse_library_row))
    }

    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<Library>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM libraries WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(row.map(parse_library_row))
    }

    async fn list_non_deleted(&self) -> RepoResult<Vec<Library>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM libraries WHERE is_deleted = FALSE ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows.into_iter().map(parse_library_row).collect())
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> RepoResult<Vec<Library>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM libraries \
             WHERE owner_id = $1 AND is_deleted = FALSE ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows.into_iter().map(parse_library_row).collect())
    }

    async fn update(&self, library: &Library) -> RepoResult<()> {
        // bucket_name is immutable after creation and deliberately absent.
        let result = sqlx::query(
            r#"
            UPDATE libraries
            SET name = $2, description = $3, mcp_write_enabled = $4,
                max_file_size_bytes = $5, updated_at = $6
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(library.id)
        .bind(&library.name)
        .bind(&library.description)
        .bind(library.mcp_write_enabled)
        .bind(library.max_file_size_bytes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("library {}", library.id)));
        }
        Ok(())
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE libraries
            SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3, updated_at = $2
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(actor)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("library {id}")));
        }
        Ok(())
    }

    async fn hard_delete(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM libraries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("library {id}")));
        }
        Ok(())
    }

    async fn stats(&self, id: Uuid) -> RepoResult<(i64, i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM files
                 WHERE library_id = $1 AND is_deleted = FALSE) AS file_count,
                (SELECT COUNT(*) FROM directories
                 WHERE library_id = $1 AND is_deleted = FALSE) AS directory_count,
                (SELECT COALESCE(SUM(size_bytes), 0) FROM files
                 WHERE library_id = $1 AND is_deleted = FALSE) AS total_size
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok((
            row.get("file_count"),
            row.get("directory_count"),
            row.get("total_size"),
        ))
    }
}
