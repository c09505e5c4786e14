// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres file + version repository.
//!
//! Upload commits are single transactions. Overwrite commits lock the file
//! row (`FOR UPDATE`) so concurrent completions against the same file
//! serialize and `current_version` stays linear with no gaps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::map_db_err;
use crate::domain::file::{FileMetadata, FileVersion};
use crate::domain::repository::{FileRepository, RepoResult, RepositoryError};

const FILE_COLUMNS: &str = "id, library_id, directory_id, filename, path, size_bytes, \
     checksum_sha256, content_type, storage_key, current_version, created_by, modified_by, \
     is_deleted, deleted_at, deleted_by, created_at, updated_at";

const VERSION_COLUMNS: &str =
    "id, file_id, version_number, size_bytes, checksum_sha256, storage_key, created_at, created_by, comment";

pub struct PostgresFileRepository {
    pool: PgPool,
}

impl PostgresFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_file_row(row: PgRow) -> FileMetadata {
    FileMetadata {
        id: row.get("id"),
        library_id: row.get("library_id"),
        directory_id: row.get("directory_id"),
        filename: row.get("filename"),
        path: row.get("path"),
        size_bytes: row.get("size_bytes"),
        checksum_sha256: row.get("checksum_sha256"),
        content_type: row.get("content_type"),
        storage_key: row.get("storage_key"),
        current_version: row.get("current_version"),
        created_by: row.get("created_by"),
        modified_by: row.get("modified_by"),
        is_deleted: row.get("is_deleted"),
        deleted_at: row.get("deleted_at"),
        deleted_by: row.get("deleted_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn parse_version_row(row: PgRow) -> FileVersion {
    FileVersion {
        id: row.get("id"),
        file_id: row.get("file_id"),
        version_number: row.get("version_number"),
        size_bytes: row.get("size_bytes"),
        checksum_sha256: row.get("checksum_sha256"),
        storage_key: row.get("storage_key"),
        created_at: row.get("created_at"),
        created_by: row.get("created_by"),
        comment: row.get("comment"),
    }
}

async fn insert_version<'e, E>(executor: E, version: &FileVersion) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO file_versions (
            id, file_id, version_number, size_bytes, checksum_sha256,
            storage_key, created_at, created_by, comment
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(version.id)
    .bind(version.file_id)
    .bind(version.version_number)
    .bind(version.size_bytes)
    .bind(&version.checksum_sha256)
    .bind(&version.storage_key)
    .bind(version.created_at)
    .bind(version.created_by)
    .bind(&version.comment)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl FileRepository for PostgresFileRepository {
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<FileMetadata>> {
        let row = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = $1 AND is_deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(parse_file_row))
    }

    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<FileMetadata>> {
        let row = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(row.map(parse_file_row))
    }

    async fn find_by_name(
        &self,
        library_id: Uuid,
        directory_id: Option<Uuid>,
        filename: &str,
    ) -> RepoResult<Option<FileMetadata>> {
        let row = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE library_id = $1 AND directory_id IS NOT DISTINCT FROM $2 \
               AND filename = $3 AND is_deleted = FALSE"
        ))
        .bind(library_id)
        .bind(directory_id)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(parse_file_row))
    }

    async fn list_in_directory(
        &self,
        library_id: Uuid,
        directory_id: Option<Uuid>,
    ) -> RepoResult<Vec<FileMetadata>> {
        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE library_id = $1 AND directory_id IS NOT DISTINCT FROM $2 \
               AND is_deleted = FALSE ORDER BY filename ASC"
        ))
        .bind(library_id)
        .bind(directory_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_file_row).collect())
    }

    async fn list_non_deleted_by_library(&self, library_id: Uuid) -> RepoResult<Vec<FileMetadata>> {
        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE library_id = $1 AND is_deleted = FALSE ORDER BY path ASC, filename ASC"
        ))
        .bind(library_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_file_row).collect())
    }

    async fn search_by_name(&self, library_id: Uuid, query: &str, limit: i64) -> RepoResult<Vec<FileMetadata>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE library_id = $1 AND filename ILIKE $2 AND is_deleted = FALSE \
             ORDER BY filename ASC LIMIT $3"
        ))
        .bind(library_id)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_file_row).collect())
    }

    async fn commit_new_file(&self, file: &FileMetadata, version: &FileVersion) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query(
            r#"
            INSERT INTO files (
                id, library_id, directory_id, filename, path, size_bytes,
                checksum_sha256, content_type, storage_key, current_version,
                created_by, modified_by, is_deleted, deleted_at, deleted_by,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    FALSE, NULL, NULL, $13, $14)
            "#,
        )
        .bind(file.id)
        .bind(file.library_id)
        .bind(file.directory_id)
        .bind(&file.filename)
        .bind(&file.path)
        .bind(file.size_bytes)
        .bind(&file.checksum_sha256)
        .bind(&file.content_type)
        .bind(&file.storage_key)
        .bind(file.current_version)
        .bind(file.created_by)
        .bind(file.modified_by)
        .bind(file.created_at)
        .bind(file.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        insert_version(&mut *tx, version).await.map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    async fn commit_overwrite(
        &self,
        file_id: Uuid,
        size_bytes: i64,
        checksum_sha256: &str,
        storage_key: &str,
        modified_by: Uuid,
        comment: Option<String>,
    ) -> RepoResult<(FileMetadata, FileVersion)> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let row = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = $1 AND is_deleted = FALSE FOR UPDATE"
        ))
        .bind(file_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let file = row
            .map(parse_file_row)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {file_id}")))?;

        let new_version_number = file.current_version + 1;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE files
            SET size_bytes = $2, checksum_sha256 = $3, storage_key = $4,
                current_version = $5, modified_by = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(file_id)
        .bind(size_bytes)
        .bind(checksum_sha256)
        .bind(storage_key)
        .bind(new_version_number)
        .bind(modified_by)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let version = FileVersion::new(
            file_id,
            new_version_number,
            size_bytes,
            checksum_sha256.to_string(),
            storage_key.to_string(),
            modified_by,
            comment,
        );
        insert_version(&mut *tx, &version).await.map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;

        let updated = FileMetadata {
            size_bytes,
            checksum_sha256: checksum_sha256.to_string(),
            storage_key: storage_key.to_string(),
            current_version: new_version_number,
            modified_by,
            updated_at: now,
            ..file
        };
        Ok((updated, version))
    }

    async fn rename(&self, id: Uuid, new_filename: &str, actor: Uuid) -> RepoResult<FileMetadata> {
        let row = sqlx::query(&format!(
            "UPDATE files SET filename = $2, modified_by = $3, updated_at = $4 \
             WHERE id = $1 AND is_deleted = FALSE RETURNING {FILE_COLUMNS}"
        ))
        .bind(id)
        .bind(new_filename)
        .bind(actor)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(parse_file_row)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {id}")))
    }

    async fn move_to(
        &self,
        id: Uuid,
        directory_id: Option<Uuid>,
        new_path: &str,
        actor: Uuid,
    ) -> RepoResult<FileMetadata> {
        let row = sqlx::query(&format!(
            "UPDATE files SET directory_id = $2, path = $3, modified_by = $4, updated_at = $5 \
             WHERE id = $1 AND is_deleted = FALSE RETURNING {FILE_COLUMNS}"
        ))
        .bind(id)
        .bind(directory_id)
        .bind(new_path)
        .bind(actor)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(parse_file_row)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {id}")))
    }

    async fn soft_delete(&self, id: Uuid, actor: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE files SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3, updated_at = $2 \
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(at)
        .bind(actor)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("file {id}")));
        }
        Ok(())
    }

    async fn restore(
        &self,
        id: Uuid,
        directory_id: Option<Uuid>,
        path: &str,
        actor: Uuid,
    ) -> RepoResult<FileMetadata> {
        let row = sqlx::query(&format!(
            "UPDATE files \
             SET is_deleted = FALSE, deleted_at = NULL, deleted_by = NULL, \
                 directory_id = $2, path = $3, modified_by = $4, updated_at = $5 \
             WHERE id = $1 AND is_deleted = TRUE RETURNING {FILE_COLUMNS}"
        ))
        .bind(id)
        .bind(directory_id)
        .bind(path)
        .bind(actor)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(parse_file_row)
            .ok_or_else(|| RepositoryError::NotFound(format!("file {id} in trash")))
    }

    async fn list_deleted(&self, library_id: Option<Uuid>) -> RepoResult<Vec<FileMetadata>> {
        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files \
             WHERE is_deleted = TRUE AND ($1::uuid IS NULL OR library_id = $1) \
             ORDER BY deleted_at DESC"
        ))
        .bind(library_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_file_row).collect())
    }

    async fn list_deleted_in_directory(&self, directory_id: Uuid) -> RepoResult<Vec<FileMetadata>> {
        let rows = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE directory_id = $1 AND is_deleted = TRUE"
        ))
        .bind(directory_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_file_row).collect())
    }

    async fn versions(&self, file_id: Uuid) -> RepoResult<Vec<FileVersion>> {
        let rows = sqlx::query(&format!(
            "SELECT {VERSION_COLUMNS} FROM file_versions \
             WHERE file_id = $1 ORDER BY version_number DESC"
        ))
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_version_row).collect())
    }

    async fn hard_delete(&self, id: Uuid) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query("DELETE FROM file_versions WHERE file_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("file {id}")));
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }
}
