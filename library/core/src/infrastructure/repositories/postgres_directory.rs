// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres directory repository.
//!
//! The namespace-tree mutations live here: rename/move rewrite the
//! denormalized `path` on every descendant directory and file, and
//! soft-delete/restore cascade over the subtree. Each of these runs in a
//! single transaction, walking the tree iteratively with an explicit stack
//! so arbitrarily deep trees cannot exhaust the call stack.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

use super::map_db_err;
use crate::domain::directory::{join_path, Directory};
use crate::domain::repository::{DirectoryRepository, RepoResult, RepositoryError};

const COLUMNS: &str = "id, library_id, parent_id, name, path, created_by, updated_by, \
     is_deleted, deleted_at, deleted_by, created_at, updated_at";

pub struct PostgresDirectoryRepository {
    pool: PgPool,
}

impl PostgresDirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_directory_row(row: PgRow) -> Directory {
    Directory {
        id: row.get("id"),
        library_id: row.get("library_id"),
        parent_id: row.get("parent_id"),
        name: row.get("name"),
        path: row.get("path"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
        is_deleted: row.get("is_deleted"),
        deleted_at: row.get("deleted_at"),
        deleted_by: row.get("deleted_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Rewrite `path` on every descendant of `root`, whose new full path is
/// `root_full_path`. Iterative, inside the caller's transaction.
async fn rewrite_descendant_paths(
    tx: &mut Transaction<'_, Postgres>,
    root_id: Uuid,
    root_full_path: &str,
) -> Result<(), sqlx::Error> {
    let mut stack: Vec<(Uuid, String)> = vec![(root_id, root_full_path.to_string())];

    while let Some((dir_id, full_path)) = stack.pop() {
        sqlx::query(
            "UPDATE files SET path = $1, updated_at = NOW() \
             WHERE directory_id = $2 AND is_deleted = FALSE",
        )
        .bind(&full_path)
        .bind(dir_id)
        .execute(&mut **tx)
        .await?;

        let children = sqlx::query(
            "UPDATE directories SET path = $1, updated_at = NOW() \
             WHERE parent_id = $2 AND is_deleted = FALSE RETURNING id, name",
        )
        .bind(&full_path)
        .bind(dir_id)
        .fetch_all(&mut **tx)
        .await?;

        for child in children {
            let id: Uuid = child.get("id");
            let name: String = child.get("name");
            stack.push((id, join_path(&full_path, &name)));
        }
    }

    Ok(())
}

#[async_trait]
impl DirectoryRepository for PostgresDirectoryRepository {
    async fn insert(&self, directory: &Directory) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO directories (
                id, library_id, parent_id, name, path, created_by, updated_by,
                is_deleted, deleted_at, deleted_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(directory.id)
        .bind(directory.library_id)
        .bind(directory.parent_id)
        .bind(&directory.name)
        .bind(&directory.path)
        .bind(directory.created_by)
        .bind(directory.updated_by)
        .bind(directory.is_deleted)
        .bind(directory.deleted_at)
        .bind(directory.deleted_by)
        .bind(directory.created_at)
        .bind(directory.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, library_id: Uuid, id: Uuid) -> RepoResult<Option<Directory>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM directories \
             WHERE id = $1 AND library_id = $2 AND is_deleted = FALSE"
        ))
        .bind(id)
        .bind(library_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(parse_directory_row))
    }

    async fn find_any_by_id(&self, id: Uuid) -> RepoResult<Option<Directory>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM directories WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(row.map(parse_directory_row))
    }

    async fn find_child_by_name(
        &self,
        library_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
    ) -> RepoResult<Option<Directory>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM directories \
             WHERE library_id = $1 AND parent_id IS NOT DISTINCT FROM $2 \
               AND name = $3 AND is_deleted = FALSE"
        ))
        .bind(library_id)
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(parse_directory_row))
    }

    async fn list_children(&self, library_id: Uuid, parent_id: Option<Uuid>) -> RepoResult<Vec<Directory>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM directories \
             WHERE library_id = $1 AND parent_id IS NOT DISTINCT FROM $2 \
               AND is_deleted = FALSE ORDER BY name ASC"
        ))
        .bind(library_id)
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_directory_row).collect())
    }

    async fn rename(&self, id: Uuid, new_name: &str, actor: Uuid) -> RepoResult<Directory> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let row = sqlx::query(&format!(
            "UPDATE directories SET name = $2, updated_by = $3, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = FALSE RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(new_name)
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let directory = row
            .map(parse_directory_row)
            .ok_or_else(|| RepositoryError::NotFound(format!("directory {id}")))?;

        rewrite_descendant_paths(&mut tx, id, &directory.full_path())
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(directory)
    }

    async fn move_to(
        &self,
        id: Uuid,
        new_parent_id: Option<Uuid>,
        new_parent_path: &str,
        actor: Uuid,
    ) -> RepoResult<Directory> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let row = sqlx::query(&format!(
            "UPDATE directories \
             SET parent_id = $2, path = $3, updated_by = $4, updated_at = NOW() \
             WHERE id = $1 AND is_deleted = FALSE RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(new_parent_id)
        .bind(new_parent_path)
        .bind(actor)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let directory = row
            .map(parse_directory_row)
            .ok_or_else(|| RepositoryError::NotFound(format!("directory {id}")))?;

        rewrite_descendant_paths(&mut tx, id, &directory.full_path())
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(directory)
    }

    async fn soft_delete_cascade(&self, id: Uuid, actor: Uuid, at: DateTime<Utc>) -> RepoResult<(u64, u64)> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let mut directories_marked = 0u64;
        let mut files_marked = 0u64;
        let mut stack = vec![id];

        while let Some(dir_id) = stack.pop() {
            let files = sqlx::query(
                "UPDATE files \
                 SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3, updated_at = $2 \
                 WHERE directory_id = $1 AND is_deleted = FALSE",
            )
            .bind(dir_id)
            .bind(at)
            .bind(actor)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
            files_marked += files.rows_affected();

            let children = sqlx::query(
                "UPDATE directories \
                 SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3, updated_at = $2 \
                 WHERE parent_id = $1 AND is_deleted = FALSE RETURNING id",
            )
            .bind(dir_id)
            .bind(at)
            .bind(actor)
            .fetch_all(&mut *tx)
            .await
            .map_err(map_db_err)?;

            directories_marked += children.len() as u64;
            stack.extend(children.into_iter().map(|r| r.get::<Uuid, _>("id")));
        }

        let root = sqlx::query(
            "UPDATE directories \
             SET is_deleted = TRUE, deleted_at = $2, deleted_by = $3, updated_at = $2 \
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(at)
        .bind(actor)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if root.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("directory {id}")));
        }
        directories_marked += 1;

        tx.commit().await.map_err(map_db_err)?;
        Ok((directories_marked, files_marked))
    }

    async fn restore_cascade(
        &self,
        id: Uuid,
        new_parent_id: Option<Uuid>,
        new_parent_path: &str,
        actor: Uuid,
    ) -> RepoResult<Directory> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM directories WHERE id = $1 AND is_deleted = TRUE FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let root = row
            .map(parse_directory_row)
            .ok_or_else(|| RepositoryError::NotFound(format!("directory {id} in trash")))?;
        let cascade_instant = root.deleted_at;

        let row = sqlx::query(&format!(
            "UPDATE directories \
             SET is_deleted = FALSE, deleted_at = NULL, deleted_by = NULL, \
                 parent_id = $2, path = $3, updated_by = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(new_parent_id)
        .bind(new_parent_path)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let restored = parse_directory_row(row);

        // Descendants restored are exactly those sharing the cascade's
        // soft-delete instant; independently deleted items stay in trash.
        let mut stack: Vec<(Uuid, String)> = vec![(id, restored.full_path())];
        while let Some((dir_id, full_path)) = stack.pop() {
            sqlx::query(
                "UPDATE files \
                 SET is_deleted = FALSE, deleted_at = NULL, deleted_by = NULL, \
                     path = $3, modified_by = $4, updated_at = NOW() \
                 WHERE directory_id = $1 AND is_deleted = TRUE AND deleted_at IS NOT DISTINCT FROM $2",
            )
            .bind(dir_id)
            .bind(cascade_instant)
            .bind(&full_path)
            .bind(actor)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

            let children = sqlx::query(
                "UPDATE directories \
                 SET is_deleted = FALSE, deleted_at = NULL, deleted_by = NULL, \
                     path = $3, updated_by = $4, updated_at = NOW() \
                 WHERE parent_id = $1 AND is_deleted = TRUE AND deleted_at IS NOT DISTINCT FROM $2 \
                 RETURNING id, name",
            )
            .bind(dir_id)
            .bind(cascade_instant)
            .bind(&full_path)
            .bind(actor)
            .fetch_all(&mut *tx)
            .await
            .map_err(map_db_err)?;

            for child in children {
                let child_id: Uuid = child.get("id");
                let name: String = child.get("name");
                stack.push((child_id, join_path(&full_path, &name)));
            }
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(restored)
    }

    async fn list_deleted(&self, library_id: Option<Uuid>) -> RepoResult<Vec<Directory>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM directories \
             WHERE is_deleted = TRUE AND ($1::uuid IS NULL OR library_id = $1) \
             ORDER BY deleted_at DESC"
        ))
        .bind(library_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_directory_row).collect())
    }

    async fn list_deleted_children(&self, parent_id: Uuid) -> RepoResult<Vec<Directory>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM directories WHERE parent_id = $1 AND is_deleted = TRUE"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(rows.into_iter().map(parse_directory_row).collect())
    }

    async fn hard_delete(&self, id: Uuid) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM directories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("directory {id}")));
        }
        Ok(())
    }
}
