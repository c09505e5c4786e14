// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres share-link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::map_db_err;
use crate::domain::repository::{RepoResult, RepositoryError, ShareRepository};
use crate::domain::share::{ShareLink, ShareTargetType, ShareType};

const COLUMNS: &str = "id, token, share_type, target_type, target_id, created_by, password_hash, \
     expires_at, max_access_count, access_count, allow_guest_access, notify_on_access, is_active, \
     last_accessed_at, is_deleted, deleted_at, deleted_by, created_at, updated_at";

pub struct PostgresShareRepository {
    pool: PgPool,
}

impl PostgresShareRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_share_row(row: PgRow) -> Result<ShareLink, RepositoryError> {
    let share_type: String = row.get("share_type");
    let target_type: String = row.get("target_type");

    Ok(ShareLink {
        id: row.get("id"),
        token: row.get("token"),
        share_type: ShareType::parse(&share_type)
            .ok_or_else(|| RepositoryError::Serialization(format!("unknown share_type {share_type}")))?,
        target_type: ShareTargetType::parse(&target_type)
            .ok_or_else(|| RepositoryError::Serialization(format!("unknown target_type {target_type}")))?,
        target_id: row.get("target_id"),
        created_by: row.get("created_by"),
        password_hash: row.get("password_hash"),
        expires_at: row.get("expires_at"),
        max_access_count: row.get("max_access_count"),
        access_count: row.get("access_count"),
        allow_guest_access: row.get("allow_guest_access"),
        notify_on_access: row.get("notify_on_access"),
        is_active: row.get("is_active"),
        last_accessed_at: row.get("last_accessed_at"),
        is_deleted: row.get("is_deleted"),
        deleted_at: row.get("deleted_at"),
        deleted_by: row.get("deleted_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl ShareRepository for PostgresShareRepository {
    async fn insert(&self, share: &ShareLink) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO share_links (
                id, token, share_type, target_type, target_id, created_by,
                password_hash, expires_at, max_access_count, access_count,
                allow_guest_access, notify_on_access, is_active, last_accessed_at,
                is_deleted, deleted_at, deleted_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(share.id)
        .bind(&share.token)
        .bind(share.share_type.as_str())
        .bind(share.target_type.as_str())
        .bind(share.target_id)
        .bind(share.created_by)
        .bind(&share.password_hash)
        .bind(share.expires_at)
        .bind(share.max_access_count)
        .bind(share.access_count)
        .bind(share.allow_guest_access)
        .bind(share.notify_on_access)
        .bind(share.is_active)
        .bind(share.last_accessed_at)
        .bind(share.is_deleted)
        .bind(share.deleted_at)
        .bind(share.deleted_by)
        .bind(share.created_at)
        .bind(share.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<ShareLink>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM share_links WHERE id = $1 AND is_deleted = FALSE"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(parse_share_row).transpose()
    }

    async fn find_by_token(&self, token: &str) -> RepoResult<Option<ShareLink>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM share_links WHERE token = $1 AND is_deleted = FALSE"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        row.map(parse_share_row).transpose()
    }

    async fn list_for_target(
        &self,
        target_type: &str,
        target_id: Uuid,
        created_by: Uuid,
    ) -> RepoResult<Vec<ShareLink>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM share_links \
             WHERE target_type = $1 AND target_id = $2 AND created_by = $3 \
               AND is_deleted = FALSE ORDER BY created_at DESC"
        ))
        .bind(target_type)
        .bind(target_id)
        .bind(created_by)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(parse_share_row).collect()
    }

    async fn list_for_user(&self, created_by: Uuid, include_expired: bool) -> RepoResult<Vec<ShareLink>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM share_links \
             WHERE created_by = $1 AND is_deleted = FALSE \
               AND ($2 OR expires_at IS NULL OR expires_at > NOW()) \
             ORDER BY created_at DESC"
        ))
        .bind(created_by)
        .bind(include_expired)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(parse_share_row).collect()
    }

    async fn update(&self, share: &ShareLink) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE share_links
            SET password_hash = $2, expires_at = $3, max_access_count = $4,
                allow_guest_access = $5, notify_on_access = $6, is_active = $7,
                updated_at = $8
            WHERE id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(share.id)
        .bind(&share.password_hash)
        .bind(share.expires_at)
        .bind(share.max_access_count)
        .bind(share.allow_guest_access)
        .bind(share.notify_on_access)
        .bind(share.is_active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("share link {}", share.id)));
        }
        Ok(())
    }

    async fn record_access(&self, id: Uuid, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query(
            "UPDATE share_links \
             SET access_count = access_count + 1, last_accessed_at = $2, updated_at = $2 \
             WHERE id = $1 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("share link {id}")));
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid, created_by: Uuid) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE share_links SET is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND created_by = $2 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(created_by)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(&self, id: Uuid, created_by: Uuid, at: DateTime<Utc>) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE share_links \
             SET is_deleted = TRUE, is_active = FALSE, deleted_at = $3, deleted_by = $2, updated_at = $3 \
             WHERE id = $1 AND created_by = $2 AND is_deleted = FALSE",
        )
        .bind(id)
        .bind(created_by)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(result.rows_affected() > 0)
    }
}
