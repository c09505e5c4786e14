// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Postgres audit repository. Append-only; there is no update or delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use super::map_db_err;
use crate::domain::audit::{ActorType, AuditEvent};
use crate::domain::repository::{AuditRepository, RepoResult, RepositoryError};

const COLUMNS: &str = "id, timestamp, actor_type, actor_id, actor_name, action, target_type, \
     target_id, library_id, details, correlation_id, ip_address, user_agent";

pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_audit_row(row: PgRow) -> Result<AuditEvent, RepositoryError> {
    let actor_type: String = row.get("actor_type");
    Ok(AuditEvent {
        id: row.get("id"),
        timestamp: row.get("timestamp"),
        actor_type: ActorType::parse(&actor_type)
            .ok_or_else(|| RepositoryError::Serialization(format!("unknown actor_type {actor_type}")))?,
        actor_id: row.get("actor_id"),
        actor_name: row.get("actor_name"),
        action: row.get("action"),
        target_type: row.get("target_type"),
        target_id: row.get("target_id"),
        library_id: row.get("library_id"),
        details: row.get("details"),
        correlation_id: row.get("correlation_id"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
    })
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append(&self, event: &AuditEvent) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_events (
                id, timestamp, actor_type, actor_id, actor_name, action,
                target_type, target_id, library_id, details, correlation_id,
                ip_address, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(event.id)
        .bind(event.timestamp)
        .bind(event.actor_type.as_str())
        .bind(event.actor_id)
        .bind(&event.actor_name)
        .bind(&event.action)
        .bind(&event.target_type)
        .bind(event.target_id)
        .bind(event.library_id)
        .bind(&event.details)
        .bind(event.correlation_id)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    async fn by_correlation(&self, correlation_id: Uuid) -> RepoResult<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM audit_events \
             WHERE correlation_id = $1 ORDER BY timestamp ASC"
        ))
        .bind(correlation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(parse_audit_row).collect()
    }

    async fn by_library(&self, library_id: Uuid, limit: i64, offset: i64) -> RepoResult<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM audit_events \
             WHERE library_id = $1 ORDER BY timestamp DESC LIMIT $2 OFFSET $3"
        ))
        .bind(library_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(parse_audit_row).collect()
    }

    async fn by_actor(&self, actor_id: Uuid, limit: i64, offset: i64) -> RepoResult<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM audit_events \
             WHERE actor_id = $1 ORDER BY timestamp DESC LIMIT $2 OFFSET $3"
        ))
        .bind(actor_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(parse_audit_row).collect()
    }

    async fn by_target(&self, target_type: &str, target_id: Uuid, limit: i64) -> RepoResult<Vec<AuditEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM audit_events \
             WHERE target_type = $1 AND target_id = $2 \
             ORDER BY timestamp DESC LIMIT $3"
        ))
        .bind(target_type)
        .bind(target_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        rows.into_iter().map(parse_audit_row).collect()
    }

    async fn summary(&self, library_id: Uuid, since: DateTime<Utc>) -> RepoResult<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT action, COUNT(*) AS count FROM audit_events \
             WHERE library_id = $1 AND timestamp >= $2 \
             GROUP BY action ORDER BY count DESC",
        )
        .bind(library_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get("action"), row.get("count")))
            .collect())
    }
}
