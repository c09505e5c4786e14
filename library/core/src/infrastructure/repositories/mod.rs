// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! PostgreSQL implementations of the repository traits.
//!
//! Plain `sqlx::query` with explicit binds and row parsing. Unique-index
//! violations surface as [`RepositoryError::Conflict`]; everything else
//! maps to `Database`. Multi-row operations that must be atomic (upload
//! commit, path cascades) run inside one transaction here.

mod postgres_audit;
mod postgres_directory;
mod postgres_file;
mod postgres_library;
mod postgres_notification;
mod postgres_share;

pub use postgres_audit::PostgresAuditRepository;
pub use postgres_directory::PostgresDirectoryRepository;
pub use postgres_file::PostgresFileRepository;
pub use postgres_library::PostgresLibraryRepository;
pub use postgres_notification::PostgresNotificationRepository;
pub use postgres_share::PostgresShareRepository;

use crate::domain::repository::RepositoryError;

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn map_db_err(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return RepositoryError::Conflict(db.message().to_string());
        }
    }
    RepositoryError::Database(e.to_string())
}
