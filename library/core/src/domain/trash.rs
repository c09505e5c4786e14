// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Trash view over soft-deleted files and directories.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrashItemType {
    File,
    Directory,
}

impl TrashItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrashItemType::File => "file",
            TrashItemType::Directory => "directory",
        }
    }
}

/// A soft-deleted item as presented in the trash listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashItem {
    pub item_type: TrashItemType,
    pub item_id: Uuid,
    pub name: String,
    pub original_path: String,
    pub library_id: Uuid,
    pub deleted_by: Option<Uuid>,
    pub deleted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Directories carry no size.
    pub size_bytes: Option<i64>,
    pub days_until_permanent: i64,
    pub can_restore: bool,
}

impl TrashItem {
    /// Derive expiry fields from a deletion instant and retention window.
    pub fn expiry_for(deleted_at: DateTime<Utc>, retention_days: i64, now: DateTime<Utc>) -> (DateTime<Utc>, i64, bool) {
        let expires_at = deleted_at + Duration::days(retention_days);
        let days_remaining = (expires_at - now).num_days();
        (expires_at, days_remaining.max(0), now < expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_within_retention_is_restorable() {
        let now = Utc::now();
        let deleted = now - Duration::days(5);
        let (expires_at, days, can_restore) = TrashItem::expiry_for(deleted, 30, now);
        assert_eq!(expires_at, deleted + Duration::days(30));
        assert_eq!(days, 24);
        assert!(can_restore);
    }

    #[test]
    fn expiry_past_retention_blocks_restore() {
        let now = Utc::now();
        let deleted = now - Duration::days(31);
        let (_, days, can_restore) = TrashItem::expiry_for(deleted, 30, now);
        assert_eq!(days, 0);
        assert!(!can_restore);
    }
}
