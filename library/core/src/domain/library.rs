// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Library aggregate: the top-level tenant container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A library owns a namespace tree, an object-store bucket, and a vector
/// collection. `bucket_name` is derived from the id at creation and never
/// changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub bucket_name: String,
    pub owner_id: Uuid,
    pub created_by: Uuid,
    pub mcp_write_enabled: bool,
    pub max_file_size_bytes: Option<i64>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Library {
    pub fn new(name: String, description: Option<String>, owner_id: Uuid, bucket_prefix: &str) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        Self {
            id,
            name,
            description,
            bucket_name: bucket_name_for(id, bucket_prefix),
            owner_id,
            created_by: owner_id,
            mcp_write_enabled: false,
            max_file_size_bytes: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Derive the object-store bucket name for a library:
/// `<prefix><first-16-hex-of-id-without-dashes>`, lowercase. Satisfies the
/// S3 constraints (lowercase, 3–63 chars, no underscores) as long as the
/// configured prefix does.
pub fn bucket_name_for(library_id: Uuid, prefix: &str) -> String {
    let hex = library_id.simple().to_string();
    format!("{}{}", prefix, &hex[..16]).to_lowercase()
}

/// Library names are path components: no separators or control characters.
pub fn validate_library_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("library name must not be empty".into());
    }
    if trimmed.len() > 255 {
        return Err("library name must be at most 255 characters".into());
    }
    if trimmed.contains('/') || trimmed.chars().any(char::is_control) {
        return Err("library name must not contain '/' or control characters".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_name_format() {
        let id = Uuid::parse_str("a1b2c3d4-e5f6-7081-92a3-b4c5d6e7f809").unwrap();
        let bucket = bucket_name_for(id, "alexandria-lib-");
        assert_eq!(bucket, "alexandria-lib-a1b2c3d4e5f67081");
        assert!(bucket.len() <= 63);
        assert!(!bucket.contains('_'));
        assert_eq!(bucket, bucket.to_lowercase());
    }

    #[test]
    fn bucket_name_is_deterministic() {
        let id = Uuid::new_v4();
        assert_eq!(bucket_name_for(id, "p-"), bucket_name_for(id, "p-"));
    }

    #[test]
    fn name_validation() {
        assert!(validate_library_name("Projects").is_ok());
        assert!(validate_library_name("").is_err());
        assert!(validate_library_name("a/b").is_err());
        assert!(validate_library_name(&"x".repeat(300)).is_err());
        assert!(validate_library_name("bad\u{0}name").is_err());
    }
}
