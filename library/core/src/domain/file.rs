// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! File metadata and immutable version rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for a versioned blob. The blob itself lives in the object
/// store under `storage_key`; `current_version` always equals the highest
/// `version_number` among the file's versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub id: Uuid,
    pub library_id: Uuid,
    /// `None` means the file sits at the library root.
    pub directory_id: Option<Uuid>,
    pub filename: String,
    /// Denormalized full path of the parent directory (`/` at root).
    pub path: String,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub content_type: String,
    pub storage_key: String,
    pub current_version: i32,
    pub created_by: Uuid,
    pub modified_by: Uuid,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Full user-facing path including the filename.
    pub fn full_path(&self) -> String {
        super::directory::join_path(&self.path, &self.filename)
    }
}

/// An immutable historical blob reference. Never mutated once written; its
/// `storage_key` is never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    pub id: Uuid,
    pub file_id: Uuid,
    pub version_number: i32,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub comment: Option<String>,
}

impl FileVersion {
    pub fn new(
        file_id: Uuid,
        version_number: i32,
        size_bytes: i64,
        checksum_sha256: String,
        storage_key: String,
        created_by: Uuid,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_id,
            version_number,
            size_bytes,
            checksum_sha256,
            storage_key,
            created_at: Utc::now(),
            created_by,
            comment,
        }
    }
}

/// Filenames are single path components, 1..=255 chars.
pub fn validate_filename(filename: &str) -> Result<(), String> {
    if filename.is_empty() {
        return Err("filename must not be empty".into());
    }
    if filename.len() > 255 {
        return Err("filename must be at most 255 characters".into());
    }
    if filename.contains('/') || filename == "." || filename == ".." {
        return Err("invalid filename".into());
    }
    if filename.chars().any(char::is_control) {
        return Err("filename must not contain control characters".into());
    }
    Ok(())
}

/// Propose a unique name for a duplicate: `{stem}_{epoch}.{ext}`.
pub fn unique_filename(filename: &str, epoch_seconds: i64) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{epoch_seconds}.{ext}"),
        _ => format!("{filename}_{epoch_seconds}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_validation() {
        assert!(validate_filename("report.pdf").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("a/b.txt").is_err());
        assert!(validate_filename(&"x".repeat(256)).is_err());
        assert!(validate_filename("..").is_err());
    }

    #[test]
    fn unique_name_keeps_extension() {
        assert_eq!(unique_filename("q1.pdf", 1700000000), "q1_1700000000.pdf");
        assert_eq!(unique_filename("README", 1700000000), "README_1700000000");
        assert_eq!(unique_filename(".env", 1700000000), ".env_1700000000");
    }

    #[test]
    fn full_path_composes_with_directory_path() {
        let mut file = FileMetadata {
            id: Uuid::new_v4(),
            library_id: Uuid::new_v4(),
            directory_id: None,
            filename: "notes.md".into(),
            path: "/".into(),
            size_bytes: 0,
            checksum_sha256: String::new(),
            content_type: "text/markdown".into(),
            storage_key: String::new(),
            current_version: 1,
            created_by: Uuid::new_v4(),
            modified_by: Uuid::new_v4(),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(file.full_path(), "/notes.md");
        file.path = "/docs".into();
        assert_eq!(file.full_path(), "/docs/notes.md");
    }
}
