// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Directory: an internal node of the namespace tree.
//!
//! `path` is denormalized — it holds the parent's full path (`/` at the
//! root), so `full_path()` is `path` + `name`. Rename and move must rewrite
//! `path` on every descendant directory and file; that rewrite lives in the
//! directory repository so it commits in one transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directory {
    pub id: Uuid,
    pub library_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    /// The parent directory's full path; `/` for root-level directories.
    pub path: String,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Directory {
    pub fn new(
        library_id: Uuid,
        parent_id: Option<Uuid>,
        name: String,
        parent_path: String,
        created_by: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            library_id,
            parent_id,
            name,
            path: parent_path,
            created_by,
            updated_by: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Full path of this directory: the concatenation of ancestor names.
    pub fn full_path(&self) -> String {
        join_path(&self.path, &self.name)
    }
}

/// Join a parent path with a child name, normalizing the root case.
pub fn join_path(parent_path: &str, name: &str) -> String {
    if parent_path == "/" || parent_path.is_empty() {
        format!("/{name}")
    } else {
        format!("{}/{}", parent_path.trim_end_matches('/'), name)
    }
}

/// Normalize a user-supplied path to `/`-rooted form without empty segments.
pub fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}

/// Directory names are single path components.
pub fn validate_directory_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("directory name must not be empty".into());
    }
    if name.len() > 255 {
        return Err("directory name must be at most 255 characters".into());
    }
    if name.contains('/') || name == "." || name == ".." || name.chars().any(char::is_control) {
        return Err("invalid directory name".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(name: &str, path: &str) -> Directory {
        Directory::new(Uuid::new_v4(), None, name.into(), path.into(), Uuid::new_v4())
    }

    #[test]
    fn full_path_at_root() {
        assert_eq!(dir("docs", "/").full_path(), "/docs");
    }

    #[test]
    fn full_path_nested() {
        assert_eq!(dir("reports", "/docs/2026").full_path(), "/docs/2026/reports");
    }

    #[test]
    fn path_normalization() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("a/b/"), "/a/b");
        assert_eq!(normalize_path("//a///b"), "/a/b");
    }

    #[test]
    fn name_validation() {
        assert!(validate_directory_name("reports").is_ok());
        assert!(validate_directory_name("").is_err());
        assert!(validate_directory_name("a/b").is_err());
        assert!(validate_directory_name("..").is_err());
    }
}
