// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pending upload records.
//!
//! The upload registry is process-local: records are not durable across
//! restarts, and callers must be able to retry a failed upload from
//! `init`. Everything completion needs is captured at init time.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One uploaded part of a multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartRecord {
    pub part_number: i32,
    pub etag: String,
    pub size_bytes: u64,
}

/// How `init` resolves a filename collision in the destination directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDuplicate {
    Ask,
    Overwrite,
    Rename,
}

impl Default for OnDuplicate {
    fn default() -> Self {
        OnDuplicate::Ask
    }
}

/// State of an in-flight upload, keyed by `upload_id` in the registry.
///
/// Single-part uploads buffer their bytes in `data`; multipart uploads
/// accumulate `parts` while the object store holds the part data.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub upload_id: String,
    pub file_id: Uuid,
    pub library_id: Uuid,
    pub directory_id: Option<Uuid>,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub bucket: String,
    pub user_id: Uuid,
    pub dir_path: String,
    /// Set when the upload overwrites an existing file; completion bumps
    /// its `current_version` instead of inserting a new file row.
    pub existing_file_id: Option<Uuid>,
    pub multipart: bool,
    pub parts: Vec<PartRecord>,
    pub data: Option<Bytes>,
    pub created_at: DateTime<Utc>,
}
