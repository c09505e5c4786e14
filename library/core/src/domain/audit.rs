// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Immutable audit events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    Ai,
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::User => "user",
            ActorType::Ai => "ai",
            ActorType::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ActorType::User),
            "ai" => Some(ActorType::Ai),
            "system" => Some(ActorType::System),
            _ => None,
        }
    }
}

/// Audit action names. String constants rather than an enum so adapters
/// and dashboards can add actions without schema churn.
pub mod actions {
    pub const LIBRARY_CREATE: &str = "library_create";
    pub const LIBRARY_UPDATE: &str = "library_update";
    pub const LIBRARY_DELETE: &str = "library_delete";
    pub const DIRECTORY_CREATE: &str = "directory_create";
    pub const DIRECTORY_RENAME: &str = "directory_rename";
    pub const DIRECTORY_MOVE: &str = "directory_move";
    pub const DIRECTORY_DELETE: &str = "directory_delete";
    pub const FILE_UPLOAD: &str = "file_upload";
    pub const FILE_DOWNLOAD: &str = "file_download";
    pub const FILE_RENAME: &str = "file_rename";
    pub const FILE_MOVE: &str = "file_move";
    pub const FILE_DELETE: &str = "file_delete";
    pub const FILE_RESTORE: &str = "file_restore";
    pub const DIRECTORY_RESTORE: &str = "directory_restore";
    pub const TRASH_PURGE: &str = "trash_purge";
    pub const SHARE_CREATED: &str = "share_created";
    pub const SHARE_UPDATED: &str = "share_updated";
    pub const SHARE_REVOKED: &str = "share_revoked";
    pub const SHARE_DELETED: &str = "share_deleted";
    pub const SHARE_ACCESSED: &str = "share_accessed";
    pub const MCP_TOOL_CALL: &str = "mcp_tool_call";
}

/// One append-only audit row. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor_type: ActorType,
    pub actor_id: Uuid,
    pub actor_name: Option<String>,
    pub action: String,
    pub target_type: String,
    pub target_id: Uuid,
    pub library_id: Option<Uuid>,
    pub details: Value,
    pub correlation_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl AuditEvent {
    pub fn new(
        actor_type: ActorType,
        actor_id: Uuid,
        action: impl Into<String>,
        target_type: impl Into<String>,
        target_id: Uuid,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_type,
            actor_id,
            actor_name: None,
            action: action.into(),
            target_type: target_type.into(),
            target_id,
            library_id: None,
            details: Value::Null,
            correlation_id,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_library(mut self, library_id: Uuid) -> Self {
        self.library_id = Some(library_id);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_actor_name(mut self, name: impl Into<String>) -> Self {
        self.actor_name = Some(name.into());
        self
    }
}
