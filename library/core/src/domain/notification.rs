// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ShareCreated,
    ShareAccessed,
    FileUploaded,
    TrashExpiring,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ShareCreated => "share_created",
            NotificationType::ShareAccessed => "share_accessed",
            NotificationType::FileUploaded => "file_uploaded",
            NotificationType::TrashExpiring => "trash_expiring",
            NotificationType::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "share_created" => Some(NotificationType::ShareCreated),
            "share_accessed" => Some(NotificationType::ShareAccessed),
            "file_uploaded" => Some(NotificationType::FileUploaded),
            "trash_expiring" => Some(NotificationType::TrashExpiring),
            "system" => Some(NotificationType::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            is_read: false,
            resource_type: None,
            resource_id: None,
            data: Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_resource(mut self, resource_type: impl Into<String>, resource_id: Uuid) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}
