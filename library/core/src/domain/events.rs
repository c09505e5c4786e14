// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Realtime event payloads and channel naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// JSON event delivered over SSE subscriptions. Delivery is best-effort
/// at-most-once within the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl RealtimeEvent {
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Channel for file/directory/share events in one library.
pub fn library_channel(library_id: Uuid) -> String {
    format!("library:{library_id}")
}

/// Channel for one user's notifications.
pub fn user_channel(user_id: Uuid) -> String {
    format!("user:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_naming() {
        let id = Uuid::nil();
        assert_eq!(library_channel(id), format!("library:{id}"));
        assert_eq!(user_channel(id), format!("user:{id}"));
    }
}
