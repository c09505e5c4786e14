// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Share links: external capability grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareType {
    View,
    Download,
    Edit,
}

impl ShareType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareType::View => "view",
            ShareType::Download => "download",
            ShareType::Edit => "edit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view" => Some(ShareType::View),
            "download" => Some(ShareType::Download),
            "edit" => Some(ShareType::Edit),
            _ => None,
        }
    }

    /// Lifetime of the short-lived access token issued on successful
    /// share access: one hour for view, a day for download/edit.
    pub fn access_token_lifetime(&self) -> chrono::Duration {
        match self {
            ShareType::View => chrono::Duration::hours(1),
            ShareType::Download | ShareType::Edit => chrono::Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareTargetType {
    File,
    Directory,
    Library,
}

impl ShareTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareTargetType::File => "file",
            ShareTargetType::Directory => "directory",
            ShareTargetType::Library => "library",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(ShareTargetType::File),
            "directory" => Some(ShareTargetType::Directory),
            "library" => Some(ShareTargetType::Library),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    pub id: Uuid,
    /// Unguessable URL-safe token, ≥256 bits of entropy.
    pub token: String,
    pub share_type: ShareType,
    pub target_type: ShareTargetType,
    pub target_id: Uuid,
    pub created_by: Uuid,
    /// `salt:digest`, salt ≥128 bits, distinct per record.
    pub password_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_access_count: Option<i64>,
    pub access_count: i64,
    pub allow_guest_access: bool,
    pub notify_on_access: bool,
    pub is_active: bool,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why an access attempt against a share link failed. These are terminal —
/// retrying the same request cannot succeed (except with a new password).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareDenied {
    Revoked,
    Expired,
    Exhausted,
    PasswordRequired,
    PasswordInvalid,
}

impl ShareLink {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }

    pub fn remaining_accesses(&self) -> Option<i64> {
        self.max_access_count.map(|max| (max - self.access_count).max(0))
    }

    /// Evaluate the accessibility predicate, password verification aside:
    /// active ∧ not expired ∧ not exhausted.
    pub fn check_accessible(&self, now: DateTime<Utc>) -> Result<(), ShareDenied> {
        if !self.is_active || self.is_deleted {
            return Err(ShareDenied::Revoked);
        }
        if self.is_expired(now) {
            return Err(ShareDenied::Expired);
        }
        if let Some(max) = self.max_access_count {
            if self.access_count >= max {
                return Err(ShareDenied::Exhausted);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> ShareLink {
        let now = Utc::now();
        ShareLink {
            id: Uuid::new_v4(),
            token: "tok".into(),
            share_type: ShareType::View,
            target_type: ShareTargetType::File,
            target_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            password_hash: None,
            expires_at: None,
            max_access_count: None,
            access_count: 0,
            allow_guest_access: false,
            notify_on_access: false,
            is_active: true,
            last_accessed_at: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_unexpired_link_is_accessible() {
        assert!(link().check_accessible(Utc::now()).is_ok());
    }

    #[test]
    fn revoked_link_is_denied() {
        let mut l = link();
        l.is_active = false;
        assert_eq!(l.check_accessible(Utc::now()), Err(ShareDenied::Revoked));
    }

    #[test]
    fn expired_link_is_denied() {
        let mut l = link();
        l.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        assert_eq!(l.check_accessible(Utc::now()), Err(ShareDenied::Expired));
    }

    #[test]
    fn exhausted_link_is_denied() {
        let mut l = link();
        l.max_access_count = Some(2);
        l.access_count = 2;
        assert_eq!(l.check_accessible(Utc::now()), Err(ShareDenied::Exhausted));
        assert_eq!(l.remaining_accesses(), Some(0));
    }

    #[test]
    fn token_lifetimes_by_share_type() {
        assert_eq!(ShareType::View.access_token_lifetime(), chrono::Duration::hours(1));
        assert_eq!(ShareType::Download.access_token_lifetime(), chrono::Duration::hours(24));
        assert_eq!(ShareType::Edit.access_token_lifetime(), chrono::Duration::hours(24));
    }
}
