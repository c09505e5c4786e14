// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Share links: issuance, access enforcement, statistics.
//!
//! Tokens carry 256 bits of CSPRNG entropy, URL-safe. Password hashes are
//! salted SHA-256 with a distinct 128-bit salt per record, verified in
//! constant time. Each successful access increments the counter, stamps
//! `last_accessed_at`, appends an audit event, and optionally notifies the
//! owner.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;
use uuid::Uuid;

use crate::domain::audit::actions;
use crate::domain::identity::RequestContext;
use crate::domain::repository::{
    DirectoryRepository, FileRepository, LibraryRepository, ShareRepository,
};
use crate::domain::share::{ShareDenied, ShareLink, ShareTargetType, ShareType};
use crate::error::ServiceError;
use crate::infrastructure::identity_admin::{GuestAccount, IdentityAdmin, IdentityAdminError};
use super::audit_service::AuditService;
use super::notification_service::NotificationService;

const TOKEN_BYTES: usize = 32;
const ACCESS_TOKEN_BYTES: usize = 48;
const SALT_BYTES: usize = 16;

#[derive(Debug, Clone)]
pub struct CreateShareRequest {
    pub target_type: ShareTargetType,
    pub target_id: Uuid,
    pub share_type: ShareType,
    pub password: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_access_count: Option<i64>,
    pub allow_guest_access: bool,
    pub notify_on_access: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareAccessResponse {
    pub access_token: String,
    pub share_type: ShareType,
    pub target_type: ShareTargetType,
    pub target_id: Uuid,
    pub target_name: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareStatistics {
    pub share_id: Uuid,
    pub total_accesses: i64,
    pub unique_visitors: usize,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub access_by_date: HashMap<String, i64>,
}

/// Generate a URL-safe token with `bytes` of CSPRNG entropy.
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Salted SHA-256, `salt:digest` hex form. The salt is distinct per record.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::rng().fill_bytes(&mut salt);
    let salt_hex = hex::encode(salt);
    let digest = Sha256::digest(format!("{salt_hex}{password}").as_bytes());
    format!("{salt_hex}:{}", hex::encode(digest))
}

/// Constant-time verification.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Some((salt, expected_hex)) = password_hash.split_once(':') else {
        return false;
    };
    let Ok(expected) = hex::decode(expected_hex) else {
        return false;
    };
    let actual = Sha256::digest(format!("{salt}{password}").as_bytes());
    actual.as_slice().ct_eq(&expected).into()
}

pub struct ShareService {
    shares: Arc<dyn ShareRepository>,
    files: Arc<dyn FileRepository>,
    directories: Arc<dyn DirectoryRepository>,
    libraries: Arc<dyn LibraryRepository>,
    audit: Arc<AuditService>,
    notifications: Arc<NotificationService>,
    /// Guest provisioning; absent when no identity admin is configured.
    identity: Option<Arc<dyn IdentityAdmin>>,
    base_url: String,
    max_expiry_days: i64,
    default_expiry_days: Option<i64>,
}

impl ShareService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        shares: Arc<dyn ShareRepository>,
        files: Arc<dyn FileRepository>,
        directories: Arc<dyn DirectoryRepository>,
        libraries: Arc<dyn LibraryRepository>,
        audit: Arc<AuditService>,
        notifications: Arc<NotificationService>,
        identity: Option<Arc<dyn IdentityAdmin>>,
        base_url: String,
        max_expiry_days: i64,
        default_expiry_days: Option<i64>,
    ) -> Self {
        Self {
            shares,
            files,
            directories,
            libraries,
            audit,
            notifications,
            identity,
            base_url,
            max_expiry_days,
            default_expiry_days,
        }
    }

    /// Provision a guest account for a share that allows guest access.
    pub async fn provision_guest(
        &self,
        ctx: &RequestContext,
        share_id: Uuid,
        email: &str,
    ) -> Result<GuestAccount, ServiceError> {
        let share = self.get(ctx, share_id).await?;
        if !share.allow_guest_access {
            return Err(ServiceError::Validation(
                "this share link does not allow guest access".into(),
            ));
        }
        let identity = self
            .identity
            .as_ref()
            .ok_or_else(|| ServiceError::Validation("guest provisioning is not configured".into()))?;

        identity
            .create_guest_account(email, share_id)
            .await
            .map_err(|e| match e {
                IdentityAdminError::AlreadyExists => ServiceError::conflict(e.to_string()),
                IdentityAdminError::Unavailable(m) => ServiceError::Transient(m),
                IdentityAdminError::Rejected(m) => ServiceError::Validation(m),
            })
    }

    pub fn share_url(&self, token: &str) -> String {
        format!("{}/share/{token}", self.base_url.trim_end_matches('/'))
    }

    /// Resolve a share target to (name, library id). Errors if the target
    /// is absent or soft-deleted.
    async fn resolve_target(
        &self,
        target_type: ShareTargetType,
        target_id: Uuid,
    ) -> Result<(String, Uuid), ServiceError> {
        match target_type {
            ShareTargetType::File => {
                let file = self
                    .files
                    .find_by_id(target_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("file".into()))?;
                Ok((file.filename, file.library_id))
            }
            ShareTargetType::Directory => {
                let dir = self
                    .directories
                    .find_any_by_id(target_id)
                    .await?
                    .filter(|d| !d.is_deleted)
                    .ok_or_else(|| ServiceError::NotFound("directory".into()))?;
                Ok((dir.name, dir.library_id))
            }
            ShareTargetType::Library => {
                let library = self
                    .libraries
                    .find_by_id(target_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("library".into()))?;
                Ok((library.name, library.id))
            }
        }
    }

    async fn check_owner(&self, ctx: &RequestContext, library_id: Uuid) -> Result<(), ServiceError> {
        let library = self
            .libraries
            .find_by_id(library_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("library".into()))?;
        if library.owner_id != ctx.user.user_id && !ctx.user.is_admin() {
            return Err(ServiceError::Forbidden("access denied".into()));
        }
        Ok(())
    }

    pub async fn create(&self, ctx: &RequestContext, request: CreateShareRequest) -> Result<ShareLink, ServiceError> {
        let (target_name, library_id) = self.resolve_target(request.target_type, request.target_id).await?;
        self.check_owner(ctx, library_id).await?;

        let now = Utc::now();
        let expires_at = match request.expires_at {
            Some(at) => {
                if at <= now {
                    return Err(ServiceError::Validation("expiry must be in the future".into()));
                }
                if at > now + chrono::Duration::days(self.max_expiry_days) {
                    return Err(ServiceError::Validation(format!(
                        "expiry exceeds the maximum of {} days",
                        self.max_expiry_days
                    )));
                }
                Some(at)
            }
            None => self
                .default_expiry_days
                .map(|days| now + chrono::Duration::days(days)),
        };

        if request.max_access_count.is_some_and(|c| c <= 0) {
            return Err(ServiceError::Validation("max_access_count must be positive".into()));
        }

        let share = ShareLink {
            id: Uuid::new_v4(),
            token: generate_token(TOKEN_BYTES),
            share_type: request.share_type,
            target_type: request.target_type,
            target_id: request.target_id,
            created_by: ctx.user.user_id,
            password_hash: request.password.as_deref().map(hash_password),
            expires_at,
            max_access_count: request.max_access_count,
            access_count: 0,
            allow_guest_access: request.allow_guest_access,
            notify_on_access: request.notify_on_access,
            is_active: true,
            last_accessed_at: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        };

        self.shares.insert(&share).await?;

        self.audit
            .log_user_action(
                ctx,
                actions::SHARE_CREATED,
                share.target_type.as_str(),
                share.target_id,
                Some(library_id),
                json!({
                    "share_id": share.id,
                    "share_type": share.share_type.as_str(),
                    "expires_at": share.expires_at,
                    "max_access_count": share.max_access_count,
                }),
            )
            .await;

        if let Err(e) = self
            .notifications
            .notify_share_created(ctx.user.user_id, &target_name, share.id)
            .await
        {
            warn!(share_id = %share.id, error = %e, "share-created notification failed");
        }

        Ok(share)
    }

    pub async fn get(&self, ctx: &RequestContext, share_id: Uuid) -> Result<ShareLink, ServiceError> {
        let share = self
            .shares
            .find_by_id(share_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("share link".into()))?;
        if share.created_by != ctx.user.user_id && !ctx.user.is_admin() {
            return Err(ServiceError::Forbidden("access denied".into()));
        }
        Ok(share)
    }

    pub async fn list_for_target(
        &self,
        ctx: &RequestContext,
        target_type: ShareTargetType,
        target_id: Uuid,
    ) -> Result<Vec<ShareLink>, ServiceError> {
        Ok(self
            .shares
            .list_for_target(target_type.as_str(), target_id, ctx.user.user_id)
            .await?)
    }

    pub async fn list_for_user(
        &self,
        ctx: &RequestContext,
        include_expired: bool,
    ) -> Result<Vec<ShareLink>, ServiceError> {
        Ok(self.shares.list_for_user(ctx.user.user_id, include_expired).await?)
    }

    pub async fn revoke(&self, ctx: &RequestContext, share_id: Uuid) -> Result<(), ServiceError> {
        if !self.shares.deactivate(share_id, ctx.user.user_id).await? {
            return Err(ServiceError::NotFound("share link".into()));
        }
        let share = self.shares.find_by_id(share_id).await?;
        if let Some(share) = share {
            self.audit
                .log_user_action(
                    ctx,
                    actions::SHARE_REVOKED,
                    share.target_type.as_str(),
                    share.target_id,
                    None,
                    json!({ "share_id": share_id }),
                )
                .await;
        }
        Ok(())
    }

    pub async fn delete(&self, ctx: &RequestContext, share_id: Uuid) -> Result<(), ServiceError> {
        if !self.shares.soft_delete(share_id, ctx.user.user_id, Utc::now()).await? {
            return Err(ServiceError::NotFound("share link".into()));
        }
        self.audit
            .log_user_action(
                ctx,
                actions::SHARE_DELETED,
                "share_link",
                share_id,
                None,
                json!({ "share_id": share_id }),
            )
            .await;
        Ok(())
    }

    /// Access a shared resource. On success, issues a short-lived opaque
    /// access token (1 h for view, 24 h for download/edit) and increments
    /// the access counter. Failures are typed and non-retriable.
    pub async fn access(
        &self,
        token: &str,
        password: Option<&str>,
        visitor_ip: Option<String>,
        correlation_id: Uuid,
    ) -> Result<ShareAccessResponse, ServiceError> {
        let share = self
            .shares
            .find_by_token(token)
            .await?
            .ok_or_else(|| ServiceError::NotFound("share link".into()))?;

        let now = Utc::now();
        share.check_accessible(now).map_err(|denied| match denied {
            ShareDenied::Revoked => ServiceError::NotFound("share link".into()),
            ShareDenied::Expired => ServiceError::Forbidden("share link has expired".into()),
            ShareDenied::Exhausted => ServiceError::LimitExceeded {
                message: "share link access limit reached".into(),
                remaining: Some(0),
            },
            // Unreachable here; password checks come next.
            other => ServiceError::Forbidden(format!("{other:?}")),
        })?;

        if let Some(hash) = &share.password_hash {
            let Some(password) = password else {
                return Err(ServiceError::Forbidden("password required".into()));
            };
            if !verify_password(password, hash) {
                return Err(ServiceError::Forbidden("invalid password".into()));
            }
        }

        let (target_name, library_id) = self.resolve_target(share.target_type, share.target_id).await?;

        self.shares.record_access(share.id, now).await?;
        let access_count = share.access_count + 1;

        self.audit
            .log_system_action(
                correlation_id,
                actions::SHARE_ACCESSED,
                "share_link",
                share.id,
                Some(library_id),
                json!({
                    "target_type": share.target_type.as_str(),
                    "target_id": share.target_id,
                    "visitor_ip": visitor_ip,
                    "access_count": access_count,
                }),
            )
            .await;

        if share.notify_on_access {
            if let Err(e) = self
                .notifications
                .notify_share_accessed(share.created_by, None, &target_name, share.id, access_count)
                .await
            {
                warn!(share_id = %share.id, error = %e, "share-access notification failed");
            }
        }

        Ok(ShareAccessResponse {
            access_token: generate_token(ACCESS_TOKEN_BYTES),
            share_type: share.share_type,
            target_type: share.target_type,
            target_id: share.target_id,
            target_name,
            expires_at: now + share.share_type.access_token_lifetime(),
        })
    }

    pub async fn statistics(&self, ctx: &RequestContext, share_id: Uuid) -> Result<ShareStatistics, ServiceError> {
        let share = self.get(ctx, share_id).await?;

        let events = self
            .audit
            .events_for_target("share_link", share_id, 1000)
            .await?;

        let mut access_by_date: HashMap<String, i64> = HashMap::new();
        let mut unique_ips: HashSet<String> = HashSet::new();
        for event in events.iter().filter(|e| e.action == actions::SHARE_ACCESSED) {
            *access_by_date
                .entry(event.timestamp.format("%Y-%m-%d").to_string())
                .or_insert(0) += 1;
            if let Some(ip) = event.details.get("visitor_ip").and_then(|v| v.as_str()) {
                unique_ips.insert(ip.to_string());
            }
        }

        Ok(ShareStatistics {
            share_id,
            total_accesses: share.access_count,
            unique_visitors: unique_ips.len(),
            last_accessed_at: share.last_accessed_at,
            access_by_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_unique() {
        let a = generate_token(TOKEN_BYTES);
        let b = generate_token(TOKEN_BYTES);
        assert_ne!(a, b);
        // 32 bytes → 43 base64url chars, no padding.
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("s3cret");
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn salts_are_distinct_per_record() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("x", "no-colon"));
        assert!(!verify_password("x", "salt:not-hex!"));
        assert!(!verify_password("x", ""));
    }
}
