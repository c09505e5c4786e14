// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Share, trash, audit, and notification routes.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::share_service::CreateShareRequest;
use crate::application::trash_service::RestoreRequest;
use crate::domain::identity::RequestContext;
use crate::domain::share::{ShareTargetType, ShareType};
use crate::domain::trash::TrashItemType;
use crate::error::ServiceError;
use super::middleware::CorrelationId;
use super::state::AppState;

// ---------------------------------------------------------------------------
// Shares
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateShareBody {
    pub target_type: ShareTargetType,
    pub target_id: Uuid,
    pub share_type: ShareType,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_access_count: Option<i64>,
    #[serde(default)]
    pub allow_guest_access: bool,
    #[serde(default)]
    pub notify_on_access: bool,
}

#[derive(Deserialize)]
pub struct AccessShareBody {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ListSharesQuery {
    #[serde(default)]
    pub include_expired: bool,
}

fn share_view(state: &AppState, share: &crate::domain::share::ShareLink) -> Value {
    json!({
        "id": share.id,
        "token": share.token,
        "share_type": share.share_type,
        "target_type": share.target_type,
        "target_id": share.target_id,
        "password_protected": share.password_hash.is_some(),
        "expires_at": share.expires_at,
        "max_access_count": share.max_access_count,
        "access_count": share.access_count,
        "remaining_accesses": share.remaining_accesses(),
        "allow_guest_access": share.allow_guest_access,
        "notify_on_access": share.notify_on_access,
        "is_active": share.is_active,
        "is_expired": share.is_expired(Utc::now()),
        "share_url": state.shares.share_url(&share.token),
        "created_at": share.created_at,
    })
}

pub async fn create_share(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateShareBody>,
) -> Result<Json<Value>, ServiceError> {
    let share = state
        .shares
        .create(
            &ctx,
            CreateShareRequest {
                target_type: payload.target_type,
                target_id: payload.target_id,
                share_type: payload.share_type,
                password: payload.password,
                expires_at: payload.expires_at,
                max_access_count: payload.max_access_count,
                allow_guest_access: payload.allow_guest_access,
                notify_on_access: payload.notify_on_access,
            },
        )
        .await?;
    Ok(Json(json!({ "share": share_view(&state, &share) })))
}

pub async fn list_shares(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListSharesQuery>,
) -> Result<Json<Value>, ServiceError> {
    let shares = state.shares.list_for_user(&ctx, query.include_expired).await?;
    let views: Vec<Value> = shares.iter().map(|s| share_view(&state, s)).collect();
    Ok(Json(json!({ "shares": views })))
}

pub async fn get_share(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(share_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    let share = state.shares.get(&ctx, share_id).await?;
    Ok(Json(json!({ "share": share_view(&state, &share) })))
}

pub async fn share_statistics(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(share_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    let stats = state.shares.statistics(&ctx, share_id).await?;
    Ok(Json(json!({ "statistics": stats })))
}

#[derive(Deserialize)]
pub struct ProvisionGuestBody {
    pub email: String,
}

pub async fn provision_guest(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(share_id): Path<Uuid>,
    Json(payload): Json<ProvisionGuestBody>,
) -> Result<Json<Value>, ServiceError> {
    let guest = state.shares.provision_guest(&ctx, share_id, &payload.email).await?;
    Ok(Json(json!({
        "guest_id": guest.guest_id,
        "email": guest.email,
        "temporary_password": guest.temporary_password,
        "login_url": guest.login_url,
    })))
}

pub async fn revoke_share(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(share_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    state.shares.revoke(&ctx, share_id).await?;
    Ok(Json(json!({ "revoked": true })))
}

pub async fn delete_share(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(share_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    state.shares.delete(&ctx, share_id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// Public: no bearer token required; the share token is the capability.
pub async fn access_share(
    State(state): State<Arc<AppState>>,
    Extension(correlation): Extension<CorrelationId>,
    Path(token): Path<String>,
    Json(payload): Json<AccessShareBody>,
) -> Result<Json<Value>, ServiceError> {
    let response = state
        .shares
        .access(&token, payload.password.as_deref(), None, correlation.0)
        .await?;
    Ok(Json(json!(response)))
}

// ---------------------------------------------------------------------------
// Trash
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct TrashQuery {
    #[serde(default)]
    pub library_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Deserialize)]
pub struct RestoreBody {
    pub item_type: TrashItemType,
    pub item_id: Uuid,
    #[serde(default = "default_true")]
    pub restore_to_original: bool,
    #[serde(default)]
    pub new_parent_id: Option<Uuid>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
pub struct PurgeBody {
    pub item_type: TrashItemType,
    pub item_id: Uuid,
}

#[derive(Deserialize)]
pub struct EmptyTrashBody {
    #[serde(default)]
    pub library_id: Option<Uuid>,
}

pub async fn list_trash(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<TrashQuery>,
) -> Result<Json<Value>, ServiceError> {
    let (items, total, total_size) = state
        .trash
        .list(&ctx, query.library_id, query.limit, query.offset)
        .await?;
    Ok(Json(json!({ "items": items, "total": total, "total_size_bytes": total_size })))
}

pub async fn restore_item(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<RestoreBody>,
) -> Result<Json<Value>, ServiceError> {
    let restored_path = state
        .trash
        .restore(
            &ctx,
            RestoreRequest {
                item_type: payload.item_type,
                item_id: payload.item_id,
                restore_to_original: payload.restore_to_original,
                new_parent_id: payload.new_parent_id,
            },
        )
        .await?;
    Ok(Json(json!({ "restored_path": restored_path })))
}

pub async fn purge_item(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<PurgeBody>,
) -> Result<Json<Value>, ServiceError> {
    state
        .trash
        .permanent_delete(&ctx, payload.item_type, payload.item_id)
        .await?;
    Ok(Json(json!({ "purged": true })))
}

pub async fn empty_trash(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<EmptyTrashBody>,
) -> Result<Json<Value>, ServiceError> {
    let purged = state.trash.empty_trash(&ctx, payload.library_id).await?;
    Ok(Json(json!({ "purged": purged })))
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_audit_limit() -> i64 {
    100
}

pub async fn library_audit(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(library_id): Path<Uuid>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Value>, ServiceError> {
    // Visibility piggybacks on library access.
    state.libraries.get(&ctx, library_id).await?;
    let events = state
        .audit
        .events_for_library(library_id, query.limit.clamp(1, 1000), query.offset.max(0))
        .await?;
    Ok(Json(json!({ "events": events })))
}

pub async fn correlation_audit(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(correlation_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    if !ctx.user.is_admin() {
        return Err(ServiceError::Forbidden("admin role required".into()));
    }
    let events = state.audit.events_for_correlation(correlation_id).await?;
    Ok(Json(json!({ "events": events })))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_limit_i64")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit_i64() -> i64 {
    50
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Value>, ServiceError> {
    let notifications = state
        .notifications
        .list(ctx.user.user_id, query.unread_only, query.limit.clamp(1, 200), query.offset.max(0))
        .await?;
    let unread = state.notifications.unread_count(ctx.user.user_id).await?;
    Ok(Json(json!({ "notifications": notifications, "unread_count": unread })))
}

pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    state
        .notifications
        .mark_read(notification_id, ctx.user.user_id)
        .await?;
    Ok(Json(json!({ "read": true })))
}

pub async fn mark_all_notifications_read(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Value>, ServiceError> {
    let updated = state.notifications.mark_all_read(ctx.user.user_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    state
        .notifications
        .delete(notification_id, ctx.user.user_id)
        .await?;
    Ok(Json(json!({ "deleted": true })))
}
