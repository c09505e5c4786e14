// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Router assembly.
//!
//! Pipeline layers, outermost first: correlation → versioning → (auth on
//! the protected subtree). Share access, the agent tool transports, and
//! the health probe are public; the agent transports authenticate via
//! policy + rate limiting on `X-Agent-ID` instead of bearer tokens.

use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::{middleware as axum_middleware, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::middleware::{auth_middleware, correlation_middleware, versioning_middleware};
use super::state::AppState;
use super::{files, libraries, mcp, realtime, shares};

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "alexandria" }))
}

pub fn app(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        // Libraries
        .route("/libraries", post(libraries::create_library).get(libraries::list_libraries))
        .route(
            "/libraries/{library_id}",
            get(libraries::get_library)
                .patch(libraries::update_library)
                .delete(libraries::delete_library),
        )
        .route("/libraries/{library_id}/browse", get(libraries::browse_library))
        // Directories
        .route("/libraries/{library_id}/directories", post(libraries::create_directory))
        .route(
            "/libraries/{library_id}/directories/{directory_id}",
            get(libraries::get_directory)
                .patch(libraries::rename_directory)
                .delete(libraries::delete_directory),
        )
        .route(
            "/libraries/{library_id}/directories/{directory_id}/move",
            post(libraries::move_directory),
        )
        // Upload state machine
        .route("/files/upload/init", post(files::init_upload))
        .route("/files/upload/part", post(files::upload_part))
        .route("/files/upload/complete", post(files::complete_upload))
        .route("/files/upload/abort", post(files::abort_upload))
        // Files
        .route("/files/search", get(files::search_files))
        .route(
            "/files/{file_id}",
            get(files::get_file).patch(files::rename_file).delete(files::delete_file),
        )
        .route("/files/{file_id}/download", get(files::download_file))
        .route("/files/{file_id}/move", post(files::move_file))
        .route("/files/{file_id}/versions", get(files::file_versions))
        // Shares
        .route("/shares", post(shares::create_share).get(shares::list_shares))
        .route("/shares/{share_id}", get(shares::get_share).delete(shares::delete_share))
        .route("/shares/{share_id}/statistics", get(shares::share_statistics))
        .route("/shares/{share_id}/revoke", post(shares::revoke_share))
        .route("/shares/{share_id}/guest", post(shares::provision_guest))
        // Trash
        .route("/trash", get(shares::list_trash))
        .route("/trash/restore", post(shares::restore_item))
        .route("/trash/purge", post(shares::purge_item))
        .route("/trash/empty", post(shares::empty_trash))
        // Audit
        .route("/audit/libraries/{library_id}", get(shares::library_audit))
        .route("/audit/correlation/{correlation_id}", get(shares::correlation_audit))
        // Notifications
        .route(
            "/notifications",
            get(shares::list_notifications),
        )
        .route("/notifications/read-all", post(shares::mark_all_notifications_read))
        .route(
            "/notifications/{notification_id}",
            delete(shares::delete_notification),
        )
        .route(
            "/notifications/{notification_id}/read",
            post(shares::mark_notification_read),
        )
        // Realtime
        .route("/realtime/libraries/{library_id}", get(realtime::library_events))
        .route("/realtime/notifications", get(realtime::notification_events))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    let public = Router::new()
        .route("/share/{token}/access", post(shares::access_share))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/mcp/tools/{name}", post(mcp::call_tool))
        .route("/mcp/sse", get(mcp::sse_transport))
        .route("/healthz", get(health));

    let prefix = if state.settings.api_prefix.is_empty() {
        "/api".to_string()
    } else {
        state.settings.api_prefix.clone()
    };

    let origins: Vec<HeaderValue> = state
        .settings
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest(&prefix, protected.merge(public))
        .layer(cors)
        .layer(axum_middleware::from_fn(versioning_middleware))
        .layer(axum_middleware::from_fn(correlation_middleware))
        .with_state(state)
}
