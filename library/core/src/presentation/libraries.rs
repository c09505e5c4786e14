// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Library and directory routes.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::library_service::LibraryUpdate;
use crate::domain::identity::RequestContext;
use crate::error::ServiceError;
use super::state::AppState;

#[derive(Deserialize)]
pub struct CreateLibraryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateLibraryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mcp_write_enabled: Option<bool>,
    #[serde(default)]
    pub max_file_size_bytes: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateDirectoryRequest {
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub name: String,
}

#[derive(Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct MoveDirectoryRequest {
    #[serde(default)]
    pub new_parent_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    pub directory_id: Option<Uuid>,
}

pub async fn create_library(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateLibraryRequest>,
) -> Result<Json<Value>, ServiceError> {
    let library = state.libraries.create(&ctx, payload.name, payload.description).await?;
    Ok(Json(json!({ "library": library })))
}

pub async fn list_libraries(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Value>, ServiceError> {
    let libraries = state.libraries.list(&ctx).await?;
    Ok(Json(json!({ "libraries": libraries })))
}

pub async fn get_library(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(library_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    let library = state.libraries.get(&ctx, library_id).await?;
    let (files, directories, total_size) = state.libraries.stats(&ctx, library_id).await?;
    Ok(Json(json!({
        "library": library,
        "stats": { "files": files, "directories": directories, "total_size_bytes": total_size },
    })))
}

pub async fn update_library(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(library_id): Path<Uuid>,
    Json(payload): Json<UpdateLibraryRequest>,
) -> Result<Json<Value>, ServiceError> {
    let update = LibraryUpdate {
        name: payload.name,
        description: payload.description.map(Some),
        mcp_write_enabled: payload.mcp_write_enabled,
        max_file_size_bytes: payload.max_file_size_bytes.map(Some),
    };
    let library = state.libraries.update(&ctx, library_id, update).await?;
    Ok(Json(json!({ "library": library })))
}

pub async fn delete_library(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(library_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    state.libraries.delete(&ctx, library_id).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub async fn browse_library(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(library_id): Path<Uuid>,
    Query(query): Query<BrowseQuery>,
) -> Result<Json<Value>, ServiceError> {
    let listing = state.directories.browse(&ctx, library_id, query.directory_id).await?;
    Ok(Json(json!({
        "directories": listing.directories,
        "files": listing.files,
    })))
}

pub async fn create_directory(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(library_id): Path<Uuid>,
    Json(payload): Json<CreateDirectoryRequest>,
) -> Result<Json<Value>, ServiceError> {
    let directory = state
        .directories
        .create(&ctx, library_id, payload.parent_id, payload.name)
        .await?;
    Ok(Json(json!({ "directory": directory, "path": directory.full_path() })))
}

pub async fn get_directory(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((library_id, directory_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ServiceError> {
    let directory = state.directories.get(&ctx, library_id, directory_id).await?;
    Ok(Json(json!({ "directory": directory, "path": directory.full_path() })))
}

pub async fn rename_directory(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((library_id, directory_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<Value>, ServiceError> {
    let directory = state
        .directories
        .rename(&ctx, library_id, directory_id, payload.name)
        .await?;
    Ok(Json(json!({ "directory": directory, "path": directory.full_path() })))
}

pub async fn move_directory(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((library_id, directory_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<MoveDirectoryRequest>,
) -> Result<Json<Value>, ServiceError> {
    let directory = state
        .directories
        .move_directory(&ctx, library_id, directory_id, payload.new_parent_id)
        .await?;
    Ok(Json(json!({ "directory": directory, "path": directory.full_path() })))
}

pub async fn delete_directory(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((library_id, directory_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, ServiceError> {
    state.directories.delete(&ctx, library_id, directory_id).await?;
    Ok(Json(json!({ "deleted": true })))
}
