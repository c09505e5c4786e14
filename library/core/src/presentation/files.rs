// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! File routes: upload state machine, download, rename/move/delete,
//! versions, name search.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::file_service::{InitUploadOutcome, InitUploadRequest};
use crate::domain::identity::RequestContext;
use crate::domain::upload::{OnDuplicate, PartRecord};
use crate::error::ServiceError;
use super::state::AppState;

const DOWNLOAD_CHUNK: usize = 1024 * 1024;

#[derive(Deserialize)]
pub struct InitUploadQuery {
    pub library_id: Uuid,
    pub filename: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(default)]
    pub directory_id: Option<Uuid>,
    #[serde(default)]
    pub on_duplicate: OnDuplicate,
}

fn default_content_type() -> String {
    "application/octet-stream".to_string()
}

#[derive(Deserialize)]
pub struct UploadPartQuery {
    pub upload_id: String,
    pub part_number: i32,
}

#[derive(Deserialize)]
pub struct CompleteUploadRequest {
    pub upload_id: String,
    #[serde(default)]
    pub parts: Option<Vec<CompletePart>>,
    #[serde(default)]
    pub checksum_sha256: Option<String>,
}

#[derive(Deserialize)]
pub struct CompletePart {
    pub part_number: i32,
    pub etag: String,
    #[serde(default)]
    pub size_bytes: u64,
}

#[derive(Deserialize)]
pub struct AbortUploadRequest {
    pub upload_id: String,
}

#[derive(Deserialize)]
pub struct RenameFileRequest {
    pub filename: String,
}

#[derive(Deserialize)]
pub struct MoveFileRequest {
    #[serde(default)]
    pub directory_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub library_id: Uuid,
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 {
    50
}

pub async fn init_upload(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<InitUploadQuery>,
) -> Result<Response, ServiceError> {
    let outcome = state
        .files
        .init_upload(
            &ctx,
            InitUploadRequest {
                library_id: query.library_id,
                filename: query.filename,
                content_type: query.content_type,
                size_bytes: query.size_bytes,
                directory_id: query.directory_id,
                on_duplicate: query.on_duplicate,
            },
        )
        .await?;

    Ok(match outcome {
        InitUploadOutcome::Started(response) => Json(json!(response)).into_response(),
        InitUploadOutcome::DuplicateConflict {
            existing,
            suggested_name,
        } => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "a file with this name already exists",
                "existing_file": existing,
                "suggested_name": suggested_name,
            })),
        )
            .into_response(),
    })
}

pub async fn upload_part(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadPartQuery>,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    let response = state
        .files
        .upload_part(&query.upload_id, query.part_number, body)
        .await?;
    Ok(Json(json!(response)))
}

pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CompleteUploadRequest>,
) -> Result<Json<Value>, ServiceError> {
    let parts = payload.parts.map(|parts| {
        parts
            .into_iter()
            .map(|p| PartRecord {
                part_number: p.part_number,
                etag: p.etag,
                size_bytes: p.size_bytes,
            })
            .collect::<Vec<_>>()
    });

    let (file, version) = state
        .files
        .complete_upload(&ctx, &payload.upload_id, parts, payload.checksum_sha256)
        .await?;

    Ok(Json(json!({ "file": file, "version": version })))
}

pub async fn abort_upload(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AbortUploadRequest>,
) -> Result<Json<Value>, ServiceError> {
    state.files.abort_upload(&payload.upload_id).await?;
    Ok(Json(json!({ "aborted": true })))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    let file = state.files.get_file(&ctx, file_id).await?;
    let download_url = state.files.download_url(&ctx, file_id).await?;
    Ok(Json(json!({ "file": file, "download_url": download_url })))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(file_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let (file, disposition, stream) = state
        .files
        .download_stream(&ctx, file_id, DOWNLOAD_CHUNK)
        .await?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type.clone())
        .header(header::CONTENT_LENGTH, file.size_bytes.to_string())
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(stream))
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    Ok(response)
}

pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(file_id): Path<Uuid>,
    Json(payload): Json<RenameFileRequest>,
) -> Result<Json<Value>, ServiceError> {
    let file = state.files.rename_file(&ctx, file_id, &payload.filename).await?;
    Ok(Json(json!({ "file": file })))
}

pub async fn move_file(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(file_id): Path<Uuid>,
    Json(payload): Json<MoveFileRequest>,
) -> Result<Json<Value>, ServiceError> {
    let file = state.files.move_file(&ctx, file_id, payload.directory_id).await?;
    Ok(Json(json!({ "file": file })))
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    state.files.delete_file(&ctx, file_id).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub async fn file_versions(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Value>, ServiceError> {
    let versions = state.files.versions(&ctx, file_id).await?;
    Ok(Json(json!({ "versions": versions })))
}

pub async fn search_files(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ServiceError> {
    let limit = query.limit.clamp(1, 200);
    let files = state
        .files
        .search(&ctx, query.library_id, &query.q, limit)
        .await?;
    Ok(Json(json!({ "files": files })))
}
