// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent tool transports.
//!
//! Two transports share one rate limiter and one policy engine:
//!
//! - **SSE** (`GET /mcp/sse`): streams a `connected` event on open with
//!   the tool registry, then heartbeats every 30 s.
//! - **Plain** (`POST /mcp/tools/{name}`): tool name in the path, JSON
//!   arguments in the body.
//!
//! The caller's agent id comes from the `X-Agent-ID` header and defaults
//! to `anonymous`.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use alexandria_vector::application::RateDecision;
use alexandria_vector::error::ToolError;

use crate::domain::audit::actions;
use super::middleware::CorrelationId;
use super::state::AppState;

pub const AGENT_ID_HEADER: &str = "x-agent-id";
const HEARTBEAT: Duration = Duration::from_secs(30);

pub fn agent_id_from(headers: &HeaderMap) -> String {
    headers
        .get(AGENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

/// Registry of every tool exposed to agents, with input schemas.
pub fn tool_descriptors() -> Value {
    json!([
        {
            "name": "vector.query",
            "description": "Semantic search over indexed chunks by text similarity",
            "input_schema": {
                "type": "object",
                "properties": {
                    "text": { "type": "string" },
                    "top_k": { "type": "integer", "minimum": 1, "maximum": 50, "default": 8 },
                    "filters": {
                        "type": "object",
                        "properties": {
                            "library_id": { "type": "string" },
                            "doc_id": { "type": "string" },
                            "path": { "type": "string" },
                            "doc_type": { "type": "string" },
                            "language": { "type": "string" },
                            "chunk_type": { "type": "string" },
                            "tags": { "type": "string" }
                        }
                    }
                },
                "required": ["text"]
            }
        },
        {
            "name": "vector.upsert_documents",
            "description": "Add or update chunks; idempotent on (library, doc, chunk index)",
            "input_schema": {
                "type": "object",
                "properties": {
                    "chunks": { "type": "array", "items": { "type": "string" } },
                    "metadata": { "type": "array", "items": { "type": "object" } }
                },
                "required": ["chunks", "metadata"]
            }
        },
        {
            "name": "vector.get",
            "description": "Fetch chunks by exact chunk ids",
            "input_schema": {
                "type": "object",
                "properties": { "ids": { "type": "array", "items": { "type": "string" } } },
                "required": ["ids"]
            }
        },
        {
            "name": "vector.delete",
            "description": "Delete chunks by doc_id, path_prefix, or whole library",
            "input_schema": {
                "type": "object",
                "properties": {
                    "where": {
                        "type": "object",
                        "properties": {
                            "doc_id": { "type": "string" },
                            "path_prefix": { "type": "string" },
                            "library_id": { "type": "string" }
                        }
                    }
                },
                "required": ["where"]
            }
        },
        {
            "name": "library.list",
            "description": "List libraries readable by this agent",
            "input_schema": { "type": "object", "properties": {} }
        },
        {
            "name": "library.browse",
            "description": "List directories and files at one level of a library",
            "input_schema": {
                "type": "object",
                "properties": {
                    "library_id": { "type": "string" },
                    "directory_id": { "type": "string" }
                },
                "required": ["library_id"]
            }
        },
        {
            "name": "file.read",
            "description": "Read a text file's content (capped at 512 KiB)",
            "input_schema": {
                "type": "object",
                "properties": { "file_id": { "type": "string" } },
                "required": ["file_id"]
            }
        },
        {
            "name": "file.create",
            "description": "Create a text file (requires library write policy)",
            "input_schema": {
                "type": "object",
                "properties": {
                    "library_id": { "type": "string" },
                    "directory_id": { "type": "string" },
                    "filename": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["library_id", "filename", "content"]
            }
        },
        {
            "name": "file.update",
            "description": "Write a new version of a file (requires library write policy)",
            "input_schema": {
                "type": "object",
                "properties": {
                    "file_id": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["file_id", "content"]
            }
        },
        {
            "name": "file.search",
            "description": "Search files by name substring within a library",
            "input_schema": {
                "type": "object",
                "properties": {
                    "library_id": { "type": "string" },
                    "query": { "type": "string" }
                },
                "required": ["library_id", "query"]
            }
        }
    ])
}

fn tool_error_response(error: ToolError) -> Response {
    let (status, mut body) = match &error {
        ToolError::UnknownTool(_) => (StatusCode::NOT_FOUND, json!({ "error": error.to_string() })),
        ToolError::InvalidArguments(_) => (StatusCode::BAD_REQUEST, json!({ "error": error.to_string() })),
        ToolError::AccessDenied(_) => (StatusCode::FORBIDDEN, json!({ "error": error.to_string() })),
        ToolError::RateLimited { remaining } => (
            StatusCode::TOO_MANY_REQUESTS,
            json!({ "error": error.to_string(), "remaining": remaining }),
        ),
        ToolError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": error.to_string() }),
        ),
    };
    if let Some(obj) = body.as_object_mut() {
        obj.entry("ok").or_insert(json!(false));
    }
    (status, Json(body)).into_response()
}

pub async fn list_tools(State(_state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "tools": tool_descriptors() }))
}

/// Plain request/response transport.
pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    correlation: Option<axum::Extension<CorrelationId>>,
    Json(args): Json<Value>,
) -> Response {
    let agent_id = agent_id_from(&headers);
    let correlation_id = correlation.map(|c| c.0 .0).unwrap_or_else(Uuid::new_v4);

    if let RateDecision::Limited { remaining } = state.access.rate_limiter.check(&agent_id) {
        return tool_error_response(ToolError::RateLimited { remaining });
    }

    let result = if name.starts_with("vector.") {
        state.vector_tools.dispatch(&agent_id, &name, args.clone()).await
    } else {
        state.library_tools.dispatch(&agent_id, &name, args.clone()).await
    };

    state
        .audit
        .log_agent_action(
            &agent_id,
            correlation_id,
            actions::MCP_TOOL_CALL,
            "tool",
            Uuid::nil(),
            None,
            json!({ "tool": name, "ok": result.is_ok() }),
        )
        .await;

    match result {
        Ok(value) => {
            info!(agent_id, tool = %name, "tool call complete");
            Json(json!({ "ok": true, "result": value })).into_response()
        }
        Err(error) => tool_error_response(error),
    }
}

/// Server-sent transport: `connected` on open, heartbeats every 30 s.
pub async fn sse_transport(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let agent_id = agent_id_from(&headers);

    if let RateDecision::Limited { remaining } = state.access.rate_limiter.check(&agent_id) {
        return tool_error_response(ToolError::RateLimited { remaining });
    }

    let stream = async_stream::stream! {
        yield Ok::<_, std::convert::Infallible>(
            Event::default().event("connected").data(
                json!({
                    "server": "alexandria",
                    "agent_id": agent_id,
                    "tools": tool_descriptors(),
                })
                .to_string(),
            ),
        );

        let mut ticker = tokio::time::interval(HEARTBEAT);
        ticker.tick().await; // first tick fires immediately
        loop {
            ticker.tick().await;
            yield Ok(Event::default()
                .event("heartbeat")
                .data(json!({ "timestamp": chrono::Utc::now() }).to_string()));
        }
    };

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(HEARTBEAT))
        .into_response()
}
