// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request pipeline: correlation propagation, API versioning, auth.
//!
//! Layer order (outermost first): correlation → versioning → auth. Every
//! request carries a correlation id (supplied or minted) that flows into
//! the request extensions, the tracing span, the response headers, and
//! every audit event.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::identity::{RequestContext, UserContext};
use crate::error::ServiceError;
use super::state::AppState;

pub const CORRELATION_HEADER: &str = "x-correlation-id";
const MEDIA_TYPE_PREFIX: &str = "application/vnd.alexandria.";
const SUPPORTED_VERSIONS: &[&str] = &["v1"];

/// Correlation id carried in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

/// Negotiated API version carried in request extensions.
#[derive(Debug, Clone)]
pub struct ApiVersion(pub String);

pub async fn correlation_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request.extensions_mut().insert(CorrelationId(correlation_id));

    let span = tracing::info_span!(
        "request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

/// Parse `application/vnd.alexandria.v{N}+json` from an `Accept` header.
/// Returns `None` when the header does not name our media type at all.
pub fn parse_accept_version(accept: &str) -> Option<Result<String, String>> {
    for part in accept.split(',') {
        let media = part.trim().split(';').next().unwrap_or("").trim();
        if let Some(rest) = media.strip_prefix(MEDIA_TYPE_PREFIX) {
            let version = rest.strip_suffix("+json").unwrap_or(rest);
            if SUPPORTED_VERSIONS.contains(&version) {
                return Some(Ok(version.to_string()));
            }
            return Some(Err(version.to_string()));
        }
    }
    None
}

pub async fn versioning_middleware(mut request: Request, next: Next) -> Response {
    let version = match request
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_accept_version)
    {
        Some(Ok(version)) => version,
        Some(Err(unknown)) => {
            return (
                StatusCode::NOT_ACCEPTABLE,
                Json(json!({
                    "error": format!("unsupported API version {unknown}"),
                    "supported_versions": SUPPORTED_VERSIONS,
                })),
            )
                .into_response();
        }
        None => "v1".to_string(),
    };

    request.extensions_mut().insert(ApiVersion(version));
    next.run(request).await
}

/// Validate the bearer token and attach a [`RequestContext`]. With
/// `enable_auth = false` (development only) every request runs as a local
/// admin identity.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let correlation_id = request
        .extensions()
        .get::<CorrelationId>()
        .map(|c| c.0)
        .unwrap_or_else(Uuid::new_v4);

    let user = if state.settings.enable_auth {
        let token = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let Some(token) = token else {
            return ServiceError::Unauthenticated.into_response();
        };

        let claims = match state.validator.decode_token(token).await {
            Ok(claims) => claims,
            Err(e) => return e.into_response(),
        };
        match state.validator.user_context_from(&claims) {
            Ok(user) => user,
            Err(e) => return e.into_response(),
        }
    } else {
        UserContext::system()
    };

    let mut ctx = RequestContext::new(user, correlation_id);
    ctx.ip_address = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string());
    ctx.user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_version_is_accepted() {
        assert_eq!(
            parse_accept_version("application/vnd.alexandria.v1+json"),
            Some(Ok("v1".to_string()))
        );
    }

    #[test]
    fn unknown_version_is_rejected() {
        assert_eq!(
            parse_accept_version("application/vnd.alexandria.v9+json"),
            Some(Err("v9".to_string()))
        );
    }

    #[test]
    fn foreign_media_types_fall_through() {
        assert_eq!(parse_accept_version("application/json"), None);
        assert_eq!(parse_accept_version("*/*"), None);
        assert_eq!(parse_accept_version(""), None);
    }

    #[test]
    fn versioned_type_wins_in_a_list() {
        assert_eq!(
            parse_accept_version("text/html, application/vnd.alexandria.v1+json;q=0.9"),
            Some(Ok("v1".to_string()))
        );
    }
}
