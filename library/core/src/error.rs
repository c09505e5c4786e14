// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service-level error taxonomy and its HTTP mapping.
//!
//! Adapters keep their own typed errors ([`crate::domain::repository::RepositoryError`],
//! [`crate::infrastructure::object_store::StorageError`]); services convert
//! them into this taxonomy, and the presentation layer maps each variant to
//! exactly one status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::repository::RepositoryError;
use crate::infrastructure::object_store::StorageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input or constraint violation. Not retriable.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credentials.
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness violation or duplicate-on-ask. Carries the existing
    /// entity and a proposed remedy when one exists.
    #[error("{message}")]
    Conflict {
        message: String,
        existing: Option<serde_json::Value>,
        suggested_name: Option<String>,
    },

    /// Size cap, rate limit, or share exhaustion.
    #[error("{message}")]
    LimitExceeded { message: String, remaining: Option<u32> },

    /// Backend unavailable after bounded internal retries. Retriable.
    #[error("backend unavailable: {0}")]
    Transient(String),

    /// Invariant violation or unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict {
            message: message.into(),
            existing: None,
            suggested_name: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ServiceError::LimitExceeded { remaining: Some(_), .. } => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::LimitExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = json!({ "error": self.to_string() });

        match &self {
            ServiceError::Conflict { existing, suggested_name, .. } => {
                if let Some(existing) = existing {
                    body["existing"] = existing.clone();
                }
                if let Some(suggested) = suggested_name {
                    body["suggested_name"] = json!(suggested);
                }
            }
            ServiceError::LimitExceeded { remaining: Some(remaining), .. } => {
                body["remaining"] = json!(remaining);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound(what) => ServiceError::NotFound(what),
            RepositoryError::Conflict(message) => ServiceError::conflict(message),
            RepositoryError::Database(message) => ServiceError::Transient(message),
            RepositoryError::Serialization(message) => ServiceError::Internal(message),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => ServiceError::NotFound(what),
            StorageError::InvalidKey(message) => ServiceError::Validation(message),
            StorageError::Unavailable(message) | StorageError::Backend(message) => {
                ServiceError::Transient(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(
            ServiceError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServiceError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::NotFound("file".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::conflict("dup").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::LimitExceeded { message: "rate".into(), remaining: Some(0) }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ServiceError::LimitExceeded { message: "size".into(), remaining: None }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServiceError::Transient("s3".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
