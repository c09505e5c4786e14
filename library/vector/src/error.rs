// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Error types for the indexing layer.

use thiserror::Error;

/// Errors from the vector store adapter.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("vector store unavailable: {0}")]
    Unavailable(String),

    #[error("collection error for library {library_id}: {message}")]
    Collection { library_id: String, message: String },

    #[error("malformed chunk id: {0}")]
    MalformedChunkId(String),

    #[error("payload decode error: {0}")]
    Payload(String),
}

/// Errors from the embedding client.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding request timed out after {0} seconds")]
    Timeout(u64),

    #[error("embedding service returned an empty vector")]
    Empty,

    #[error("model {0} is not available")]
    ModelNotFound(String),
}

/// Errors from content extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("content type {0} cannot be extracted")]
    Unsupported(String),

    #[error("conversion service error: {0}")]
    Conversion(String),
}

/// Errors surfaced by the agent tool layer.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("rate limit exceeded; {remaining} requests remaining in window")]
    RateLimited { remaining: u32 },

    #[error("access denied for library {0}")]
    AccessDenied(String),

    #[error("internal error: {0}")]
    Internal(String),
}
