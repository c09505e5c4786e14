// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `alexandria-vector` — Semantic Indexing Crate
//!
//! The indexing layer of the Alexandria document library. Turns file content
//! into structural chunks, embeds them, and serves them back to AI agents
//! through a capability-gated tool surface.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Chunk`, `Language`, extracted metadata, access policies |
//! | [`application`] | Application | Vector tool implementations, access control, rate limiting |
//! | [`infrastructure`] | Infra | Chunkers (AST/regex/markdown/fixed), Qdrant adapter, Ollama embedding client, content extraction |
//!
//! ## Key Concepts
//!
//! - **Chunk**: A contiguous slice of a file's extracted text plus structural
//!   metadata (symbol name, line span, heading ancestry).
//! - **Chunk id**: Deterministic — `{library_id}:{doc_id}:chunk:{index}` —
//!   so re-indexing an unchanged or edited file overwrites instead of
//!   duplicating.
//! - **Collection**: One vector-store collection per library; created lazily
//!   and cached per process.
//! - **Policy**: Per-library read/write + allowed-agent gate evaluated on
//!   every agent call, AND-ed with the library's own write flag.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod error;

pub use domain::*;
pub use error::*;
