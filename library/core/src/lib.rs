// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `alexandria-core`
//!
//! The runtime heart of the Alexandria document library service. This crate
//! owns the domain model, application use-cases, infrastructure wiring, and
//! the HTTP/SSE presentation surface.
//!
//! ## Bounded Contexts
//!
//! | Bounded Context | Domain files |
//! |---|---|
//! | **Namespace engine** | [`domain::library`], [`domain::directory`], [`domain::file`] |
//! | **Versioned content** | [`domain::file`], [`domain::upload`] |
//! | **Trash & retention** | [`domain::trash`] |
//! | **Sharing** | [`domain::share`] |
//! | **Audit** | [`domain::audit`] |
//! | **Notifications & realtime** | [`domain::notification`], [`domain::events`] |
//! | **Identity** | [`domain::identity`] |
//!
//! ## Layer Structure
//!
//! ```text
//! presentation/   ← HTTP API (axum), SSE, agent tool transports
//!     ↓
//! application/    ← Use-case services, upload state machine, indexing pipeline
//!     ↓
//! domain/         ← Aggregates, value objects, repository traits
//!     ↓
//! infrastructure/ ← Postgres repos, S3 adapter, cache, JWKS, realtime bus
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;

pub use config::Settings;
pub use error::ServiceError;
