// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure adapters: Postgres, S3, cache, realtime bus, identity.

pub mod cache;
pub mod catalog;
pub mod db;
pub mod email;
pub mod event_bus;
pub mod identity_admin;
pub mod jwks;
pub mod object_store;
pub mod repositories;

pub use cache::EntityCache;
pub use catalog::PostgresLibraryCatalog;
pub use db::Database;
pub use email::{EmailGateway, EmailMessage, NoopEmailGateway};
pub use event_bus::RealtimeBus;
pub use identity_admin::{GuestAccount, IdentityAdmin, KeycloakIdentityAdmin};
pub use jwks::KeycloakValidator;
pub use object_store::{MemoryObjectStore, ObjectStore, S3ObjectStore, StorageError, UploadResult};
