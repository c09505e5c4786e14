// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared application state for the HTTP layer.
//!
//! Process-wide resources (cache, storage adapter, rate limiter, JWKS,
//! realtime bus) are constructed once at server start and flow to handlers
//! through this state rather than ambient globals.

use std::sync::Arc;

use alexandria_vector::application::{AccessControl, VectorToolService};

use crate::application::{
    AuditService, DirectoryService, FileService, IndexingService, LibraryService,
    LibraryToolService, NotificationService, ShareService, TrashService,
};
use crate::config::Settings;
use crate::infrastructure::event_bus::RealtimeBus;
use crate::infrastructure::jwks::KeycloakValidator;

pub struct AppState {
    pub settings: Settings,
    pub libraries: Arc<LibraryService>,
    pub directories: Arc<DirectoryService>,
    pub files: Arc<FileService>,
    pub trash: Arc<TrashService>,
    pub shares: Arc<ShareService>,
    pub audit: Arc<AuditService>,
    pub notifications: Arc<NotificationService>,
    pub indexer: Arc<IndexingService>,
    pub bus: Arc<RealtimeBus>,
    pub validator: Arc<KeycloakValidator>,
    pub access: Arc<AccessControl>,
    pub vector_tools: Arc<VectorToolService>,
    pub library_tools: Arc<LibraryToolService>,
}
