// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application services: the authoritative business rules.

pub mod agent_tools;
pub mod audit_service;
pub mod directory_service;
pub mod file_service;
pub mod indexing;
pub mod library_service;
pub mod notification_service;
pub mod share_service;
pub mod trash_service;

pub use agent_tools::LibraryToolService;
pub use audit_service::AuditService;
pub use directory_service::DirectoryService;
pub use file_service::{FileService, InitUploadOutcome, InitUploadRequest, UploadInitResponse};
pub use indexing::IndexingService;
pub use library_service::LibraryService;
pub use notification_service::NotificationService;
pub use share_service::ShareService;
pub use trash_service::TrashService;
