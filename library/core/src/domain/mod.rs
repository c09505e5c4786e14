// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain model for the document library.

pub mod audit;
pub mod directory;
pub mod events;
pub mod file;
pub mod identity;
pub mod library;
pub mod notification;
pub mod repository;
pub mod share;
pub mod trash;
pub mod upload;

pub use audit::{ActorType, AuditEvent};
pub use directory::Directory;
pub use events::RealtimeEvent;
pub use file::{FileMetadata, FileVersion};
pub use identity::{RequestContext, UserContext};
pub use library::Library;
pub use notification::{Notification, NotificationType};
pub use share::{ShareLink, ShareTargetType, ShareType};
pub use trash::{TrashItem, TrashItemType};
pub use upload::{OnDuplicate, PartRecord, PendingUpload};
