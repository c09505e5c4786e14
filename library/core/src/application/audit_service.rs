// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Audit log service.
//!
//! Append is best-effort from the caller's point of view: an audit write
//! failure is logged with the correlation id and never fails the
//! originating operation.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::audit::{ActorType, AuditEvent};
use crate::domain::identity::RequestContext;
use crate::domain::repository::AuditRepository;
use crate::error::ServiceError;

pub struct AuditService {
    repository: Arc<dyn AuditRepository>,
}

impl AuditService {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Record an action by the request's user.
    pub async fn log_user_action(
        &self,
        ctx: &RequestContext,
        action: &str,
        target_type: &str,
        target_id: Uuid,
        library_id: Option<Uuid>,
        details: Value,
    ) {
        let mut event = AuditEvent::new(
            ActorType::User,
            ctx.user.user_id,
            action,
            target_type,
            target_id,
            ctx.correlation_id,
        )
        .with_details(details);
        event.library_id = library_id;
        event.ip_address = ctx.ip_address.clone();
        event.user_agent = ctx.user_agent.clone();
        if let Some(name) = &ctx.user.preferred_username {
            event.actor_name = Some(name.clone());
        }
        self.append(event).await;
    }

    /// Record an action by an AI agent (tool surface).
    pub async fn log_agent_action(
        &self,
        agent_id: &str,
        correlation_id: Uuid,
        action: &str,
        target_type: &str,
        target_id: Uuid,
        library_id: Option<Uuid>,
        details: Value,
    ) {
        let mut event = AuditEvent::new(
            ActorType::Ai,
            Uuid::nil(),
            action,
            target_type,
            target_id,
            correlation_id,
        )
        .with_details(details)
        .with_actor_name(agent_id);
        event.library_id = library_id;
        self.append(event).await;
    }

    /// Record a system action (sweepers, CLI maintenance).
    pub async fn log_system_action(
        &self,
        correlation_id: Uuid,
        action: &str,
        target_type: &str,
        target_id: Uuid,
        library_id: Option<Uuid>,
        details: Value,
    ) {
        let mut event = AuditEvent::new(
            ActorType::System,
            Uuid::nil(),
            action,
            target_type,
            target_id,
            correlation_id,
        )
        .with_details(details);
        event.library_id = library_id;
        self.append(event).await;
    }

    async fn append(&self, event: AuditEvent) {
        if let Err(e) = self.repository.append(&event).await {
            warn!(
                correlation_id = %event.correlation_id,
                action = %event.action,
                error = %e,
                "audit append failed"
            );
        }
    }

    pub async fn events_for_correlation(&self, correlation_id: Uuid) -> Result<Vec<AuditEvent>, ServiceError> {
        Ok(self.repository.by_correlation(correlation_id).await?)
    }

    pub async fn events_for_library(
        &self,
        library_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEvent>, ServiceError> {
        Ok(self.repository.by_library(library_id, limit, offset).await?)
    }

    pub async fn events_for_actor(
        &self,
        actor_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditEvent>, ServiceError> {
        Ok(self.repository.by_actor(actor_id, limit, offset).await?)
    }

    pub async fn events_for_target(
        &self,
        target_type: &str,
        target_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AuditEvent>, ServiceError> {
        Ok(self.repository.by_target(target_type, target_id, limit).await?)
    }

    pub async fn summary(
        &self,
        library_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, ServiceError> {
        Ok(self.repository.summary(library_id, since).await?)
    }
}
