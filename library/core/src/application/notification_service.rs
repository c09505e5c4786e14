// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Notifications: in-app records, SSE fan-out, and email dispatch.

use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::events::user_channel;
use crate::domain::notification::{Notification, NotificationType};
use crate::domain::repository::NotificationRepository;
use crate::error::ServiceError;
use crate::infrastructure::email::{EmailGateway, EmailMessage};
use crate::infrastructure::event_bus::RealtimeBus;

pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    bus: Arc<RealtimeBus>,
    email: Arc<dyn EmailGateway>,
}

impl NotificationService {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        bus: Arc<RealtimeBus>,
        email: Arc<dyn EmailGateway>,
    ) -> Self {
        Self { repository, bus, email }
    }

    /// Persist an in-app notification and fan it out on the user's SSE
    /// channel. Email, when requested, is best-effort.
    pub async fn notify(
        &self,
        notification: Notification,
        email_to: Option<String>,
    ) -> Result<Notification, ServiceError> {
        self.repository.insert(&notification).await?;

        self.bus.publish(
            &user_channel(notification.user_id),
            "notification",
            json!({
                "id": notification.id,
                "type": notification.notification_type.as_str(),
                "title": notification.title,
                "message": notification.message,
            }),
        );

        if let Some(to) = email_to {
            let message = EmailMessage {
                to,
                subject: notification.title.clone(),
                body: notification.message.clone(),
            };
            if let Err(e) = self.email.send(message).await {
                warn!(notification_id = %notification.id, error = %e, "email dispatch failed");
            }
        }

        Ok(notification)
    }

    pub async fn notify_share_created(
        &self,
        owner_id: Uuid,
        target_name: &str,
        share_id: Uuid,
    ) -> Result<(), ServiceError> {
        let notification = Notification::new(
            owner_id,
            NotificationType::ShareCreated,
            "Share link created",
            format!("A share link for '{target_name}' was created"),
        )
        .with_resource("share_link", share_id);
        self.notify(notification, None).await?;
        Ok(())
    }

    pub async fn notify_share_accessed(
        &self,
        owner_id: Uuid,
        owner_email: Option<String>,
        target_name: &str,
        share_id: Uuid,
        access_count: i64,
    ) -> Result<(), ServiceError> {
        let notification = Notification::new(
            owner_id,
            NotificationType::ShareAccessed,
            "Shared item accessed",
            format!("'{target_name}' was accessed via share link (access #{access_count})"),
        )
        .with_resource("share_link", share_id)
        .with_data(json!({ "access_count": access_count }));
        self.notify(notification, owner_email).await?;
        Ok(())
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, ServiceError> {
        Ok(self
            .repository
            .list_for_user(user_id, unread_only, limit, offset)
            .await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, ServiceError> {
        Ok(self.repository.unread_count(user_id).await?)
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        if !self.repository.mark_read(id, user_id).await? {
            return Err(ServiceError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        Ok(self.repository.mark_all_read(user_id).await?)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        if !self.repository.delete(id, user_id).await? {
            return Err(ServiceError::NotFound(format!("notification {id}")));
        }
        Ok(())
    }
}
