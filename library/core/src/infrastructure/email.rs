// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Email gateway boundary.
//!
//! The notification email gateway is an external collaborator; this module
//! defines only the seam. [`NoopEmailGateway`] logs instead of sending and
//! is the default wiring for deployments without a relay.

use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailGateway: Send + Sync {
    /// Dispatch failures are reported but must never fail the operation
    /// that triggered the email.
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()>;
}

/// Logs outbound mail without sending it.
#[derive(Default)]
pub struct NoopEmailGateway;

#[async_trait]
impl EmailGateway for NoopEmailGateway {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        info!(to = %message.to, subject = %message.subject, "email suppressed (no gateway configured)");
        Ok(())
    }
}
