// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Guest provisioning against the identity provider.
//!
//! The identity provider is an external collaborator; this module defines
//! the boundary and a Keycloak admin-API implementation used when a share
//! link allows guest access.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

const ADMIN_TIMEOUT: Duration = Duration::from_secs(15);

fn temporary_password() -> String {
    let mut buf = [0u8; 12];
    rand::rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

#[derive(Debug, Error)]
pub enum IdentityAdminError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("guest account already exists for this email")]
    AlreadyExists,

    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct GuestAccount {
    pub guest_id: String,
    pub email: String,
    pub temporary_password: String,
    pub login_url: String,
}

/// Boundary to the identity provider's administration API.
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    async fn create_guest_account(
        &self,
        email: &str,
        share_link_id: Uuid,
    ) -> Result<GuestAccount, IdentityAdminError>;

    /// Returns false when no such account exists.
    async fn delete_guest_account(&self, guest_id: &str) -> Result<bool, IdentityAdminError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Keycloak admin-API implementation. Uses client-credentials grant for a
/// confidential service account.
pub struct KeycloakIdentityAdmin {
    client: reqwest::Client,
    base_url: String,
    realm: String,
    client_id: String,
    client_secret: String,
}

impl KeycloakIdentityAdmin {
    pub fn new(
        base_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            realm: realm.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    async fn admin_token(&self) -> Result<String, IdentityAdminError> {
        let url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base_url.trim_end_matches('/'),
            self.realm
        );
        let response: TokenResponse = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", &self.client_id),
                ("client_secret", &self.client_secret),
            ])
            .timeout(ADMIN_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IdentityAdminError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| IdentityAdminError::Unavailable(e.to_string()))?;
        Ok(response.access_token)
    }
}

#[async_trait]
impl IdentityAdmin for KeycloakIdentityAdmin {
    async fn create_guest_account(
        &self,
        email: &str,
        share_link_id: Uuid,
    ) -> Result<GuestAccount, IdentityAdminError> {
        let token = self.admin_token().await?;
        let temporary_password = temporary_password();

        let username = format!("guest_{}", email.replace('@', "_at_").replace('.', "_"));
        let body = json!({
            "username": username,
            "email": email,
            "enabled": true,
            "emailVerified": false,
            "credentials": [{
                "type": "password",
                "value": temporary_password,
                "temporary": true,
            }],
            "attributes": {
                "share_link_id": [share_link_id.to_string()],
                "account_type": ["guest"],
            },
            "groups": ["/guests"],
        });

        let url = format!(
            "{}/admin/realms/{}/users",
            self.base_url.trim_end_matches('/'),
            self.realm
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .timeout(ADMIN_TIMEOUT)
            .send()
            .await
            .map_err(|e| IdentityAdminError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(IdentityAdminError::AlreadyExists);
        }
        if !response.status().is_success() {
            return Err(IdentityAdminError::Rejected(format!("HTTP {}", response.status())));
        }

        // Keycloak returns the new user's id in the Location header.
        let guest_id = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|l| l.rsplit('/').next())
            .unwrap_or_default()
            .to_string();

        let login_url = format!(
            "{}/realms/{}/protocol/openid-connect/auth?client_id={}&response_type=code&scope=openid",
            self.base_url.trim_end_matches('/'),
            self.realm,
            self.client_id
        );

        info!(email, %share_link_id, "guest account created");
        Ok(GuestAccount {
            guest_id,
            email: email.to_string(),
            temporary_password,
            login_url,
        })
    }

    async fn delete_guest_account(&self, guest_id: &str) -> Result<bool, IdentityAdminError> {
        let token = self.admin_token().await?;
        let url = format!(
            "{}/admin/realms/{}/users/{}",
            self.base_url.trim_end_matches('/'),
            self.realm,
            guest_id
        );
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&token)
            .timeout(ADMIN_TIMEOUT)
            .send()
            .await
            .map_err(|e| IdentityAdminError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(IdentityAdminError::Rejected(format!("HTTP {}", response.status())));
        }
        info!(guest_id, "guest account deleted");
        Ok(true)
    }
}
