// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bearer token validation against the identity provider.
//!
//! Keycloak publishes an RSA key set over HTTP; keys are cached with a TTL
//! and refreshed single-flight (one fetch at a time, concurrent callers
//! wait). Decoded claims populate a [`UserContext`] that the request
//! pipeline attaches to every request.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::identity::{UserContext, ROLE_GUEST};
use crate::error::ServiceError;

const JWKS_TTL: Duration = Duration::from_secs(3600);
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<Jwk>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClientAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claims of a Keycloak-issued bearer token.
#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub realm_access: Option<RealmAccess>,
    #[serde(default)]
    pub resource_access: Option<HashMap<String, ClientAccess>>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub azp: Option<String>,
}

pub struct KeycloakValidator {
    client: reqwest::Client,
    jwks_url: String,
    issuer: String,
    audience: Option<String>,
    client_id: String,
    verify_signature: bool,
    keys: RwLock<HashMap<String, Jwk>>,
    refresh_gate: Mutex<Option<Instant>>,
}

impl KeycloakValidator {
    pub fn new(
        jwks_url: String,
        issuer: String,
        client_id: String,
        audience: Option<String>,
        verify_signature: bool,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            jwks_url,
            issuer,
            audience,
            client_id,
            verify_signature,
            keys: RwLock::new(HashMap::new()),
            refresh_gate: Mutex::new(None),
        }
    }

    async fn key_for(&self, kid: &str) -> Result<Jwk, ServiceError> {
        if let Some(key) = self.keys.read().await.get(kid).cloned() {
            return Ok(key);
        }

        // Single-flight refresh: the first caller fetches, everyone else
        // waits on the gate and re-reads.
        let mut gate = self.refresh_gate.lock().await;
        if let Some(key) = self.keys.read().await.get(kid).cloned() {
            return Ok(key);
        }
        let recently = gate.is_some_and(|at| at.elapsed() < JWKS_TTL);
        if !recently || self.keys.read().await.is_empty() {
            self.fetch_keys().await?;
            *gate = Some(Instant::now());
        }
        drop(gate);

        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or(ServiceError::Unauthenticated)
    }

    async fn fetch_keys(&self) -> Result<(), ServiceError> {
        let document: JwksDocument = self
            .client
            .get(&self.jwks_url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!(error = %e, "JWKS fetch failed");
                ServiceError::Transient(format!("identity provider unavailable: {e}"))
            })?
            .json()
            .await
            .map_err(|e| ServiceError::Transient(format!("malformed JWKS document: {e}")))?;

        let mut keys = self.keys.write().await;
        keys.clear();
        for key in document.keys.into_iter().filter(|k| k.kty == "RSA") {
            keys.insert(key.kid.clone(), key);
        }
        debug!(count = keys.len(), "JWKS refreshed");
        Ok(())
    }

    /// Validate a bearer token and decode its claims.
    pub async fn decode_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        let audience = self.audience.clone().unwrap_or_else(|| self.client_id.clone());
        validation.set_audience(&[&audience]);

        if !self.verify_signature {
            validation.insecure_disable_signature_validation();
            validation.validate_aud = false;
            let key = DecodingKey::from_secret(&[]);
            let data = decode::<Claims>(token, &key, &validation)
                .map_err(|_| ServiceError::Unauthenticated)?;
            return Ok(data.claims);
        }

        let header = decode_header(token).map_err(|_| ServiceError::Unauthenticated)?;
        let kid = header.kid.ok_or(ServiceError::Unauthenticated)?;
        let jwk = self.key_for(&kid).await?;

        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|_| ServiceError::Unauthenticated)?;
        let data = decode::<Claims>(token, &key, &validation).map_err(|e| {
            debug!(error = %e, "token validation failed");
            ServiceError::Unauthenticated
        })?;
        Ok(data.claims)
    }

    /// Build the per-request identity from decoded claims.
    pub fn user_context_from(&self, claims: &Claims) -> Result<UserContext, ServiceError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ServiceError::Unauthenticated)?;

        let mut roles: Vec<String> = claims
            .realm_access
            .as_ref()
            .map(|ra| ra.roles.clone())
            .unwrap_or_default();
        if let Some(resource_access) = &claims.resource_access {
            if let Some(client) = resource_access.get(&self.client_id) {
                roles.extend(client.roles.iter().cloned());
            }
        }
        roles.sort();
        roles.dedup();

        let is_guest = roles.iter().any(|r| r == ROLE_GUEST)
            || claims.groups.iter().any(|g| g == "/guests");

        Ok(UserContext {
            user_id,
            email: claims.email.clone(),
            preferred_username: claims.preferred_username.clone(),
            roles,
            groups: claims.groups.clone(),
            is_guest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> KeycloakValidator {
        KeycloakValidator::new(
            "http://localhost:8080/realms/alexandria/protocol/openid-connect/certs".into(),
            "http://localhost:8080/realms/alexandria".into(),
            "alexandria-library".into(),
            None,
            true,
        )
    }

    fn claims(value: serde_json::Value) -> Claims {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn roles_merge_realm_and_client() {
        let v = validator();
        let c = claims(json!({
            "sub": Uuid::new_v4().to_string(),
            "realm_access": {"roles": ["library-user"]},
            "resource_access": {"alexandria-library": {"roles": ["library-admin"]}},
        }));
        let ctx = v.user_context_from(&c).unwrap();
        assert!(ctx.has_role("library-user"));
        assert!(ctx.is_admin());
        assert!(!ctx.is_guest);
    }

    #[test]
    fn guest_flag_from_group() {
        let v = validator();
        let c = claims(json!({
            "sub": Uuid::new_v4().to_string(),
            "groups": ["/guests"],
        }));
        assert!(v.user_context_from(&c).unwrap().is_guest);
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let v = validator();
        let c = claims(json!({ "sub": "not-a-uuid" }));
        assert!(matches!(
            v.user_context_from(&c),
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let v = validator();
        assert!(matches!(
            v.decode_token("garbage").await,
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn jwks_fetch_populates_key_cache() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/certs")
            .with_status(200)
            .with_body(
                json!({
                    "keys": [
                        {"kid": "key-1", "kty": "RSA", "n": "abc", "e": "AQAB"},
                        {"kid": "ec-key", "kty": "EC"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let v = KeycloakValidator::new(
            format!("{}/certs", server.url()),
            "issuer".into(),
            "client".into(),
            None,
            true,
        );
        v.fetch_keys().await.unwrap();
        let keys = v.keys.read().await;
        assert!(keys.contains_key("key-1"));
        // Non-RSA keys are ignored.
        assert!(!keys.contains_key("ec-key"));
    }
}
