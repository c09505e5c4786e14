// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Authenticated caller identity.
//!
//! Built from the decoded bearer token by the request pipeline and passed
//! explicitly to every operation — no ambient per-task state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "library-admin";
pub const ROLE_USER: &str = "library-user";
pub const ROLE_GUEST: &str = "library-guest";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub preferred_username: Option<String>,
    pub roles: Vec<String>,
    pub groups: Vec<String>,
    pub is_guest: bool,
}

impl UserContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// A system identity for daemon-internal operations (sweepers, CLI).
    pub fn system() -> Self {
        Self {
            user_id: Uuid::nil(),
            email: None,
            preferred_username: Some("system".into()),
            roles: vec![ROLE_ADMIN.into()],
            groups: Vec::new(),
            is_guest: false,
        }
    }
}

/// Per-request context assembled by the pipeline and passed explicitly to
/// every operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: UserContext,
    pub correlation_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(user: UserContext, correlation_id: Uuid) -> Self {
        Self {
            user,
            correlation_id,
            ip_address: None,
            user_agent: None,
        }
    }

    /// Context for daemon-internal work with a fresh correlation id.
    pub fn system() -> Self {
        Self::new(UserContext::system(), Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_checks() {
        let user = UserContext {
            user_id: Uuid::new_v4(),
            email: None,
            preferred_username: None,
            roles: vec![ROLE_USER.into()],
            groups: Vec::new(),
            is_guest: false,
        };
        assert!(user.has_role(ROLE_USER));
        assert!(!user.is_admin());
        assert!(user.has_any_role(&[ROLE_ADMIN, ROLE_USER]));
    }

    #[test]
    fn system_identity_is_admin() {
        assert!(UserContext::system().is_admin());
    }
}
