// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Access control and rate limiting for the agent tool surface.
//!
//! Two gates apply to every agent call:
//!
//! 1. A per-agent sliding-window rate limit. Admission failures are never
//!    charged against the window.
//! 2. A per-library [`LibraryPolicy`]. Libraries without an explicit policy
//!    use the default (read = true, write = configured default). Writes are
//!    additionally AND-ed with the library row's own `mcp_write_enabled`
//!    flag, which lives in the metadata store and is reached through the
//!    [`LibraryCatalog`] seam.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;
use uuid::Uuid;

use crate::domain::LibraryPolicy;

/// One catalog row: a non-deleted library and its write flag.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub library_id: Uuid,
    pub mcp_write_enabled: bool,
}

/// Read access to the library catalog in the metadata store.
#[async_trait]
pub trait LibraryCatalog: Send + Sync {
    /// Every non-deleted library with its write flag.
    async fn list_libraries(&self) -> anyhow::Result<Vec<CatalogEntry>>;

    /// `None` when the library is absent or soft-deleted.
    async fn write_flag(&self, library_id: Uuid) -> anyhow::Result<Option<bool>>;
}

/// Outcome of a rate-limit admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { remaining: u32 },
}

/// Per-agent sliding window of request instants. Approximate but monotone:
/// a denied request is never recorded, so it cannot push later requests
/// over the limit.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: DashMap<String, Mutex<Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_seconds: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_seconds),
            windows: DashMap::new(),
        }
    }

    /// Admit or reject a request from `agent_id`, charging the window only
    /// on admission.
    pub fn check(&self, agent_id: &str) -> RateDecision {
        let entry = self.windows.entry(agent_id.to_string()).or_default();
        let mut timestamps = entry.lock();

        let cutoff = Instant::now() - self.window;
        timestamps.retain(|t| *t > cutoff);

        if timestamps.len() >= self.max_requests {
            RateDecision::Limited {
                remaining: (self.max_requests - timestamps.len()) as u32,
            }
        } else {
            timestamps.push(Instant::now());
            RateDecision::Allowed
        }
    }

    pub fn remaining(&self, agent_id: &str) -> u32 {
        let Some(entry) = self.windows.get(agent_id) else {
            return self.max_requests as u32;
        };
        let timestamps = entry.lock();
        let cutoff = Instant::now() - self.window;
        let recent = timestamps.iter().filter(|t| **t > cutoff).count();
        self.max_requests.saturating_sub(recent) as u32
    }
}

/// Evaluates the policy × library matrix for agent calls.
pub struct AccessControl {
    policies: DashMap<Uuid, LibraryPolicy>,
    catalog: Arc<dyn LibraryCatalog>,
    default_write_enabled: bool,
    pub rate_limiter: RateLimiter,
}

impl AccessControl {
    pub fn new(
        catalog: Arc<dyn LibraryCatalog>,
        default_write_enabled: bool,
        rate_limit_requests: usize,
        rate_limit_window_seconds: u64,
    ) -> Self {
        Self {
            policies: DashMap::new(),
            catalog,
            default_write_enabled,
            rate_limiter: RateLimiter::new(rate_limit_requests, rate_limit_window_seconds),
        }
    }

    pub fn set_policy(&self, policy: LibraryPolicy) {
        self.policies.insert(policy.library_id, policy);
    }

    pub fn policy_for(&self, library_id: Uuid) -> LibraryPolicy {
        self.policies
            .get(&library_id)
            .map(|p| p.clone())
            .unwrap_or_else(|| LibraryPolicy::default_for(library_id, self.default_write_enabled))
    }

    /// Library ids the agent may touch. For writes, the library's own
    /// `mcp_write_enabled` flag must also be set.
    pub async fn accessible_libraries(&self, agent_id: &str, for_write: bool) -> Vec<Uuid> {
        let entries = match self.catalog.list_libraries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(agent_id, error = %e, "library catalog unavailable");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter(|entry| {
                let policy = self.policy_for(entry.library_id);
                if for_write {
                    policy.can_write(agent_id) && entry.mcp_write_enabled
                } else {
                    policy.can_read(agent_id)
                }
            })
            .map(|entry| entry.library_id)
            .collect()
    }

    /// Check one library. Write checks consult both the policy and the
    /// library row; a missing or soft-deleted library denies.
    pub async fn check_library_access(&self, library_id: Uuid, agent_id: &str, for_write: bool) -> bool {
        let policy = self.policy_for(library_id);
        if for_write {
            if !policy.can_write(agent_id) {
                return false;
            }
            match self.catalog.write_flag(library_id).await {
                Ok(Some(flag)) => flag,
                Ok(None) => false,
                Err(e) => {
                    warn!(%library_id, error = %e, "write flag lookup failed");
                    false
                }
            }
        } else {
            policy.can_read(agent_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedCatalog {
        entries: Vec<CatalogEntry>,
    }

    #[async_trait]
    impl LibraryCatalog for FixedCatalog {
        async fn list_libraries(&self) -> anyhow::Result<Vec<CatalogEntry>> {
            Ok(self.entries.clone())
        }

        async fn write_flag(&self, library_id: Uuid) -> anyhow::Result<Option<bool>> {
            Ok(self
                .entries
                .iter()
                .find(|e| e.library_id == library_id)
                .map(|e| e.mcp_write_enabled))
        }
    }

    fn access(entries: Vec<CatalogEntry>, default_write: bool) -> AccessControl {
        AccessControl::new(Arc::new(FixedCatalog { entries }), default_write, 100, 60)
    }

    #[test]
    fn rate_limiter_admits_up_to_the_cap() {
        let limiter = RateLimiter::new(3, 60);
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        assert_eq!(limiter.check("a"), RateDecision::Limited { remaining: 0 });
        // A different agent has its own window.
        assert_eq!(limiter.check("b"), RateDecision::Allowed);
    }

    #[test]
    fn denied_requests_are_not_charged() {
        let limiter = RateLimiter::new(1, 60);
        assert_eq!(limiter.check("a"), RateDecision::Allowed);
        for _ in 0..10 {
            assert_eq!(limiter.check("a"), RateDecision::Limited { remaining: 0 });
        }
        assert_eq!(limiter.remaining("a"), 0);
    }

    #[test]
    fn remaining_starts_at_the_cap() {
        let limiter = RateLimiter::new(5, 60);
        assert_eq!(limiter.remaining("nobody"), 5);
    }

    #[tokio::test]
    async fn write_requires_both_policy_and_library_flag() {
        let lib_on = Uuid::new_v4();
        let lib_off = Uuid::new_v4();
        let access = access(
            vec![
                CatalogEntry { library_id: lib_on, mcp_write_enabled: true },
                CatalogEntry { library_id: lib_off, mcp_write_enabled: false },
            ],
            true, // default policy allows writes
        );

        assert!(access.check_library_access(lib_on, "agent", true).await);
        assert!(!access.check_library_access(lib_off, "agent", true).await);

        let writable = access.accessible_libraries("agent", true).await;
        assert_eq!(writable, vec![lib_on]);
    }

    #[tokio::test]
    async fn unknown_library_denies_write_but_allows_read_by_default() {
        let access = access(vec![], false);
        let lib = Uuid::new_v4();
        assert!(access.check_library_access(lib, "agent", false).await);
        assert!(!access.check_library_access(lib, "agent", true).await);
    }

    #[tokio::test]
    async fn explicit_policy_overrides_default() {
        let lib = Uuid::new_v4();
        let access = access(
            vec![CatalogEntry { library_id: lib, mcp_write_enabled: true }],
            false,
        );
        access.set_policy(LibraryPolicy::new(lib, false, true));

        assert!(!access.check_library_access(lib, "agent", false).await);
        assert!(access.check_library_access(lib, "agent", true).await);
    }
}
