// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-library access policies for the agent tool surface.
//!
//! A policy gates what a given agent may do against one library's vector
//! collection and files. Policies are evaluated on every agent call; a
//! library without an explicit policy gets [`LibraryPolicy::default_for`],
//! whose write flag comes from configuration. Write access is additionally
//! AND-ed with the library row's own `mcp_write_enabled` flag by the
//! access-control layer.

use uuid::Uuid;

/// Read/write + allowed-agent gate for one library.
#[derive(Debug, Clone)]
pub struct LibraryPolicy {
    pub library_id: Uuid,
    pub read_enabled: bool,
    pub write_enabled: bool,
    /// `None` means every agent is allowed.
    pub allowed_agents: Option<Vec<String>>,
}

impl LibraryPolicy {
    pub fn new(library_id: Uuid, read_enabled: bool, write_enabled: bool) -> Self {
        Self {
            library_id,
            read_enabled,
            write_enabled,
            allowed_agents: None,
        }
    }

    /// Policy applied to libraries without an explicit entry.
    pub fn default_for(library_id: Uuid, default_write_enabled: bool) -> Self {
        Self::new(library_id, true, default_write_enabled)
    }

    fn agent_allowed(&self, agent_id: &str) -> bool {
        match &self.allowed_agents {
            None => true,
            Some(allowed) => allowed.iter().any(|a| a == agent_id),
        }
    }

    pub fn can_read(&self, agent_id: &str) -> bool {
        self.read_enabled && self.agent_allowed(agent_id)
    }

    pub fn can_write(&self, agent_id: &str) -> bool {
        self.write_enabled && self.agent_allowed(agent_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_read_only() {
        let policy = LibraryPolicy::default_for(Uuid::new_v4(), false);
        assert!(policy.can_read("agent-1"));
        assert!(!policy.can_write("agent-1"));
    }

    #[test]
    fn allowed_agents_restrict_both_directions() {
        let mut policy = LibraryPolicy::new(Uuid::new_v4(), true, true);
        policy.allowed_agents = Some(vec!["trusted".to_string()]);

        assert!(policy.can_read("trusted"));
        assert!(policy.can_write("trusted"));
        assert!(!policy.can_read("other"));
        assert!(!policy.can_write("other"));
    }

    #[test]
    fn disabled_read_denies_even_allowed_agent() {
        let mut policy = LibraryPolicy::new(Uuid::new_v4(), false, false);
        policy.allowed_agents = Some(vec!["trusted".to_string()]);
        assert!(!policy.can_read("trusted"));
    }
}
