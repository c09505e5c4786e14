// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: access control and the agent-facing vector tools.

pub mod access;
pub mod tools;

pub use access::{AccessControl, CatalogEntry, LibraryCatalog, RateDecision, RateLimiter};
pub use tools::VectorToolService;
