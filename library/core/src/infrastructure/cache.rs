// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Keyed entity and listing cache.
//!
//! In-process TTL cache with prefix invalidation. Cache failures never
//! fail the caller — reads degrade to a miss and are logged at warning.

use moka::sync::Cache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct EntityCache {
    cache: Cache<String, Value>,
    prefix: String,
}

impl EntityCache {
    pub fn new(ttl_seconds: u64, prefix: impl Into<String>) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(100_000)
            .support_invalidation_closures()
            .build();
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    fn make_key(&self, namespace: &str, parts: &[&str]) -> String {
        format!("{}{}:{}", self.prefix, namespace, parts.join(":"))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "cache entry failed to decode; treating as miss");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(v) => self.cache.insert(key.to_string(), v),
            Err(e) => warn!(key, error = %e, "cache entry failed to encode; skipping"),
        }
    }

    pub fn delete(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Invalidate every key starting with `prefix` (after the cache's own
    /// namespace prefix).
    pub fn delete_prefix(&self, prefix: &str) {
        let full = format!("{}{}", self.prefix, prefix);
        if let Err(e) = self.cache.invalidate_entries_if(move |key, _| key.starts_with(&full)) {
            warn!(error = %e, "prefix invalidation failed");
        }
    }

    // ------------------------------------------------------------------
    // Key builders
    // ------------------------------------------------------------------

    pub fn library_key(&self, library_id: Uuid) -> String {
        self.make_key("library", &[&library_id.to_string()])
    }

    pub fn library_list_key(&self, user_id: Uuid) -> String {
        self.make_key("library_list", &[&user_id.to_string()])
    }

    pub fn directory_key(&self, directory_id: Uuid) -> String {
        self.make_key("directory", &[&directory_id.to_string()])
    }

    pub fn directory_listing_key(&self, library_id: Uuid, parent: &str) -> String {
        self.make_key("listing", &[&library_id.to_string(), parent])
    }

    pub fn file_key(&self, file_id: Uuid) -> String {
        self.make_key("file", &[&file_id.to_string()])
    }

    pub fn file_versions_key(&self, file_id: Uuid) -> String {
        self.make_key("file_versions", &[&file_id.to_string()])
    }

    // ------------------------------------------------------------------
    // Invalidation helpers
    // ------------------------------------------------------------------

    pub fn invalidate_library(&self, library_id: Uuid) {
        self.delete(&self.library_key(library_id));
        self.delete_prefix("library_list:");
        self.delete_prefix(&format!("listing:{library_id}"));
    }

    pub fn invalidate_directory(&self, directory_id: Uuid, library_id: Uuid) {
        self.delete(&self.directory_key(directory_id));
        self.delete_prefix(&format!("listing:{library_id}"));
    }

    pub fn invalidate_file(&self, file_id: Uuid, library_id: Uuid) {
        self.delete(&self.file_key(file_id));
        self.delete(&self.file_versions_key(file_id));
        self.delete_prefix(&format!("listing:{library_id}"));
    }

    /// Drop everything cached for one library.
    pub fn invalidate_library_tree(&self, library_id: Uuid) {
        self.delete(&self.library_key(library_id));
        self.delete_prefix(&format!("listing:{library_id}"));
        self.delete_prefix("library_list:");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> EntityCache {
        EntityCache::new(300, "test:")
    }

    #[test]
    fn set_get_round_trip() {
        let c = cache();
        let key = c.library_key(Uuid::nil());
        c.set(&key, &json!({"name": "lib"}));
        let got: Option<Value> = c.get(&key);
        assert_eq!(got.unwrap()["name"], "lib");
    }

    #[test]
    fn delete_removes_entry() {
        let c = cache();
        let key = c.file_key(Uuid::nil());
        c.set(&key, &json!(1));
        c.delete(&key);
        assert!(c.get::<Value>(&key).is_none());
    }

    #[test]
    fn prefix_invalidation_hits_listings() {
        let c = cache();
        let lib = Uuid::new_v4();
        let listing_a = c.directory_listing_key(lib, "/");
        let listing_b = c.directory_listing_key(lib, "/docs");
        let other = c.directory_listing_key(Uuid::new_v4(), "/");
        c.set(&listing_a, &json!([1]));
        c.set(&listing_b, &json!([2]));
        c.set(&other, &json!([3]));

        c.invalidate_directory(Uuid::new_v4(), lib);
        // moka applies invalidation predicates lazily; reads go through the
        // predicate, so misses are observed immediately.
        c.cache.run_pending_tasks();

        assert!(c.get::<Value>(&listing_a).is_none());
        assert!(c.get::<Value>(&listing_b).is_none());
        assert!(c.get::<Value>(&other).is_some());
    }

    #[test]
    fn undecodable_entry_degrades_to_miss() {
        let c = cache();
        let key = c.file_key(Uuid::nil());
        c.set(&key, &json!("not-a-number"));
        let got: Option<u32> = c.get(&key);
        assert!(got.is_none());
    }
}
