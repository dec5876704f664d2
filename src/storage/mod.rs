// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side persistent storage.
//!
//! Two stores are in play, mirroring a browser tab: a durable "local" store
//! (file-backed) and a tab-scoped "session" store (in memory). Both hold plain
//! string values keyed by string.

pub mod file;
pub mod memory;
pub mod profile_cache;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use profile_cache::ProfileCache;

use crate::error::Result;

/// Storage key names as constants.
pub mod keys {
    /// Serialized cached user profile.
    pub const USER_CACHE: &str = "user";
    /// Prefix of keys written by the hosted auth client.
    pub const HOSTED_SESSION_PREFIX: &str = "sb-";
    /// Legacy prefix of hosted auth keys.
    pub const LEGACY_SESSION_PREFIX: &str = "supabase.auth.";

    /// True if `key` holds a hosted-session artifact.
    pub fn is_session_artifact(key: &str) -> bool {
        key.starts_with(HOSTED_SESSION_PREFIX) || key.starts_with(LEGACY_SESSION_PREFIX)
    }
}

/// String key/value store with `localStorage`-like semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Vec<String>;
}

/// Remove every hosted-session artifact from `store`.
///
/// Returns how many keys were removed. Keys that fail to delete are logged
/// and skipped so one bad key cannot keep the rest alive.
pub fn purge_session_artifacts(store: &dyn KeyValueStore) -> usize {
    let mut removed = 0;
    for key in store.keys() {
        if !keys::is_session_artifact(&key) {
            continue;
        }
        match store.remove(&key) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to purge session key"),
        }
    }
    removed
}
