// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed access to the cached user profile in local storage.

use std::sync::Arc;

use super::{keys, KeyValueStore};
use crate::error::{AppError, Result};
use crate::models::UserProfile;

/// Read-only mirror of the signed-in user's profile row.
#[derive(Clone)]
pub struct ProfileCache {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the cached profile.
    ///
    /// An unparseable entry is removed and treated as absent.
    pub fn load(&self) -> Option<UserProfile> {
        let raw = self.store.get(keys::USER_CACHE)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping unparseable cached profile");
                if let Err(e) = self.store.remove(keys::USER_CACHE) {
                    tracing::warn!(error = %e, "Failed to remove cached profile");
                }
                None
            }
        }
    }

    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(profile)
            .map_err(|e| AppError::Storage(format!("Failed to serialize profile: {}", e)))?;
        self.store.set(keys::USER_CACHE, &json)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(keys::USER_CACHE)
    }
}
