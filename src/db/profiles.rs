// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed operations on the `users` table.

use std::sync::Arc;

use super::{collections, decode_row, encode_row, select_as, Filter, HostedDb, Query};
use crate::error::{AppError, Result};
use crate::models::{ProfileUpdate, UserProfile};

/// Profile rows in the hosted database.
#[derive(Clone)]
pub struct ProfileRepository {
    db: Arc<dyn HostedDb>,
}

impl ProfileRepository {
    pub fn new(db: Arc<dyn HostedDb>) -> Self {
        Self { db }
    }

    /// Get a profile by user ID.
    pub async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let mut rows: Vec<UserProfile> = select_as(
            self.db.as_ref(),
            collections::USERS,
            &Query::new().eq("id", user_id).limit(1),
        )
        .await?;
        Ok(rows.pop())
    }

    /// Insert a new profile row and return it as stored.
    pub async fn create(&self, profile: &UserProfile) -> Result<UserProfile> {
        let row = encode_row(collections::USERS, profile)?;
        let stored = self.db.insert(collections::USERS, row).await?;
        decode_row(collections::USERS, stored)
    }

    /// Apply a partial update to the row keyed by `user_id` and return the
    /// full row as the database now has it.
    pub async fn update(&self, user_id: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        let patch = encode_row(collections::USERS, update)?;
        let mut rows = self
            .db
            .update(collections::USERS, &[Filter::eq("id", user_id)], patch)
            .await?;

        let row = rows
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", user_id)))?;
        decode_row(collections::USERS, row)
    }

    /// All influencer profiles, newest first.
    pub async fn list_influencers(&self) -> Result<Vec<UserProfile>> {
        select_as(
            self.db.as_ref(),
            collections::USERS,
            &Query::new()
                .eq("is_influencer", true)
                .order_desc("created_at"),
        )
        .await
    }
}
