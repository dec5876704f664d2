// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feed data: posts, influencers, wishlist and recommendations.
//!
//! Every write is made on behalf of the signed-in user from the auth store;
//! callers never pass an owner ID.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use validator::Validate;

use super::auth_store::AuthStore;
use crate::db::{
    collections, decode_row, encode_row, select_as, Filter, HostedDb, ProfileRepository, Query,
};
use crate::error::{AppError, Result};
use crate::models::{NewPost, Post, PostUpdate, UserProfile, WishlistItem};
use crate::time_utils::now_rfc3339;

/// How many recent posts are considered for recommendations.
const RECOMMENDATION_CANDIDATES: usize = 200;

const CATEGORY_WEIGHT: u32 = 3;
const STYLE_WEIGHT: u32 = 2;
const SEASON_WEIGHT: u32 = 1;
const BODY_TYPE_WEIGHT: u32 = 1;

/// Feed operations over the hosted database.
#[derive(Clone)]
pub struct FeedService {
    db: Arc<dyn HostedDb>,
    profiles: ProfileRepository,
    auth: AuthStore,
}

impl FeedService {
    pub fn new(db: Arc<dyn HostedDb>, auth: AuthStore) -> Self {
        Self {
            profiles: ProfileRepository::new(db.clone()),
            db,
            auth,
        }
    }

    fn require_user(&self) -> Result<UserProfile> {
        self.auth.current_user().ok_or(AppError::NotAuthenticated)
    }

    // --- Posts ---

    /// Most recent posts across all users.
    pub async fn list_posts(&self, limit: usize) -> Result<Vec<Post>> {
        select_as(
            self.db.as_ref(),
            collections::POSTS,
            &Query::new().order_desc("created_at").limit(limit),
        )
        .await
    }

    /// Posts by one user, newest first.
    pub async fn posts_by_user(&self, user_id: &str) -> Result<Vec<Post>> {
        select_as(
            self.db.as_ref(),
            collections::POSTS,
            &Query::new().eq("user_id", user_id).order_desc("created_at"),
        )
        .await
    }

    pub async fn get_post(&self, post_id: &str) -> Result<Post> {
        let mut rows: Vec<Post> = select_as(
            self.db.as_ref(),
            collections::POSTS,
            &Query::new().eq("id", post_id).limit(1),
        )
        .await?;
        rows.pop()
            .ok_or_else(|| AppError::NotFound(format!("Post {}", post_id)))
    }

    /// Publish a post as the current user.
    pub async fn create_post(&self, mut post: NewPost) -> Result<Post> {
        let user = self.require_user()?;
        post.title = post.title.trim().to_string();
        post.validate()?;

        let mut row = encode_row(collections::POSTS, &post)?;
        if let Value::Object(fields) = &mut row {
            fields.insert("user_id".to_string(), json!(user.id));
            fields.insert("likes_count".to_string(), json!(0));
        }

        let stored = self.db.insert(collections::POSTS, row).await?;
        let post: Post = decode_row(collections::POSTS, stored)?;
        tracing::info!(user_id = %user.id, post_id = %post.id, "Post created");
        Ok(post)
    }

    /// Update one of the current user's posts.
    ///
    /// Posts owned by someone else are reported as not found.
    pub async fn update_post(&self, post_id: &str, mut update: PostUpdate) -> Result<Post> {
        let user = self.require_user()?;
        update.title = update.title.map(|t| t.trim().to_string());
        update.validate()?;

        let mut patch = encode_row(collections::POSTS, &update)?;
        if let Value::Object(fields) = &mut patch {
            fields.insert("updated_at".to_string(), json!(now_rfc3339()));
        }

        let mut rows = self
            .db
            .update(collections::POSTS, &owned_post(post_id, &user.id), patch)
            .await?;
        let row = rows
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Post {}", post_id)))?;
        decode_row(collections::POSTS, row)
    }

    /// Delete one of the current user's posts.
    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        let user = self.require_user()?;
        let deleted = self
            .db
            .delete(collections::POSTS, &owned_post(post_id, &user.id))
            .await?;
        if deleted == 0 {
            return Err(AppError::NotFound(format!("Post {}", post_id)));
        }
        tracing::info!(user_id = %user.id, post_id, "Post deleted");
        Ok(())
    }

    // --- Influencers ---

    pub async fn list_influencers(&self) -> Result<Vec<UserProfile>> {
        self.profiles.list_influencers().await
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserProfile> {
        self.profiles
            .fetch(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", user_id)))
    }

    // --- Wishlist ---

    async fn wishlist_rows(&self, user_id: &str) -> Result<Vec<WishlistItem>> {
        select_as(
            self.db.as_ref(),
            collections::WISHLISTS,
            &Query::new().eq("user_id", user_id).order_desc("created_at"),
        )
        .await
    }

    /// Wishlisted posts, most recently added first.
    ///
    /// Entries whose post has since been deleted are skipped.
    pub async fn wishlist(&self) -> Result<Vec<Post>> {
        let user = self.require_user()?;
        let mut posts = Vec::new();
        for item in self.wishlist_rows(&user.id).await? {
            match self.get_post(&item.post_id).await {
                Ok(post) => posts.push(post),
                Err(AppError::NotFound(_)) => {
                    tracing::debug!(post_id = %item.post_id, "Skipping wishlist entry for deleted post");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(posts)
    }

    /// Add a post to the wishlist. Adding it twice returns the existing entry.
    pub async fn add_to_wishlist(&self, post_id: &str) -> Result<WishlistItem> {
        let user = self.require_user()?;
        let existing: Vec<WishlistItem> = select_as(
            self.db.as_ref(),
            collections::WISHLISTS,
            &Query::new()
                .eq("user_id", user.id.as_str())
                .eq("post_id", post_id)
                .limit(1),
        )
        .await?;
        if let Some(item) = existing.into_iter().next() {
            return Ok(item);
        }

        // Fail with NotFound rather than wishlisting a dangling ID.
        self.get_post(post_id).await?;

        let stored = self
            .db
            .insert(
                collections::WISHLISTS,
                json!({ "user_id": user.id, "post_id": post_id }),
            )
            .await?;
        decode_row(collections::WISHLISTS, stored)
    }

    /// Remove a post from the wishlist. Returns whether it was there.
    pub async fn remove_from_wishlist(&self, post_id: &str) -> Result<bool> {
        let user = self.require_user()?;
        let deleted = self
            .db
            .delete(
                collections::WISHLISTS,
                &[
                    Filter::eq("user_id", user.id.as_str()),
                    Filter::eq("post_id", post_id),
                ],
            )
            .await?;
        Ok(deleted > 0)
    }

    pub async fn is_wishlisted(&self, post_id: &str) -> Result<bool> {
        let user = self.require_user()?;
        let rows = self
            .db
            .select(
                collections::WISHLISTS,
                &Query::new()
                    .eq("user_id", user.id.as_str())
                    .eq("post_id", post_id)
                    .limit(1),
            )
            .await?;
        Ok(!rows.is_empty())
    }

    // --- Recommendations ---

    /// Posts for the current user, best preference match first.
    ///
    /// The user's own posts and wishlisted posts are left out. Posts with
    /// equal scores keep their recency order.
    pub async fn recommendations(&self, limit: usize) -> Result<Vec<Post>> {
        let user = self.require_user()?;

        let wishlisted: HashSet<String> = self
            .wishlist_rows(&user.id)
            .await?
            .into_iter()
            .map(|item| item.post_id)
            .collect();

        let candidates: Vec<Post> = select_as(
            self.db.as_ref(),
            collections::POSTS,
            &Query::new()
                .order_desc("created_at")
                .limit(RECOMMENDATION_CANDIDATES),
        )
        .await?;

        let mut scored: Vec<(u32, Post)> = candidates
            .into_iter()
            .filter(|post| post.user_id != user.id && !wishlisted.contains(&post.id))
            .map(|post| (preference_score(&user, &post), post))
            .collect();
        // Stable sort: equal scores stay newest first.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, post)| post)
            .collect())
    }
}

fn owned_post(post_id: &str, user_id: &str) -> [Filter; 2] {
    [Filter::eq("id", post_id), Filter::eq("user_id", user_id)]
}

/// Preference overlap between a user and a post.
fn preference_score(user: &UserProfile, post: &Post) -> u32 {
    let has_tag = |pref: &Option<String>| {
        pref.as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .is_some_and(|p| post.tags.iter().any(|t| t.trim().eq_ignore_ascii_case(p)))
    };

    let mut score = 0;
    let category_match = match (user.category.as_deref(), post.category.as_deref()) {
        (Some(want), Some(have)) => {
            !want.trim().is_empty() && want.trim().eq_ignore_ascii_case(have.trim())
        }
        _ => false,
    };
    if category_match || has_tag(&user.category) {
        score += CATEGORY_WEIGHT;
    }
    if has_tag(&user.style_preference) {
        score += STYLE_WEIGHT;
    }
    if has_tag(&user.season_preference) {
        score += SEASON_WEIGHT;
    }
    if has_tag(&user.body_type) {
        score += BODY_TYPE_WEIGHT;
    }
    score
}
