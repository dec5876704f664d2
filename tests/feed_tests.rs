// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Posts, wishlist, influencers and recommendations.

use serde_json::json;
use shopfeed::db::{collections, HostedDb};
use shopfeed::error::AppError;
use shopfeed::models::{AuthResponse, NewPost, PostUpdate, UserProfile};

mod common;
use common::{harness, profile, seed_profile, Harness, Reply, StubBackend};

/// Harness with `user` logged in and its profile row stored.
async fn logged_in(user: UserProfile) -> Harness {
    let backend = StubBackend::new();
    backend.on_login(Reply::Ok(AuthResponse {
        user: user.clone(),
        session: None,
    }));
    let h = harness(backend);
    seed_profile(&h.db, &user).await;
    assert!(h.app.auth.login(&user.email, "secret1").await);
    h
}

/// Insert a post row directly with a fixed creation time.
async fn seed_post(
    h: &Harness,
    id: &str,
    user_id: &str,
    created_at: &str,
    category: &str,
    tags: &[&str],
) {
    h.db.insert(
        collections::POSTS,
        json!({
            "id": id,
            "user_id": user_id,
            "title": format!("Post {}", id),
            "category": category,
            "tags": tags,
            "likes_count": 0,
            "created_at": created_at,
            "updated_at": created_at,
        }),
    )
    .await
    .unwrap();
}

fn new_post(title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        price: Some(25.0),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_post_as_current_user() {
    let h = logged_in(profile("u1", "A", "a@x.com")).await;

    let post = h.app.feed.create_post(new_post("  Denim jacket ")).await.unwrap();

    assert_eq!(post.user_id, "u1");
    assert_eq!(post.title, "Denim jacket");
    assert_eq!(post.likes_count, 0);
    assert!(!post.created_at.is_empty());
    assert_eq!(h.app.feed.get_post(&post.id).await.unwrap(), post);
    assert_eq!(h.app.feed.posts_by_user("u1").await.unwrap(), vec![post]);
}

#[tokio::test]
async fn test_create_post_validation() {
    let h = logged_in(profile("u1", "A", "a@x.com")).await;

    let err = h.app.feed.create_post(new_post("   ")).await.unwrap_err();
    assert_eq!(err.to_string(), "Title is required");

    let err = h
        .app
        .feed
        .create_post(NewPost {
            price: Some(-1.0),
            ..new_post("Shoes")
        })
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Price cannot be negative");
    assert_eq!(h.db.row_count(collections::POSTS), 0);
}

#[tokio::test]
async fn test_create_post_requires_login() {
    let h = harness(StubBackend::new());
    let err = h.app.feed.create_post(new_post("Shoes")).await.unwrap_err();
    assert!(matches!(err, AppError::NotAuthenticated));
}

#[tokio::test]
async fn test_only_owner_can_update_or_delete() {
    let h = logged_in(profile("u1", "A", "a@x.com")).await;
    seed_post(&h, "theirs", "u2", "2026-01-01T00:00:00.000Z", "Fashion", &[]).await;
    let mine = h.app.feed.create_post(new_post("Mine")).await.unwrap();

    let updated = h
        .app
        .feed
        .update_post(
            &mine.id,
            PostUpdate {
                price: Some(30.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.price, Some(30.0));
    assert_eq!(updated.title, "Mine");

    let err = h
        .app
        .feed
        .update_post(
            "theirs",
            PostUpdate {
                title: Some("Hijacked".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert!(matches!(
        h.app.feed.delete_post("theirs").await,
        Err(AppError::NotFound(_))
    ));
    h.app.feed.delete_post(&mine.id).await.unwrap();
    assert_eq!(h.db.row_count(collections::POSTS), 1);
}

#[tokio::test]
async fn test_list_posts_newest_first() {
    let h = logged_in(profile("u1", "A", "a@x.com")).await;
    seed_post(&h, "p1", "u2", "2026-01-01T00:00:00.000Z", "Fashion", &[]).await;
    seed_post(&h, "p3", "u2", "2026-01-03T00:00:00.000Z", "Fashion", &[]).await;
    seed_post(&h, "p2", "u2", "2026-01-02T00:00:00.000Z", "Fashion", &[]).await;

    let ids: Vec<String> = h
        .app
        .feed
        .list_posts(2)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec!["p3", "p2"]);
}

#[tokio::test]
async fn test_wishlist_add_is_idempotent() {
    let h = logged_in(profile("u1", "A", "a@x.com")).await;
    seed_post(&h, "p1", "u2", "2026-01-01T00:00:00.000Z", "Fashion", &[]).await;

    let first = h.app.feed.add_to_wishlist("p1").await.unwrap();
    let second = h.app.feed.add_to_wishlist("p1").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(h.db.row_count(collections::WISHLISTS), 1);
    assert!(h.app.feed.is_wishlisted("p1").await.unwrap());

    let posts = h.app.feed.wishlist().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "p1");

    assert!(h.app.feed.remove_from_wishlist("p1").await.unwrap());
    assert!(!h.app.feed.remove_from_wishlist("p1").await.unwrap());
    assert!(!h.app.feed.is_wishlisted("p1").await.unwrap());
}

#[tokio::test]
async fn test_wishlist_rejects_unknown_post() {
    let h = logged_in(profile("u1", "A", "a@x.com")).await;
    assert!(matches!(
        h.app.feed.add_to_wishlist("missing").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_wishlist_skips_deleted_posts() {
    let h = logged_in(profile("u1", "A", "a@x.com")).await;
    seed_post(&h, "p1", "u2", "2026-01-01T00:00:00.000Z", "Fashion", &[]).await;
    h.app.feed.add_to_wishlist("p1").await.unwrap();

    h.db.delete(collections::POSTS, &[shopfeed::db::Filter::eq("id", "p1")])
        .await
        .unwrap();

    assert!(h.app.feed.wishlist().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_influencers() {
    let h = logged_in(profile("u1", "A", "a@x.com")).await;
    let mut influencer = profile("u2", "Mia", "mia@x.com");
    influencer.is_influencer = true;
    seed_profile(&h.db, &influencer).await;

    let influencers = h.app.feed.list_influencers().await.unwrap();
    assert_eq!(influencers, vec![influencer]);
    assert_eq!(h.app.feed.get_profile("u2").await.unwrap().name, "Mia");
    assert!(matches!(
        h.app.feed.get_profile("nobody").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_recommendations_rank_by_preferences() {
    let mut user = profile("u1", "A", "a@x.com");
    user.category = Some("Fashion".to_string());
    user.style_preference = Some("minimal".to_string());
    user.season_preference = Some("summer".to_string());
    let h = logged_in(user).await;

    seed_post(&h, "old-match", "u2", "2026-01-01T00:00:00.000Z", "Fashion", &["minimal"]).await;
    seed_post(&h, "new-plain", "u2", "2026-01-05T00:00:00.000Z", "Beauty", &[]).await;
    seed_post(&h, "season", "u2", "2026-01-03T00:00:00.000Z", "Beauty", &["summer"]).await;
    seed_post(&h, "newer-plain", "u2", "2026-01-06T00:00:00.000Z", "Home", &[]).await;
    seed_post(&h, "wishlisted", "u2", "2026-01-04T00:00:00.000Z", "Fashion", &["minimal"]).await;
    seed_post(&h, "own", "u1", "2026-01-02T00:00:00.000Z", "Fashion", &["minimal"]).await;
    h.app.feed.add_to_wishlist("wishlisted").await.unwrap();

    let ids: Vec<String> = h
        .app
        .feed
        .recommendations(10)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();

    assert_eq!(ids, vec!["old-match", "season", "newer-plain", "new-plain"]);
}
