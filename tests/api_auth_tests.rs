// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration/login endpoint and CORS tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use shopfeed::db::collections;
use shopfeed::error::ErrorResponse;
use shopfeed::models::{AuthResponse, Gender};
use tower::ServiceExt;

mod common;
use common::create_test_app;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn registration(email: &str, password: &str) -> Value {
    json!({
        "name": "Alice",
        "email": email,
        "password": password,
        "phone": "555-0100",
        "gender": "female",
    })
}

#[tokio::test]
async fn test_register_creates_user_and_profile() {
    let (app, _, _, db) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            registration("Alice@Example.com", "secret1"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: AuthResponse = read_json(response).await;
    assert_eq!(body.user.name, "Alice");
    assert_eq!(body.user.email, "alice@example.com");
    assert_eq!(body.user.gender, Gender::Female);
    assert_eq!(body.user.phone.as_deref(), Some("555-0100"));
    assert!(body.session.is_some());
    assert_eq!(db.row_count(collections::USERS), 1);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let (app, _, _, _) = create_test_app();

    let first = app
        .clone()
        .oneshot(post_json("/api/auth/register", registration("a@x.com", "secret1")))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(post_json("/api/auth/register", registration("a@x.com", "secret2")))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: ErrorResponse = read_json(second).await;
    assert_eq!(body.code, "EMAIL_TAKEN");
}

#[tokio::test]
async fn test_register_short_password_rejected() {
    let (app, _, _, db) = create_test_app();

    let response = app
        .oneshot(post_json("/api/auth/register", registration("a@x.com", "12345")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = read_json(response).await;
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert_eq!(body.error, "Password must be at least 6 characters");
    assert_eq!(db.row_count(collections::USERS), 0);
}

#[tokio::test]
async fn test_login_returns_profile_and_session() {
    let (app, _, _, _) = create_test_app();

    app.clone()
        .oneshot(post_json("/api/auth/register", registration("a@x.com", "secret1")))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({"email": "A@x.com", "password": "secret1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: AuthResponse = read_json(response).await;
    assert_eq!(body.user.name, "Alice");
    let session = body.session.expect("login returns a session");
    assert_eq!(session.user.id, body.user.id);
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let (app, _, api, _) = create_test_app();
    api.create_user("a@x.com", "secret1", Value::Null);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({"email": "a@x.com", "password": "nope"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = read_json(response).await;
    assert_eq!(body.code, "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_creates_missing_profile() {
    let (app, _, api, db) = create_test_app();
    api.create_user(
        "bob@example.com",
        "secret1",
        json!({"name": "Bob", "gender": "male"}),
    );

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({"email": "bob@example.com", "password": "secret1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: AuthResponse = read_json(response).await;
    assert_eq!(body.user.name, "Bob");
    assert_eq!(body.user.gender, Gender::Male);
    assert_eq!(db.row_count(collections::USERS), 1);
}

#[tokio::test]
async fn test_login_hosted_outage_is_bad_gateway() {
    let (app, _, api, _) = create_test_app();
    api.set_offline(true);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({"email": "a@x.com", "password": "secret1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorResponse = read_json(response).await;
    assert_eq!(body.code, "NETWORK_ERROR");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/auth/login")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_health() {
    let (app, _, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "shopfeed");
}
