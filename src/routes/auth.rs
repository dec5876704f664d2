// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and login routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::Result;
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, SessionUser, UserProfile};
use crate::time_utils::now_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

/// Create a hosted user and its profile row.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let body = body.normalized();
    body.validate()?;

    let metadata = json!({
        "name": body.name,
        "phone": body.phone,
        "gender": body.gender,
    });
    let outcome = state
        .auth_api
        .sign_up(&body.email, &body.password, metadata)
        .await?;

    let profile = UserProfile {
        name: body.name,
        email: body.email,
        phone: body.phone,
        gender: body.gender,
        ..UserProfile::from_session_user(&outcome.user, &now_rfc3339())
    };
    let user = state.profiles.create(&profile).await?;

    tracing::info!(
        user_id = %user.id,
        has_session = outcome.session.is_some(),
        "User registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            session: outcome.session,
        }),
    ))
}

/// Password login; creates the profile row on first login if sign-up did
/// not get that far.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let body = LoginRequest::new(&body.email, &body.password);
    body.validate()?;

    let session = state
        .auth_api
        .sign_in_with_password(&body.email, &body.password)
        .await?;

    let user = match state.profiles.fetch(&session.user.id).await? {
        Some(user) => user,
        None => create_missing_profile(&state, &session.user).await?,
    };

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user,
        session: Some(session),
    }))
}

async fn create_missing_profile(state: &AppState, user: &SessionUser) -> Result<UserProfile> {
    tracing::info!(user_id = %user.id, "Creating missing profile on login");
    let profile = UserProfile::from_session_user(user, &now_rfc3339());
    state.profiles.create(&profile).await
}
