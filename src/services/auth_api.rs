// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted auth API client (`/auth/v1/*`).
//!
//! Stateless: every call takes the tokens it needs. Session state on the
//! client side lives in [`crate::services::HostedSession`]; the backend uses
//! this API directly.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Session, SessionUser};

/// Lifetime assumed when the service omits both `expires_at` and `expires_in`.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Result of a sign-up.
///
/// When the hosted project requires email confirmation no session is issued.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: SessionUser,
    pub session: Option<Session>,
}

/// Stateless hosted auth operations.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email/password for a session.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Create a user; `metadata` is stored as user metadata.
    async fn sign_up(&self, email: &str, password: &str, metadata: Value)
        -> Result<SignUpOutcome>;

    /// Resolve an access token to its user (validates the token remotely).
    async fn get_user(&self, access_token: &str) -> Result<SessionUser>;

    /// Exchange a refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> Result<Session>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<()>;
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    user: SessionUser,
}

impl From<TokenResponse> for Session {
    fn from(t: TokenResponse) -> Self {
        let expires_at = t.expires_at.unwrap_or_else(|| {
            Utc::now().timestamp() + t.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS)
        });
        Session {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            expires_at,
            token_type: t.token_type.unwrap_or_else(|| "bearer".to_string()),
            user: t.user,
        }
    }
}

/// HTTP client for the hosted auth API.
#[derive(Clone)]
pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoTrueClient {
    pub fn new(supabase_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session> {
        let response = self
            .http
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AppError::network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(grant_type, status = %status, "Token grant rejected");
            return Err(grant_error(grant_type, status, &body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Hosted(format!("Failed to parse token response: {}", e)))?;
        Ok(token.into())
    }
}

/// Service code and human message of an error body.
///
/// Service versions disagree on field names (`error_code` vs `error`,
/// `msg` vs `error_description`), so the first one present wins.
fn error_parts(body: &str) -> (String, String) {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let code = ["error_code", "error"]
        .iter()
        .find_map(|k| parsed.get(*k).and_then(Value::as_str))
        .unwrap_or("");
    let message = ["error_description", "msg", "message"]
        .iter()
        .find_map(|k| parsed.get(*k).and_then(Value::as_str))
        .unwrap_or(body);
    (code.to_string(), message.to_string())
}

/// Map an error response to `AppError`, keeping the service's own code at
/// the front of the message.
fn hosted_error(status: reqwest::StatusCode, body: &str) -> AppError {
    let (code, message) = error_parts(body);
    if code.is_empty() {
        AppError::Hosted(format!("HTTP {}: {}", status, message))
    } else {
        AppError::Hosted(format!("{}: {}", code, message))
    }
}

/// Map a rejected token grant.
///
/// A client error on the refresh grant means the refresh token is gone
/// (used, revoked, or its session deleted), whatever code the service
/// version reports. Rate limiting and timeouts are not rejections.
fn grant_error(grant_type: &str, status: reqwest::StatusCode, body: &str) -> AppError {
    use reqwest::StatusCode;

    let rejected = status.is_client_error()
        && status != StatusCode::TOO_MANY_REQUESTS
        && status != StatusCode::REQUEST_TIMEOUT;

    match grant_type {
        "password" if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED => {
            AppError::InvalidCredentials
        }
        "refresh_token" if rejected => {
            let (code, message) = error_parts(body);
            if code.is_empty() {
                AppError::SessionExpired(message)
            } else {
                AppError::SessionExpired(format!("{}: {}", code, message))
            }
        }
        _ => hosted_error(status, body),
    }
}

/// Sign-up conflicts are reported with different shapes across service
/// versions; match on the text.
fn is_already_registered(body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    body.contains("already registered") || body.contains("user_already_exists")
}

#[async_trait]
impl AuthApi for GoTrueClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.token_grant(
            "password",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<SignUpOutcome> {
        let response = self
            .http
            .post(format!("{}/signup", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(AppError::network)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            if is_already_registered(&body) {
                return Err(AppError::EmailTaken);
            }
            return Err(hosted_error(status, &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| AppError::Hosted(format!("Failed to parse sign-up response: {}", e)))?;

        // Auto-confirmed projects answer with a full token response.
        if value.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(value)
                .map_err(|e| AppError::Hosted(format!("Unexpected sign-up response: {}", e)))?;
            let session: Session = token.into();
            return Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            });
        }

        let user_value = value.get("user").cloned().unwrap_or(value);
        let user: SessionUser = serde_json::from_value(user_value)
            .map_err(|e| AppError::Hosted(format!("Unexpected sign-up response: {}", e)))?;
        Ok(SignUpOutcome {
            user,
            session: None,
        })
    }

    async fn get_user(&self, access_token: &str) -> Result<SessionUser> {
        let response = self
            .http
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(AppError::network)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(AppError::NotAuthenticated);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(hosted_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Hosted(format!("Failed to parse user: {}", e)))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(AppError::network)?;

        // An already-expired session is as signed out as it gets.
        let status = response.status();
        if status.is_success() || status.as_u16() == 401 || status.as_u16() == 404 {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(hosted_error(status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosted_error_keeps_service_code() {
        let err = hosted_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":"invalid_grant","error_description":"Refresh Token Not Found"}"#,
        );
        assert_eq!(
            err.to_string(),
            "Hosted service error: invalid_grant: Refresh Token Not Found"
        );
    }

    #[test]
    fn test_refresh_rejections_end_the_session() {
        for body in [
            r#"{"code":400,"error_code":"refresh_token_not_found","msg":"Invalid Refresh Token: Refresh Token Not Found"}"#,
            r#"{"code":400,"error_code":"refresh_token_already_used","msg":"Invalid Refresh Token: Already Used"}"#,
            r#"{"code":403,"error_code":"session_not_found","msg":"Session from session_id claim in JWT does not exist"}"#,
            r#"{"error":"invalid_grant","error_description":"Refresh Token Not Found"}"#,
        ] {
            let err = grant_error("refresh_token", reqwest::StatusCode::BAD_REQUEST, body);
            assert!(matches!(err, AppError::SessionExpired(_)), "{}", body);
        }

        let err = grant_error("refresh_token", reqwest::StatusCode::FORBIDDEN, "");
        assert!(matches!(err, AppError::SessionExpired(_)));
    }

    #[test]
    fn test_refresh_outage_keeps_the_session() {
        for status in [
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            reqwest::StatusCode::BAD_GATEWAY,
        ] {
            let err = grant_error("refresh_token", status, r#"{"msg":"try later"}"#);
            assert!(matches!(err, AppError::Hosted(_)), "{}", status);
        }
    }

    #[test]
    fn test_password_rejection_is_invalid_credentials() {
        let err = grant_error(
            "password",
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        );
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn test_hosted_error_without_json_body() {
        let err = hosted_error(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(err.to_string().contains("upstream down"));
    }

    #[test]
    fn test_already_registered_detection() {
        assert!(is_already_registered(r#"{"code":422,"msg":"User already registered"}"#));
        assert!(is_already_registered(r#"{"error_code":"user_already_exists"}"#));
        assert!(!is_already_registered(r#"{"msg":"Password should be at least 6 characters"}"#));
    }

    #[test]
    fn test_token_response_without_expires_at() {
        let token: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 60,
            "user": {"id": "u1"}
        }))
        .unwrap();
        let before = Utc::now().timestamp();
        let session: Session = token.into();
        assert!(session.expires_at >= before + 60);
        assert_eq!(session.token_type, "bearer");
    }
}
