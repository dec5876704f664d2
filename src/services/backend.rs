// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the registration/login backend.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AppError, ErrorResponse, Result};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest};

/// Registration and login endpoints of the backend.
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse>;
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;
}

/// HTTP implementation of [`BackendApi`].
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<AuthResponse> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Backend unreachable");
                AppError::Backend {
                    message: "Unable to reach the server. Please check your connection.".to_string(),
                    code: "NETWORK_ERROR".to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(backend_error(status, &text));
        }

        response.json().await.map_err(|e| AppError::Backend {
            message: format!("Unexpected response from server: {}", e),
            code: "INVALID_RESPONSE".to_string(),
        })
    }
}

/// Rebuild the server's `{error, code}` body as an error, falling back to
/// the status line when the body is not in that shape.
fn backend_error(status: reqwest::StatusCode, body: &str) -> AppError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => AppError::Backend {
            message: parsed.error,
            code: parsed.code,
        },
        Err(_) => AppError::Backend {
            message: format!("HTTP {}", status.as_u16()),
            code: "HTTP_ERROR".to_string(),
        },
    }
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        self.post("/api/auth/register", request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        self.post("/api/auth/login", request).await
    }
}
