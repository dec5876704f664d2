// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! The same enum is used on both sides of the wire: the backend renders it as
//! a `{error, code}` JSON body, and the client rebuilds `AppError::Backend`
//! from that body so callers see the server's message verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Input rejected before any network call.
    #[error("{0}")]
    Validation(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    /// The hosted service no longer honours the session's refresh token.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Error reported by the registration/login backend.
    #[error("{message}")]
    Backend { message: String, code: String },

    /// Error reported by the hosted auth/database service.
    #[error("Hosted service error: {0}")]
    Hosted(String),

    /// Transport failure: the remote end could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable code sent alongside the message.
    pub fn code(&self) -> &str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotAuthenticated => "NOT_AUTHENTICATED",
            AppError::SessionExpired(_) => "SESSION_EXPIRED",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::EmailTaken => "EMAIL_TAKEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Backend { code, .. } => code,
            AppError::Hosted(_) => "HOSTED_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the failure came from not reaching the remote end at all.
    ///
    /// The auth store treats these as transient and never logs the user out
    /// because of them.
    pub fn is_network_error(&self) -> bool {
        match self {
            AppError::Network(_) => true,
            AppError::Backend { code, .. } => code == "NETWORK_ERROR",
            _ => false,
        }
    }

    /// Convert a `reqwest` transport error.
    pub fn network(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let message = fields
            .first()
            .and_then(|(field, errs)| {
                errs.first().map(|e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .unwrap_or_else(|| "Invalid input".to_string());

        AppError::Validation(message)
    }
}

/// JSON error response body (`{error, code}`).
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotAuthenticated
            | AppError::SessionExpired(_)
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Backend { .. } | AppError::Hosted(_) | AppError::Network(_) => {
                tracing::warn!(error = %self, "Upstream error");
                StatusCode::BAD_GATEWAY
            }
            AppError::Storage(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Internal details stay in the log.
        let error = match &self {
            AppError::Storage(_) | AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error,
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
