// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted auth session model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserProfile;

/// User record as the hosted auth service reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Free-form metadata captured at sign-up (name, phone, gender)
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl SessionUser {
    /// String value from the sign-up metadata, if present and non-empty.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.user_metadata
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Access/refresh token pair issued by the hosted auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) when the access token expires
    pub expires_at: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: SessionUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Expiry as a UTC timestamp.
    pub fn expires_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default()
    }

    /// True if the access token expires within `margin` of `now`.
    pub fn is_expiring(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at_utc()
    }
}

/// Session-change notification from the hosted auth service.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthChangeEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

/// Body returned by the backend's register and login endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_expiring_at(expires_at: i64) -> Session {
        Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at,
            token_type: "bearer".to_string(),
            user: SessionUser {
                id: "u1".to_string(),
                email: None,
                user_metadata: serde_json::Value::Null,
            },
        }
    }

    #[test]
    fn test_session_expiring_within_margin() {
        let now = Utc::now();
        let session = session_expiring_at((now + Duration::minutes(2)).timestamp());
        assert!(session.is_expiring(now, Duration::minutes(5)));
    }

    #[test]
    fn test_session_not_expiring() {
        let now = Utc::now();
        let session = session_expiring_at((now + Duration::hours(1)).timestamp());
        assert!(!session.is_expiring(now, Duration::minutes(5)));
    }

    #[test]
    fn test_auth_response_without_session() {
        let body = serde_json::json!({
            "user": {"id": "u1", "name": "A", "email": "a@x.com", "gender": "male"}
        });
        let response: AuthResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.user.id, "u1");
        assert!(response.session.is_none());
    }
}
