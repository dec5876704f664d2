// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process hosted auth API.
//!
//! Issues real HS256 access tokens and rotating refresh tokens so the session
//! client's expiry and refresh logic runs unchanged against it. Used for local
//! development without a hosted project and throughout the tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;

use super::auth_api::{AuthApi, SignUpOutcome};
use super::token::{self, AccessClaims};
use crate::error::{AppError, Result};
use crate::models::{Session, SessionUser};

const DEFAULT_TTL_SECS: i64 = 3600;

struct Account {
    user: SessionUser,
    password: String,
}

/// In-memory auth service.
pub struct MemoryAuthApi {
    secret: Vec<u8>,
    token_ttl_secs: i64,
    autoconfirm: bool,
    /// Accounts keyed by lowercase email
    accounts: DashMap<String, Account>,
    /// Live refresh tokens -> user ID
    refresh_tokens: DashMap<String, String>,
    /// Revoked session IDs
    revoked_sessions: DashMap<String, ()>,
    offline: AtomicBool,
    sign_in_calls: AtomicUsize,
}

impl Default for MemoryAuthApi {
    fn default() -> Self {
        Self::new(b"memory-auth-secret".to_vec())
    }
}

impl MemoryAuthApi {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_ttl_secs: DEFAULT_TTL_SECS,
            autoconfirm: true,
            accounts: DashMap::new(),
            refresh_tokens: DashMap::new(),
            revoked_sessions: DashMap::new(),
            offline: AtomicBool::new(false),
            sign_in_calls: AtomicUsize::new(0),
        }
    }

    /// Lifetime of issued access tokens.
    pub fn with_token_ttl(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    /// When false, sign-up creates the user but issues no session
    /// (email-confirmation projects).
    pub fn with_autoconfirm(mut self, autoconfirm: bool) -> Self {
        self.autoconfirm = autoconfirm;
        self
    }

    /// Simulate the service being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of password sign-ins attempted.
    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    /// Register an account directly (seeding).
    pub fn create_user(&self, email: &str, password: &str, metadata: Value) -> SessionUser {
        let user = SessionUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            user_metadata: metadata,
        };
        self.accounts.insert(
            email.to_ascii_lowercase(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    /// Issue a session for `user` directly (seeding).
    pub fn issue_session(&self, user: &SessionUser) -> Result<Session> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            exp: now + self.token_ttl_secs,
            iat: now,
            session_id: Some(uuid::Uuid::new_v4().to_string()),
        };
        let access_token = token::issue(&claims, &self.secret)?;
        let refresh_token = uuid::Uuid::new_v4().simple().to_string();
        self.refresh_tokens
            .insert(refresh_token.clone(), user.id.clone());

        Ok(Session {
            access_token,
            refresh_token,
            expires_at: claims.exp,
            token_type: "bearer".to_string(),
            user: user.clone(),
        })
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Network("hosted auth unreachable".to_string()));
        }
        Ok(())
    }

    fn user_by_id(&self, user_id: &str) -> Option<SessionUser> {
        self.accounts
            .iter()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
    }
}

#[async_trait]
impl AuthApi for MemoryAuthApi {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;

        let user = match self.accounts.get(&email.to_ascii_lowercase()) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(AppError::InvalidCredentials),
        };
        self.issue_session(&user)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<SignUpOutcome> {
        self.check_online()?;

        if self.accounts.contains_key(&email.to_ascii_lowercase()) {
            return Err(AppError::EmailTaken);
        }
        let user = self.create_user(email, password, metadata);
        let session = if self.autoconfirm {
            Some(self.issue_session(&user)?)
        } else {
            None
        };
        Ok(SignUpOutcome { user, session })
    }

    async fn get_user(&self, access_token: &str) -> Result<SessionUser> {
        self.check_online()?;

        let claims = token::verify(access_token, &self.secret)?;
        if let Some(sid) = &claims.session_id {
            if self.revoked_sessions.contains_key(sid) {
                return Err(AppError::NotAuthenticated);
            }
        }
        self.user_by_id(&claims.sub)
            .ok_or(AppError::NotAuthenticated)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        self.check_online()?;

        // Rotation: a refresh token is good for exactly one exchange.
        let (_, user_id) = self
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| AppError::SessionExpired("Refresh Token Not Found".to_string()))?;
        let user = self
            .user_by_id(&user_id)
            .ok_or(AppError::NotAuthenticated)?;
        self.issue_session(&user)
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        self.check_online()?;

        let claims = token::decode_unverified(access_token)?;
        if let Some(sid) = claims.session_id {
            self.revoked_sessions.insert(sid, ());
        }
        self.refresh_tokens.retain(|_, uid| *uid != claims.sub);
        Ok(())
    }
}
