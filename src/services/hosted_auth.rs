// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side hosted auth session.
//!
//! Holds the current session, persists it to local storage under
//! `sb-<project>-auth-token`, refreshes it before expiry and broadcasts
//! session-change events to subscribers (the auth store).

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};

use super::auth_api::{AuthApi, SignUpOutcome};
use super::token;
use crate::error::{AppError, Result};
use crate::models::{AuthChangeEvent, Session};
use crate::storage::{keys, KeyValueStore};

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session-level view of the hosted auth service.
#[async_trait]
pub trait HostedAuth: Send + Sync {
    /// Current session, refreshed if it is about to expire.
    ///
    /// `Ok(None)` means signed out. `Err` means the service could not be
    /// asked; callers decide whether that matters.
    async fn get_session(&self) -> Result<Option<Session>>;

    /// Install a token pair obtained elsewhere (e.g. from the backend).
    async fn set_session(&self, access_token: &str, refresh_token: &str) -> Result<Session>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_up(&self, email: &str, password: &str, metadata: Value)
        -> Result<SignUpOutcome>;

    /// Drop the local session and revoke it remotely.
    ///
    /// Local state is cleared even when the remote call fails.
    async fn sign_out(&self) -> Result<()>;

    /// Subscribe to session-change events.
    fn subscribe(&self) -> broadcast::Receiver<AuthChangeEvent>;

    /// Access token of the current session, without refreshing.
    fn access_token(&self) -> Option<String>;
}

/// Hosted session client.
///
/// This service encapsulates:
/// - Session restore from local storage at construction
/// - Automatic refresh when expiring (with 5-minute margin)
/// - A refresh lock so concurrent callers trigger a single refresh
/// - Session-change broadcast
pub struct HostedSession {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn KeyValueStore>,
    storage_key: String,
    current: RwLock<Option<Session>>,
    refresh_lock: Mutex<()>,
    events: broadcast::Sender<AuthChangeEvent>,
}

impl HostedSession {
    /// Create a session client for `project_ref`, restoring any persisted
    /// session from `storage`.
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn KeyValueStore>, project_ref: &str) -> Self {
        let storage_key = format!("{}{}-auth-token", keys::HOSTED_SESSION_PREFIX, project_ref);

        let restored = storage.get(&storage_key).and_then(|raw| {
            serde_json::from_str::<Session>(&raw)
                .map_err(|e| tracing::warn!(error = %e, "Ignoring unparseable persisted session"))
                .ok()
        });
        if let Some(session) = &restored {
            tracing::debug!(user_id = %session.user.id, "Restored persisted hosted session");
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            api,
            storage,
            storage_key,
            current: RwLock::new(restored),
            refresh_lock: Mutex::new(()),
            events,
        }
    }

    /// Local storage key holding the persisted session.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the in-memory and persisted session.
    fn install(&self, session: Option<Session>) {
        let persisted = match &session {
            Some(s) => serde_json::to_string(s)
                .map_err(|e| AppError::Storage(e.to_string()))
                .and_then(|json| self.storage.set(&self.storage_key, &json)),
            None => self.storage.remove(&self.storage_key),
        };
        if let Err(e) = persisted {
            tracing::warn!(error = %e, "Failed to persist hosted session");
        }

        *self.current.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    fn emit(&self, event: AuthChangeEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl HostedAuth for HostedSession {
    async fn get_session(&self) -> Result<Option<Session>> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        // Fast path: no session, or one that is still good.
        let Some(session) = self.current() else {
            return Ok(None);
        };
        if !session.is_expiring(Utc::now(), margin) {
            return Ok(Some(session));
        }

        let _guard = self.refresh_lock.lock().await;

        // Re-check after acquiring the lock: another task may have refreshed
        // (or signed out) while we waited.
        let Some(session) = self.current() else {
            return Ok(None);
        };
        if !session.is_expiring(Utc::now(), margin) {
            return Ok(Some(session));
        }

        tracing::info!(user_id = %session.user.id, "Hosted session expiring, refreshing");

        match self.api.refresh(&session.refresh_token).await {
            Ok(refreshed) => {
                self.install(Some(refreshed.clone()));
                self.emit(AuthChangeEvent::TokenRefreshed(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(AppError::SessionExpired(reason)) => {
                tracing::info!(user_id = %session.user.id, reason = %reason, "Refresh token rejected, session ended");
                self.install(None);
                self.emit(AuthChangeEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn set_session(&self, access_token: &str, refresh_token: &str) -> Result<Session> {
        let claims = token::decode_unverified(access_token)?;
        let user = self.api.get_user(access_token).await?;
        if user.id != claims.sub {
            return Err(AppError::Hosted(
                "access token subject does not match its user".to_string(),
            ));
        }

        let session = Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at: claims.exp,
            token_type: "bearer".to_string(),
            user,
        };

        self.install(Some(session.clone()));
        self.emit(AuthChangeEvent::SignedIn(session.clone()));
        tracing::info!(user_id = %session.user.id, "Hosted session installed");
        Ok(session)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.api.sign_in_with_password(email, password).await?;
        self.install(Some(session.clone()));
        self.emit(AuthChangeEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<SignUpOutcome> {
        let outcome = self.api.sign_up(email, password, metadata).await?;
        if let Some(session) = &outcome.session {
            self.install(Some(session.clone()));
            self.emit(AuthChangeEvent::SignedIn(session.clone()));
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self.current();
        self.install(None);
        self.emit(AuthChangeEvent::SignedOut);

        match previous {
            Some(session) => self.api.sign_out(&session.access_token).await,
            None => Ok(()),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChangeEvent> {
        self.events.subscribe()
    }

    fn access_token(&self) -> Option<String> {
        self.current().map(|s| s.access_token)
    }
}
