// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client auth state: who is logged in.
//!
//! Three sources are reconciled here: the profile cached in local storage
//! (loaded optimistically at construction), the hosted auth session, and the
//! profile row in the hosted database. Network failures never log the user
//! out; only an explicit sign-out, a `SignedOut` event, or a failed login
//! clears the user.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use validator::Validate;

use super::backend::BackendApi;
use super::hosted_auth::HostedAuth;
use crate::db::ProfileRepository;
use crate::error::{AppError, Result};
use crate::models::{
    AuthChangeEvent, LoginRequest, ProfileUpdate, RegisterRequest, Session, SessionUser,
    UserProfile,
};
use crate::storage::{purge_session_artifacts, KeyValueStore, ProfileCache};
use crate::time_utils::now_rfc3339;

const NOTICE_CHANNEL_CAPACITY: usize = 32;

/// Collaborators of the auth store.
#[derive(Clone)]
pub struct AuthDeps {
    pub backend: Arc<dyn BackendApi>,
    pub hosted: Arc<dyn HostedAuth>,
    pub profiles: ProfileRepository,
    /// Durable storage (profile cache, persisted hosted session)
    pub local: Arc<dyn KeyValueStore>,
    /// Tab-scoped storage
    pub session: Arc<dyn KeyValueStore>,
}

/// Observable auth state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<UserProfile>,
    pub is_loading: bool,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient user-facing notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

type LoginFuture = Shared<BoxFuture<'static, bool>>;

struct Inner {
    deps: AuthDeps,
    cache: ProfileCache,
    state: watch::Sender<AuthState>,
    notices: broadcast::Sender<Notice>,
    /// Login currently in flight; concurrent callers await the same one.
    login_inflight: Mutex<Option<LoginFuture>>,
    /// Listener and background refresh tasks.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Bumped on logout and on hosted sign-out. Work started under an older
    /// epoch must not apply its result.
    epoch: AtomicU64,
}

/// Auth state store.
///
/// Cheap to clone; all clones share the same state. Must be created inside
/// a Tokio runtime (it spawns its session listener immediately).
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<Inner>,
}

impl AuthStore {
    /// Create the store, restoring any cached profile immediately and
    /// subscribing to hosted session changes.
    ///
    /// The state stays `is_loading` until [`AuthStore::initialize`] has
    /// checked the hosted session.
    pub fn new(deps: AuthDeps) -> Self {
        let cache = ProfileCache::new(deps.local.clone());
        let cached = cache.load();
        if let Some(user) = &cached {
            tracing::debug!(user_id = %user.id, "Restored cached profile");
        }

        let (state, _) = watch::channel(AuthState {
            user: cached,
            is_loading: true,
        });
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);

        let inner = Arc::new(Inner {
            deps,
            cache,
            state,
            notices,
            login_inflight: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            epoch: AtomicU64::new(0),
        });
        Inner::spawn_listener(&inner);

        Self { inner }
    }

    /// Reconcile against the hosted session, then clear the loading flag.
    pub async fn initialize(&self) {
        if let Err(e) = self.inner.reconcile().await {
            tracing::warn!(error = %e, "Initial session check failed, keeping cached user");
        }
        self.inner.state.send_modify(|s| s.is_loading = false);
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// Receiver for user-facing notices.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Re-derive the user from the hosted session.
    ///
    /// If there is no session, or it cannot be checked, and no user is in
    /// memory, the cached profile is restored instead. Never clears the user.
    pub async fn refresh_user(&self) -> Option<UserProfile> {
        match self.inner.reconcile().await {
            Ok(Some(profile)) => return Some(profile),
            Ok(None) => tracing::debug!("No hosted session during refresh"),
            Err(e) => tracing::warn!(error = %e, "Session check failed during refresh"),
        }

        if self.current_user().is_none() {
            if let Some(cached) = self.inner.cache.load() {
                tracing::info!(user_id = %cached.id, "Restoring user from cache");
                let epoch = self.inner.epoch();
                self.inner.apply_profile(cached, epoch);
            }
        }
        self.current_user()
    }

    /// Log in through the backend.
    ///
    /// Returns whether the login succeeded; failures are reported as
    /// notices. A call made while another login is pending resolves to that
    /// login's result without sending a second request.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        let login = {
            let mut slot = self.inner.lock_inflight();
            match slot.as_ref() {
                Some(pending) => {
                    tracing::debug!("Joining login already in flight");
                    pending.clone()
                }
                None => {
                    let inner = self.inner.clone();
                    let request = LoginRequest::new(email, password);
                    let login = async move { inner.run_login(request).await }
                        .boxed()
                        .shared();
                    *slot = Some(login.clone());
                    login
                }
            }
        };

        let ok = login.clone().await;

        let mut slot = self.inner.lock_inflight();
        if slot.as_ref().is_some_and(|pending| pending.ptr_eq(&login)) {
            *slot = None;
        }
        ok
    }

    /// Register through the backend.
    ///
    /// On failure the existing state is left untouched and the error is
    /// returned (and posted as a notice).
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile> {
        let request = request.normalized();
        if let Err(errors) = request.validate() {
            let err = AppError::from(errors);
            self.inner.notify(NoticeLevel::Error, err.to_string());
            return Err(err);
        }

        let epoch = self.inner.epoch();
        let response = match self.inner.deps.backend.register(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, code = e.code(), "Registration failed");
                self.inner.notify(NoticeLevel::Error, e.to_string());
                return Err(e);
            }
        };

        match &response.session {
            Some(session) => {
                if !self.inner.adopt_session(session, epoch).await {
                    return Err(AppError::NotAuthenticated);
                }
            }
            None => tracing::info!(user_id = %response.user.id, "Registered without a session"),
        }

        let user = response.user;
        if !self.inner.apply_profile(user.clone(), epoch) {
            return Err(AppError::NotAuthenticated);
        }
        self.inner.notify(
            NoticeLevel::Success,
            format!("Welcome to the feed, {}!", user.name),
        );
        tracing::info!(user_id = %user.id, "Registered");
        Ok(user)
    }

    /// Update the signed-in user's profile.
    ///
    /// Only the fields set in `update` are sent, keyed by the current user.
    /// The in-memory and cached profile are replaced by the row the database
    /// returns.
    pub async fn update_user(&self, mut update: ProfileUpdate) -> Result<UserProfile> {
        let Some(current) = self.current_user() else {
            return Err(AppError::NotAuthenticated);
        };
        if update.is_empty() {
            return Err(AppError::Validation("Nothing to update".to_string()));
        }
        update.updated_at = Some(now_rfc3339());

        let epoch = self.inner.epoch();
        let profile = match self.inner.deps.profiles.update(&current.id, &update).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(user_id = %current.id, error = %e, "Profile update failed");
                self.inner.notify(NoticeLevel::Error, e.to_string());
                return Err(e);
            }
        };

        if !self.inner.apply_profile(profile.clone(), epoch) {
            tracing::info!(user_id = %current.id, "Logged out during profile update");
            return Err(AppError::NotAuthenticated);
        }
        self.inner
            .notify(NoticeLevel::Success, "Profile updated".to_string());
        Ok(profile)
    }

    /// Log out.
    ///
    /// The hosted sign-out is best-effort. Afterwards no profile or session
    /// artifact remains in either store, pending work is cancelled, and a
    /// fresh session listener is running.
    pub async fn logout(&self) {
        let user_id = self.current_user().map(|u| u.id);

        if let Err(e) = self.inner.deps.hosted.sign_out().await {
            tracing::warn!(error = %e, "Hosted sign-out failed, clearing locally anyway");
        }

        self.inner.teardown();

        self.inner.clear_user();
        self.inner.state.send_modify(|s| s.is_loading = false);
        let purged = self.inner.purge_stores();
        Inner::spawn_listener(&self.inner);

        tracing::info!(user_id = ?user_id, purged, "Logged out");
        self.inner
            .notify(NoticeLevel::Success, "Signed out".to_string());
    }

    /// Cancel the session listener and any background work.
    ///
    /// Used at shutdown; the store stops following hosted session changes.
    pub fn teardown(&self) {
        self.inner.teardown();
    }
}

impl Inner {
    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn lock_inflight(&self) -> std::sync::MutexGuard<'_, Option<LoginFuture>> {
        self.login_inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    fn teardown(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.lock_inflight() = None;
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        for task in tasks {
            task.abort();
        }
    }

    fn notify(&self, level: NoticeLevel, message: String) {
        // Nobody listening is fine.
        let _ = self.notices.send(Notice { level, message });
    }

    /// Cache and publish `profile`, unless a logout happened since `epoch`.
    ///
    /// The cache is written while the state lock is held so the cached and
    /// in-memory profile never diverge.
    fn apply_profile(&self, profile: UserProfile, epoch: u64) -> bool {
        self.state.send_if_modified(|s| {
            if self.epoch() != epoch {
                tracing::debug!(user_id = %profile.id, "Dropping profile from before logout");
                return false;
            }
            if let Err(e) = self.cache.save(&profile) {
                tracing::warn!(user_id = %profile.id, error = %e, "Failed to cache profile");
            }
            s.user = Some(profile);
            true
        })
    }

    fn clear_user(&self) {
        self.state.send_modify(|s| {
            if let Err(e) = self.cache.clear() {
                tracing::warn!(error = %e, "Failed to clear cached profile");
            }
            s.user = None;
        });
    }

    /// Install a backend-issued token pair. Best-effort.
    async fn install_session(&self, session: &Session) {
        if let Err(e) = self
            .deps
            .hosted
            .set_session(&session.access_token, &session.refresh_token)
            .await
        {
            tracing::warn!(user_id = %session.user.id, error = %e, "Failed to install hosted session");
        }
    }

    /// Install a backend-issued session unless a logout happened since
    /// `epoch`.
    ///
    /// Returns false when the logout won. A session that landed after the
    /// logout is signed out again so nothing of it stays behind.
    async fn adopt_session(&self, session: &Session, epoch: u64) -> bool {
        if self.epoch() != epoch {
            return false;
        }
        self.install_session(session).await;
        if self.epoch() == epoch {
            return true;
        }

        tracing::info!(user_id = %session.user.id, "Logged out while installing session, discarding it");
        if let Err(e) = self.deps.hosted.sign_out().await {
            tracing::warn!(error = %e, "Hosted sign-out of discarded session failed");
        }
        self.purge_stores();
        false
    }

    /// Remove hosted session artifacts from both stores.
    fn purge_stores(&self) -> usize {
        purge_session_artifacts(self.deps.local.as_ref())
            + purge_session_artifacts(self.deps.session.as_ref())
    }

    /// Authoritative profile for a hosted user, created on first login.
    async fn load_or_create_profile(&self, user: &SessionUser) -> Result<UserProfile> {
        if let Some(profile) = self.deps.profiles.fetch(&user.id).await? {
            return Ok(profile);
        }
        tracing::info!(user_id = %user.id, "No profile row yet, creating one");
        let profile = UserProfile::from_session_user(user, &now_rfc3339());
        self.deps.profiles.create(&profile).await
    }

    /// Sync the user from the hosted session.
    ///
    /// `Ok(None)` means there is no hosted session (or it ended meanwhile);
    /// the current user is kept.
    async fn reconcile(&self) -> Result<Option<UserProfile>> {
        let epoch = self.epoch();
        let Some(session) = self.deps.hosted.get_session().await? else {
            return Ok(None);
        };
        let profile = self.load_or_create_profile(&session.user).await?;
        if !self.apply_profile(profile.clone(), epoch) {
            // Signed out while the profile was loading.
            return Ok(None);
        }
        Ok(Some(profile))
    }

    async fn sync_from_session(&self, session: &Session) {
        let epoch = self.epoch();
        match self.load_or_create_profile(&session.user).await {
            Ok(profile) => {
                self.apply_profile(profile, epoch);
            }
            Err(e) => {
                tracing::warn!(user_id = %session.user.id, error = %e, "Profile sync failed, keeping current user");
            }
        }
    }

    async fn handle_event(&self, event: AuthChangeEvent) {
        match event {
            AuthChangeEvent::SignedIn(session) | AuthChangeEvent::TokenRefreshed(session) => {
                self.sync_from_session(&session).await;
            }
            AuthChangeEvent::SignedOut => {
                tracing::info!("Hosted session ended, clearing user");
                self.epoch.fetch_add(1, Ordering::SeqCst);
                self.clear_user();
            }
        }
    }

    async fn run_login(self: Arc<Self>, request: LoginRequest) -> bool {
        if let Err(errors) = request.validate() {
            self.notify(NoticeLevel::Error, AppError::from(errors).to_string());
            return false;
        }

        let epoch = self.epoch();
        let response = match self.deps.backend.login(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, code = e.code(), "Login failed");
                self.clear_user();
                self.notify(NoticeLevel::Error, e.to_string());
                return false;
            }
        };

        if self.epoch() != epoch {
            tracing::info!(user_id = %response.user.id, "Logged out while login was pending, discarding result");
            return false;
        }
        if let Some(session) = &response.session {
            if !self.adopt_session(session, epoch).await {
                return false;
            }
        }

        let user = response.user;
        if !self.apply_profile(user.clone(), epoch) {
            return false;
        }
        tracing::info!(user_id = %user.id, "Logged in");
        self.notify(
            NoticeLevel::Success,
            format!("Welcome back, {}!", user.name),
        );

        Inner::spawn_background_refresh(&self);
        true
    }

    /// Refresh the profile from the hosted session once login settles.
    fn spawn_background_refresh(inner: &Arc<Self>) {
        let weak = Arc::downgrade(inner);
        let handle = tokio::spawn(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(e) = inner.reconcile().await {
                tracing::warn!(error = %e, "Background profile refresh failed");
            }
        });
        inner.track(handle);
    }

    fn spawn_listener(inner: &Arc<Self>) {
        let mut events = inner.deps.hosted.subscribe();
        let weak: Weak<Self> = Arc::downgrade(inner);

        let handle = tokio::spawn(async move {
            loop {
                let event = events.recv().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                match event {
                    Ok(event) => inner.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed session events, resyncing");
                        if let Err(e) = inner.reconcile().await {
                            tracing::warn!(error = %e, "Resync after missed events failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        inner.track(handle);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().unwrap_or_else(|e| e.into_inner()).drain(..) {
            task.abort();
        }
    }
}
