// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use shopfeed::app::{ClientApp, ClientParts};
use shopfeed::config::Config;
use shopfeed::db::{collections, HostedDb, MemoryDb, ProfileRepository};
use shopfeed::error::{AppError, Result};
use shopfeed::models::{
    AuthResponse, Gender, LoginRequest, RegisterRequest, Session, UserProfile,
};
use shopfeed::routes::create_router;
use shopfeed::services::{
    AuthState, BackendApi, HostedSession, MemoryAuthApi, MockSearchService,
};
use shopfeed::storage::MemoryStore;
use shopfeed::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Project reference used for hosted session keys in tests.
#[allow(dead_code)]
pub const PROJECT_REF: &str = "testproj";

/// Canned backend answer.
#[derive(Clone)]
#[allow(dead_code)]
pub enum Reply {
    Ok(AuthResponse),
    Fail { message: String, code: String },
    Offline,
}

impl Reply {
    fn to_result(&self) -> Result<AuthResponse> {
        match self {
            Reply::Ok(response) => Ok(response.clone()),
            Reply::Fail { message, code } => Err(AppError::Backend {
                message: message.clone(),
                code: code.clone(),
            }),
            Reply::Offline => Err(AppError::Backend {
                message: "Unable to reach the server".to_string(),
                code: "NETWORK_ERROR".to_string(),
            }),
        }
    }
}

/// Backend stub that counts requests and answers after a delay.
pub struct StubBackend {
    delay: Duration,
    login_reply: Mutex<Reply>,
    register_reply: Mutex<Reply>,
    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubBackend {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            login_reply: Mutex::new(Reply::Offline),
            register_reply: Mutex::new(Reply::Offline),
            login_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn on_login(&self, reply: Reply) {
        *self.login_reply.lock().unwrap() = reply;
    }

    pub fn on_register(&self, reply: Reply) {
        *self.register_reply.lock().unwrap() = reply;
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendApi for StubBackend {
    async fn register(&self, _request: &RegisterRequest) -> Result<AuthResponse> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.register_reply.lock().unwrap().clone();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        reply.to_result()
    }

    async fn login(&self, _request: &LoginRequest) -> Result<AuthResponse> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.login_reply.lock().unwrap().clone();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        reply.to_result()
    }
}

/// A profile as the backend would return it.
#[allow(dead_code)]
pub fn profile(id: &str, name: &str, email: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        gender: Gender::Male,
        is_influencer: false,
        avatar_url: None,
        body_type: None,
        style_preference: None,
        season_preference: None,
        bio: None,
        category: None,
        created_at: "2026-01-01T00:00:00.000Z".to_string(),
        updated_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

/// Insert a profile row.
#[allow(dead_code)]
pub async fn seed_profile(db: &MemoryDb, profile: &UserProfile) {
    db.insert(collections::USERS, serde_json::to_value(profile).unwrap())
        .await
        .unwrap();
}

/// Client wired against in-process collaborators.
#[allow(dead_code)]
pub struct Harness {
    pub api: Arc<MemoryAuthApi>,
    pub hosted: Arc<HostedSession>,
    pub db: Arc<MemoryDb>,
    pub backend: Arc<StubBackend>,
    pub local: Arc<MemoryStore>,
    pub session: Arc<MemoryStore>,
    pub app: ClientApp,
}

/// Build a client over fresh in-memory services.
#[allow(dead_code)]
pub fn harness(backend: StubBackend) -> Harness {
    harness_with(
        Arc::new(MemoryAuthApi::default()),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryDb::new()),
        backend,
    )
}

/// Build a client over the given auth service, local storage and database.
#[allow(dead_code)]
pub fn harness_with(
    api: Arc<MemoryAuthApi>,
    local: Arc<MemoryStore>,
    db: Arc<MemoryDb>,
    backend: StubBackend,
) -> Harness {
    let session = Arc::new(MemoryStore::new());
    let hosted = Arc::new(HostedSession::new(api.clone(), local.clone(), PROJECT_REF));
    let backend = Arc::new(backend);

    let parts = ClientParts {
        local: local.clone(),
        session: session.clone(),
        hosted: hosted.clone(),
        db: db.clone(),
        backend: backend.clone(),
        search: Arc::new(MockSearchService::new(Duration::ZERO)),
    };
    let app = ClientApp::from_parts(Config::test_default(), parts);

    Harness {
        api,
        hosted,
        db,
        backend,
        local,
        session,
        app,
    }
}

/// Wait until the auth state satisfies `pred`, failing after two seconds.
#[allow(dead_code)]
pub async fn wait_for_state(
    mut rx: watch::Receiver<AuthState>,
    pred: impl FnMut(&AuthState) -> bool,
) -> AuthState {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
        .await
        .expect("timed out waiting for auth state")
        .expect("auth state channel closed")
        .clone()
}

/// Session issued by `api` for a fresh account.
#[allow(dead_code)]
pub fn hosted_account(api: &MemoryAuthApi, email: &str, password: &str) -> Session {
    let user = api.create_user(email, password, serde_json::json!({ "name": "A" }));
    api.issue_session(&user).unwrap()
}

/// Backend state over in-memory services.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryAuthApi>, Arc<MemoryDb>) {
    let api = Arc::new(MemoryAuthApi::default());
    let db = Arc::new(MemoryDb::new());
    let state = Arc::new(AppState {
        config: Config::test_default(),
        auth_api: api.clone(),
        profiles: ProfileRepository::new(db.clone()),
        search: Arc::new(MockSearchService::new(Duration::ZERO)),
    });
    (create_router(state.clone()), state, api, db)
}
