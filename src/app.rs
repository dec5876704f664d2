// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client composition root.
//!
//! Owns one instance of every client-side service and hands out references;
//! there are no module-level singletons.

use std::sync::Arc;

use crate::config::Config;
use crate::db::{HostedDb, ProfileRepository, RestDb};
use crate::error::Result;
use crate::services::{
    AuthDeps, AuthStore, BackendApi, BackendClient, FeedService, GoTrueClient, HostedAuth,
    HostedSession, MockSearchService, SearchProvider,
};
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

/// External collaborators of the client.
#[derive(Clone)]
pub struct ClientParts {
    pub local: Arc<dyn KeyValueStore>,
    pub session: Arc<dyn KeyValueStore>,
    pub hosted: Arc<dyn HostedAuth>,
    pub db: Arc<dyn HostedDb>,
    pub backend: Arc<dyn BackendApi>,
    pub search: Arc<dyn SearchProvider>,
}

/// The assembled client.
pub struct ClientApp {
    pub config: Config,
    pub parts: ClientParts,
    pub auth: AuthStore,
    pub feed: FeedService,
}

impl ClientApp {
    /// Wire the client against the services named in `config`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn from_config(config: Config) -> Result<Self> {
        let local: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.storage_path)?);
        let session: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let auth_api = Arc::new(GoTrueClient::new(
            &config.supabase_url,
            &config.supabase_anon_key,
        ));
        let hosted: Arc<dyn HostedAuth> = Arc::new(HostedSession::new(
            auth_api,
            local.clone(),
            &config.project_ref(),
        ));
        let db: Arc<dyn HostedDb> = Arc::new(RestDb::with_auth(
            &config.supabase_url,
            &config.supabase_anon_key,
            hosted.clone(),
        ));

        let parts = ClientParts {
            local,
            session,
            hosted,
            db,
            backend: Arc::new(BackendClient::new(&config.backend_url)),
            search: Arc::new(MockSearchService::new(config.search_delay)),
        };
        tracing::info!(
            backend = %config.backend_url,
            storage = %config.storage_path.display(),
            "Client configured"
        );
        Ok(Self::from_parts(config, parts))
    }

    /// Wire the client from explicit collaborators.
    pub fn from_parts(config: Config, parts: ClientParts) -> Self {
        let auth = AuthStore::new(AuthDeps {
            backend: parts.backend.clone(),
            hosted: parts.hosted.clone(),
            profiles: ProfileRepository::new(parts.db.clone()),
            local: parts.local.clone(),
            session: parts.session.clone(),
        });
        let feed = FeedService::new(parts.db.clone(), auth.clone());

        Self {
            config,
            parts,
            auth,
            feed,
        }
    }

    /// Reconcile the auth state against the hosted session.
    pub async fn start(&self) {
        self.auth.initialize().await;
    }

    pub fn search(&self) -> &Arc<dyn SearchProvider> {
        &self.parts.search
    }

    /// Stop background work.
    pub fn shutdown(&self) {
        self.auth.teardown();
    }
}
