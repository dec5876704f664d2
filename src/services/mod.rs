// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth_api;
pub mod auth_store;
pub mod backend;
pub mod feed;
pub mod hosted_auth;
pub mod memory_auth;
pub mod search;
pub mod token;

pub use auth_api::{AuthApi, GoTrueClient, SignUpOutcome};
pub use auth_store::{AuthDeps, AuthState, AuthStore, Notice, NoticeLevel};
pub use backend::{BackendApi, BackendClient};
pub use feed::FeedService;
pub use hosted_auth::{HostedAuth, HostedSession};
pub use memory_auth::MemoryAuthApi;
pub use search::{MockSearchService, SearchProvider, SearchQuery};
