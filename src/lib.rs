// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Shopfeed: influencer shopping feed
//!
//! This crate provides the client session layer (auth state, feed data,
//! image search) and the thin registration/login backend it talks to.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::ProfileRepository;
use services::{AuthApi, SearchProvider};

/// Shared backend state.
pub struct AppState {
    pub config: Config,
    /// Hosted auth API (stateless; one call per request)
    pub auth_api: Arc<dyn AuthApi>,
    pub profiles: ProfileRepository,
    pub search: Arc<dyn SearchProvider>,
}
