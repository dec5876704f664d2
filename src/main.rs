// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shopfeed API Server
//!
//! Registration/login in front of the hosted auth service, plus the mock
//! image search endpoints.

use shopfeed::{
    config::Config,
    db::{ProfileRepository, RestDb},
    services::{GoTrueClient, MockSearchService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Shopfeed API");

    let auth_api = Arc::new(GoTrueClient::new(
        &config.supabase_url,
        &config.supabase_anon_key,
    ));

    // Profile rows are written on behalf of users who may not have a
    // session yet, so prefer the service-role key.
    let db_key = match &config.supabase_service_key {
        Some(key) => key.as_str(),
        None => {
            tracing::warn!("SUPABASE_SERVICE_ROLE_KEY not set, using anon key for profile writes");
            config.supabase_anon_key.as_str()
        }
    };
    let db = Arc::new(RestDb::new(&config.supabase_url, db_key));
    tracing::info!(url = %config.supabase_url, "Hosted service client initialized");

    let search = Arc::new(MockSearchService::new(config.search_delay));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        auth_api,
        profiles: ProfileRepository::new(db),
        search,
    });

    // Build router
    let app = shopfeed::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shopfeed=debug,info")),
        )
        .with(format)
        .init();
}
