// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The same configuration feeds both the client composition root
//! ([`crate::app::ClientApp`]) and the backend server binary.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Hosted auth/database service ---
    /// Base URL of the hosted service (e.g. `https://abcd.supabase.co`)
    pub supabase_url: String,
    /// Public (anon) API key
    pub supabase_anon_key: String,
    /// Service-role key, used by the backend when present
    pub supabase_service_key: Option<String>,

    // --- Backend ---
    /// Base URL of the registration/login backend
    pub backend_url: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Client ---
    /// File backing local persistent storage
    pub storage_path: PathBuf,
    /// Artificial latency of the mock image search
    pub search_delay: Duration,
}

impl Config {
    /// Config for tests: no network endpoints are reachable, no delay.
    pub fn test_default() -> Self {
        Self {
            supabase_url: "http://127.0.0.1:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            supabase_service_key: None,
            backend_url: "http://127.0.0.1:3001".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 3001,
            storage_path: PathBuf::from("target/test_local_storage.json"),
            search_delay: Duration::ZERO,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let search_delay_ms = env::var("SEARCH_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1500);

        Ok(Self {
            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            backend_url: env::var("BACKEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),
            storage_path: env::var("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".shopfeed/local_storage.json")),
            search_delay: Duration::from_millis(search_delay_ms),
        })
    }

    /// Project reference: the first DNS label of the hosted service URL.
    ///
    /// The hosted session is persisted under `sb-<project_ref>-auth-token`.
    pub fn project_ref(&self) -> String {
        self.supabase_url
            .split("://")
            .nth(1)
            .unwrap_or(&self.supabase_url)
            .split(['.', ':', '/'])
            .next()
            .unwrap_or("local")
            .to_string()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
