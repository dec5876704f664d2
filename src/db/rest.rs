// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! REST client for the hosted database (`/rest/v1/<table>`).
//!
//! Filters are sent as `column=eq.value`, ordering as `order=column.desc`,
//! and writes ask for `Prefer: return=representation` so the stored rows
//! (including defaults and trigger-set columns) come back in the response.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Filter, HostedDb, Query};
use crate::error::{AppError, Result};
use crate::services::HostedAuth;

/// Hosted database client.
#[derive(Clone)]
pub struct RestDb {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    /// Session source; when signed in, requests carry the user's access token
    /// so row-level security applies to them.
    auth: Option<Arc<dyn HostedAuth>>,
}

impl RestDb {
    /// Client authorized by the API key alone (backend / service role).
    pub fn new(supabase_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            auth: None,
        }
    }

    /// Client that authorizes with the current user session when one exists.
    pub fn with_auth(supabase_url: &str, api_key: &str, auth: Arc<dyn HostedAuth>) -> Self {
        Self {
            auth: Some(auth),
            ..Self::new(supabase_url, api_key)
        }
    }

    /// Token for the `Authorization` header.
    ///
    /// Goes through `get_session` so an expiring session is refreshed before
    /// it is used. If the session cannot be checked, the current token is
    /// sent as is and the database decides.
    async fn bearer(&self) -> String {
        let Some(auth) = &self.auth else {
            return self.api_key.clone();
        };
        match auth.get_session().await {
            Ok(Some(session)) => session.access_token,
            Ok(None) => self.api_key.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "Session check failed, using current token");
                auth.access_token().unwrap_or_else(|| self.api_key.clone())
            }
        }
    }

    async fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer().await)
    }

    fn table_url(&self, table: &str, params: &[(String, String)]) -> String {
        let mut url = format!("{}/{}", self.base_url, table);
        for (i, (key, value)) in params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&urlencoding::encode(key));
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// Check response status and parse the JSON array body.
    async fn check_response_rows(&self, response: reqwest::Response) -> Result<Vec<Value>> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Hosted(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Hosted(format!("JSON parse error: {}", e)))
    }
}

/// `column=eq.value` pairs.
pub(crate) fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| {
            let value = match &f.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (f.column.clone(), format!("eq.{}", value))
        })
        .collect()
}

/// Full parameter list for a select.
pub(crate) fn query_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let dir = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, dir)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

#[async_trait]
impl HostedDb for RestDb {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let url = self.table_url(table, &query_params(query));
        let response = self
            .request(reqwest::Method::GET, &url)
            .await
            .send()
            .await
            .map_err(AppError::network)?;

        self.check_response_rows(response).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value> {
        let url = self.table_url(table, &[]);
        let response = self
            .request(reqwest::Method::POST, &url)
            .await
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(AppError::network)?;

        self.check_response_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Hosted(format!("Insert into {} returned no row", table)))
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>> {
        let url = self.table_url(table, &filter_params(filters));
        let response = self
            .request(reqwest::Method::PATCH, &url)
            .await
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(AppError::network)?;

        self.check_response_rows(response).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize> {
        let url = self.table_url(table, &filter_params(filters));
        let response = self
            .request(reqwest::Method::DELETE, &url)
            .await
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(AppError::network)?;

        Ok(self.check_response_rows(response).await?.len())
    }
}
