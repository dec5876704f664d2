// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image search result shapes (camelCase on the wire).

use serde::{Deserialize, Serialize};

/// Where a search hit comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// A post on this platform
    Internal,
    /// A product on an external shop
    External,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub image: String,
    pub source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Similarity in `[0, 1]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display name of the influencer who posted it (internal hits only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influencer: Option<String>,
}

/// Full search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    /// Milliseconds spent producing the results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<u64>,
}
