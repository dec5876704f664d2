// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image search routes.

use axum::{extract::DefaultBodyLimit, extract::State, routing::post, Json, Router};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::SearchResponse;
use crate::services::search::{SearchQuery, MAX_IMAGE_BYTES};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/image-search", post(search_by_image))
        .route("/api/image-search/url", post(search_by_url))
        // Base64 inflates the image by a third.
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES * 4 / 3 + 4096))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageSearchBody {
    /// Base64 image, optionally as a `data:` URL
    image: String,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UrlSearchBody {
    image_url: String,
}

/// Split an optional `data:<type>;base64,` prefix off the payload.
fn split_data_url(image: &str) -> (Option<&str>, &str) {
    if let Some(rest) = image.strip_prefix("data:") {
        if let Some((meta, data)) = rest.split_once(',') {
            let content_type = meta.strip_suffix(";base64").unwrap_or(meta);
            return (Some(content_type).filter(|c| !c.is_empty()), data);
        }
    }
    (None, image)
}

async fn search_by_image(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ImageSearchBody>,
) -> Result<Json<SearchResponse>> {
    let (embedded_type, data) = split_data_url(body.image.trim());
    let bytes = BASE64
        .decode(data)
        .map_err(|_| AppError::Validation("Image must be base64 encoded".to_string()))?;

    let query = SearchQuery::Image {
        bytes,
        content_type: body.content_type.or(embedded_type.map(str::to_string)),
    };
    Ok(Json(state.search.search(&query).await?))
}

async fn search_by_url(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UrlSearchBody>,
) -> Result<Json<SearchResponse>> {
    let query = SearchQuery::Url(body.image_url.trim().to_string());
    Ok(Json(state.search.search(&query).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_data_url() {
        assert_eq!(
            split_data_url("data:image/png;base64,AAAA"),
            (Some("image/png"), "AAAA")
        );
        assert_eq!(split_data_url("AAAA"), (None, "AAAA"));
        assert_eq!(split_data_url("data:;base64,AAAA"), (None, "AAAA"));
    }
}
