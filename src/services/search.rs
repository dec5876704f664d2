// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Image search.
//!
//! There is no vision model behind this: [`MockSearchService`] answers every
//! query with a canned catalogue scored at random, after a fixed delay.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;

use crate::error::{AppError, Result};
use crate::models::{ResultSource, SearchResponse, SearchResult};

/// Largest image accepted (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const MIN_SIMILARITY: f64 = 0.60;
const MAX_SIMILARITY: f64 = 0.99;

/// What to search for.
#[derive(Debug, Clone)]
pub enum SearchQuery {
    /// Uploaded image
    Image {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
    /// Image at a public URL
    Url(String),
}

impl SearchQuery {
    /// Reject queries no search could answer.
    pub fn validate(&self) -> Result<()> {
        match self {
            SearchQuery::Image {
                bytes,
                content_type,
            } => {
                if bytes.is_empty() {
                    return Err(AppError::Validation("No image provided".to_string()));
                }
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(AppError::Validation("Image is too large".to_string()));
                }
                if let Some(ct) = content_type {
                    if !ct.starts_with("image/") {
                        return Err(AppError::Validation(format!(
                            "Unsupported content type: {}",
                            ct
                        )));
                    }
                }
                Ok(())
            }
            SearchQuery::Url(url) => {
                let parsed = reqwest::Url::parse(url.trim())
                    .map_err(|_| AppError::Validation("Invalid image URL".to_string()))?;
                match parsed.scheme() {
                    "http" | "https" => Ok(()),
                    _ => Err(AppError::Validation(
                        "Image URL must be http or https".to_string(),
                    )),
                }
            }
        }
    }
}

/// Visual search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Results ordered by similarity, best first.
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;
}

/// Canned-results search.
#[derive(Debug, Clone)]
pub struct MockSearchService {
    delay: Duration,
    catalogue: Vec<SearchResult>,
}

impl MockSearchService {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            catalogue: default_catalogue(),
        }
    }
}

#[async_trait]
impl SearchProvider for MockSearchService {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        query.validate()?;
        let started = Instant::now();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut rng = rand::rng();
        let mut results: Vec<SearchResult> = self
            .catalogue
            .iter()
            .cloned()
            .map(|mut result| {
                let score: f64 = rng.random_range(MIN_SIMILARITY..=MAX_SIMILARITY);
                result.similarity = Some((score * 100.0).round() / 100.0);
                result
            })
            .collect();
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let kind = match query {
            SearchQuery::Image { .. } => "image",
            SearchQuery::Url(_) => "url",
        };
        tracing::debug!(kind, results = results.len(), "Mock image search");

        Ok(SearchResponse {
            success: true,
            total_results: results.len(),
            results,
            processing_time: Some(started.elapsed().as_millis() as u64),
        })
    }
}

fn item(
    id: &str,
    title: &str,
    price: f64,
    image: &str,
    source: ResultSource,
    url: Option<&str>,
    influencer: Option<&str>,
) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        title: title.to_string(),
        price: Some(price),
        image: image.to_string(),
        source,
        url: url.map(str::to_string),
        similarity: None,
        description: None,
        influencer: influencer.map(str::to_string),
    }
}

fn default_catalogue() -> Vec<SearchResult> {
    use ResultSource::{External, Internal};
    vec![
        item(
            "int-1",
            "Oversized linen shirt",
            59.0,
            "https://images.unsplash.com/photo-1596755094514-f87e34085b2c",
            Internal,
            None,
            Some("Mia Styles"),
        ),
        item(
            "int-2",
            "Pleated midi skirt",
            72.0,
            "https://images.unsplash.com/photo-1583496661160-fb5886a0aaaa",
            Internal,
            None,
            Some("Jordan Lee"),
        ),
        item(
            "int-3",
            "Chunky knit cardigan",
            88.0,
            "https://images.unsplash.com/photo-1434389677669-e08b4cac3105",
            Internal,
            None,
            Some("Ava Chen"),
        ),
        item(
            "ext-1",
            "Relaxed fit linen shirt",
            39.9,
            "https://images.unsplash.com/photo-1602810318383-e386cc2a3ccf",
            External,
            Some("https://shop.example.com/products/linen-shirt"),
            None,
        ),
        item(
            "ext-2",
            "Satin slip skirt",
            45.0,
            "https://images.unsplash.com/photo-1577900232427-18219b9166a0",
            External,
            Some("https://shop.example.com/products/slip-skirt"),
            None,
        ),
        item(
            "ext-3",
            "Leather ankle boots",
            129.0,
            "https://images.unsplash.com/photo-1543163521-1bf539c55dd2",
            External,
            Some("https://shop.example.com/products/ankle-boots"),
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_results_sorted_by_similarity() {
        let service = MockSearchService::new(Duration::ZERO);
        let response = service
            .search(&SearchQuery::Url("https://example.com/a.jpg".to_string()))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.total_results, response.results.len());
        let scores: Vec<f64> = response
            .results
            .iter()
            .map(|r| r.similarity.unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        assert!(scores
            .iter()
            .all(|s| (MIN_SIMILARITY..=MAX_SIMILARITY).contains(s)));
    }

    #[tokio::test]
    async fn test_internal_hits_name_influencer() {
        let service = MockSearchService::new(Duration::ZERO);
        let response = service
            .search(&SearchQuery::Image {
                bytes: vec![0xff, 0xd8, 0xff],
                content_type: Some("image/jpeg".to_string()),
            })
            .await
            .unwrap();
        for result in &response.results {
            match result.source {
                ResultSource::Internal => assert!(result.influencer.is_some()),
                ResultSource::External => assert!(result.url.is_some()),
            }
        }
    }

    #[test]
    fn test_query_validation() {
        let empty = SearchQuery::Image {
            bytes: Vec::new(),
            content_type: None,
        };
        assert!(matches!(empty.validate(), Err(AppError::Validation(_))));

        let text = SearchQuery::Image {
            bytes: vec![1],
            content_type: Some("text/plain".to_string()),
        };
        assert!(text.validate().is_err());

        assert!(SearchQuery::Url("ftp://example.com/a.jpg".to_string())
            .validate()
            .is_err());
        assert!(SearchQuery::Url("not a url".to_string()).validate().is_err());
    }

    #[tokio::test]
    async fn test_delay_is_applied() {
        let service = MockSearchService::new(Duration::from_millis(50));
        let started = Instant::now();
        let response = service
            .search(&SearchQuery::Url("https://example.com/a.jpg".to_string()))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(response.processing_time.unwrap() >= 50);
    }
}
