// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token (JWT) claims.
//!
//! The client never holds the hosted service's signing secret, so it only
//! reads claims without verifying the signature; the token is verified
//! remotely when the session is installed. The in-process auth service signs
//! and verifies with a shared secret.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Claims carried by hosted access tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User ID
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Expiry (unix seconds)
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Read claims without checking the signature or expiry.
pub fn decode_unverified(token: &str) -> Result<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Validation(format!("Malformed access token: {}", e)))
}

/// Sign claims with HS256.
pub fn issue(claims: &AccessClaims, secret: &[u8]) -> Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign access token: {}", e)))
}

/// Verify signature and expiry.
pub fn verify(token: &str, secret: &[u8]) -> Result<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::NotAuthenticated)
}
