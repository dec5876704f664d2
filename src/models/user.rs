// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model (the `users` table of the hosted database).

use serde::{Deserialize, Serialize};

use super::session::SessionUser;

/// Gender as stored on the profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

/// Application-level user record.
///
/// Owned by the hosted database; the client only keeps a read-only mirror of
/// it in local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Hosted auth user ID (also the row ID)
    pub id: String,
    /// Display name
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub is_influencer: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub body_type: Option<String>,
    #[serde(default)]
    pub style_preference: Option<String>,
    #[serde(default)]
    pub season_preference: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// ISO 8601
    #[serde(default)]
    pub created_at: String,
    /// ISO 8601
    #[serde(default)]
    pub updated_at: String,
}

impl UserProfile {
    /// Build the first profile row for a hosted user that has none yet.
    ///
    /// Name, phone and gender come from the sign-up metadata when present;
    /// the name falls back to the local part of the email address.
    pub fn from_session_user(user: &SessionUser, now: &str) -> Self {
        let email = user.email.clone().unwrap_or_default();
        let name = user
            .metadata_str("name")
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        let gender = user
            .metadata_str("gender")
            .and_then(|g| g.parse().ok())
            .unwrap_or_default();

        Self {
            id: user.id.clone(),
            name,
            email,
            phone: user.metadata_str("phone").map(str::to_string),
            gender,
            is_influencer: false,
            avatar_url: None,
            body_type: None,
            style_preference: None,
            season_preference: None,
            bio: None,
            category: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// Partial profile update: only `Some` fields are sent.
///
/// There is deliberately no `id` field; updates are always keyed by the
/// signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_influencer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Set by the caller of the hosted update, never by the user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ProfileUpdate {
    /// True when no user-editable field is set.
    pub fn is_empty(&self) -> bool {
        *self
            == ProfileUpdate {
                updated_at: self.updated_at.clone(),
                ..Default::default()
            }
    }
}
