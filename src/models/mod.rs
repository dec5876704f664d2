// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod credentials;
pub mod post;
pub mod search;
pub mod session;
pub mod user;

pub use credentials::{LoginRequest, RegisterRequest};
pub use post::{NewPost, Post, PostUpdate, WishlistItem};
pub use search::{ResultSource, SearchResponse, SearchResult};
pub use session::{AuthChangeEvent, AuthResponse, Session, SessionUser};
pub use user::{Gender, ProfileUpdate, UserProfile};
