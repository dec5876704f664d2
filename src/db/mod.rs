// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (hosted relational database).
//!
//! [`HostedDb`] is a table-level CRUD interface with equality filters, which is
//! all the application needs from the hosted service. [`RestDb`] speaks the
//! hosted REST dialect; [`MemoryDb`] is an in-process stand-in.

pub mod memory;
pub mod profiles;
pub mod rest;

pub use memory::MemoryDb;
pub use profiles::ProfileRepository;
pub use rest::RestDb;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Table names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
    pub const WISHLISTS: &str = "wishlists";
}

/// Equality filter on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    /// True if `row[column] == value`.
    pub fn matches(&self, row: &Value) -> bool {
        row.get(&self.column) == Some(&self.value)
    }
}

/// Sort order for a select.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// Select query: filters, optional order and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Table-level CRUD against the hosted database.
#[async_trait]
pub trait HostedDb: Send + Sync {
    /// Rows matching `query`.
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>>;

    /// Insert one row and return it as stored (with defaults applied).
    async fn insert(&self, table: &str, row: Value) -> Result<Value>;

    /// Patch all rows matching `filters`; returns the full updated rows.
    async fn update(&self, table: &str, filters: &[Filter], patch: Value) -> Result<Vec<Value>>;

    /// Delete all rows matching `filters`; returns how many were deleted.
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize>;
}

/// Decode a row into a typed model.
pub fn decode_row<T: DeserializeOwned>(table: &str, row: Value) -> Result<T> {
    serde_json::from_value(row)
        .map_err(|e| AppError::Hosted(format!("Unexpected {} row shape: {}", table, e)))
}

/// Select and decode rows.
pub async fn select_as<T: DeserializeOwned>(
    db: &dyn HostedDb,
    table: &str,
    query: &Query,
) -> Result<Vec<T>> {
    db.select(table, query)
        .await?
        .into_iter()
        .map(|row| decode_row(table, row))
        .collect()
}

/// Serialize a model into a row value.
pub fn encode_row<T: serde::Serialize>(table: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode {} row: {}", table, e)))
}
