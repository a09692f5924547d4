//! Shared interface types for the suggest service.
//!
//! This module is the source of truth for the wire contract: the unified
//! `SearchResult`, the suggest response envelope, and the crate error enum.
//! Field names serialize camelCase to match the storefront REST contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// RESULT TYPES
// ─────────────────────────────────────────────────────────────────────────────

/// Which catalog collection a result came from.
///
/// `id` values are unique only within a kind: a stall and an item may share
/// the same numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Stall,
    Item,
}

/// A single ranked suggestion, unified across stalls and items.
///
/// Fields exclusive to one kind are `None` on the other and omitted from the
/// wire. Construct through [`SearchResult::stall`] / [`SearchResult::item`]
/// so the exclusivity invariant holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stall's own category, or the parent stall's category for items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Item-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Item-only: name of the owning stall.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stall_name: Option<String>,
    /// Item-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    /// Sort key only; not a stable ranking guarantee across queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<i32>,
}

impl SearchResult {
    /// Build a stall-kind result. Item-only fields stay `None`.
    pub fn stall(
        id: i64,
        name: String,
        description: Option<String>,
        category: Option<String>,
        image_url: Option<String>,
        relevance_score: i32,
    ) -> Self {
        Self {
            id,
            kind: ResultKind::Stall,
            name,
            description,
            category,
            price: None,
            image_url,
            stall_name: None,
            in_stock: None,
            relevance_score: Some(relevance_score),
        }
    }

    /// Build an item-kind result.
    #[allow(clippy::too_many_arguments)]
    pub fn item(
        id: i64,
        name: String,
        description: Option<String>,
        category: Option<String>,
        price: Option<f64>,
        image_url: Option<String>,
        stall_name: String,
        in_stock: bool,
        relevance_score: i32,
    ) -> Self {
        Self {
            id,
            kind: ResultKind::Item,
            name,
            description,
            category,
            price,
            image_url,
            stall_name: Some(stall_name),
            in_stock: Some(in_stock),
            relevance_score: Some(relevance_score),
        }
    }

    /// The detail route a selection navigates to.
    pub fn route(&self) -> Route {
        match self.kind {
            ResultKind::Stall => Route::Stall(self.id),
            ResultKind::Item => Route::Item(self.id),
        }
    }
}

/// Client-side navigation target for a committed selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Stall(i64),
    Item(i64),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Stall(id) => format!("/stalls/{id}"),
            Route::Item(id) => format!("/items/{id}"),
        }
    }
}

/// Response envelope for `GET /search/suggest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub results: Vec<SearchResult>,
    pub query: String,
    pub count: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// ERRORS
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for suggest operations.
#[derive(Debug, Error)]
pub enum PalengkeError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Request error: {0}")]
    Http(String),
    #[error("Operation cancelled")]
    Cancelled,
}

impl PalengkeError {
    /// Cancellation is not a failure; callers suppress it from user-visible
    /// error paths.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PalengkeError::Cancelled)
    }
}

impl From<crate::database::DatabaseError> for PalengkeError {
    fn from(e: crate::database::DatabaseError) -> Self {
        PalengkeError::Database(e.to_string())
    }
}
