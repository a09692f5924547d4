//! HTTP surface for the suggest service.
//!
//! One ranked-suggestion endpoint plus a health probe. The service's catalog
//! work is blocking rusqlite, so handlers cross into it via spawn_blocking.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::interface::{PalengkeError, SuggestResponse};
use crate::service::{SuggestService, MIN_QUERY_LEN};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SuggestService>,
}

pub fn router(service: Arc<SuggestService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search/suggest", get(suggest))
        .with_state(AppState { service })
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct SuggestParams {
    q: Option<String>,
    #[serde(rename = "includeOutOfStock")]
    include_out_of_stock: Option<String>,
}

async fn suggest(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let Some(query) = params.q else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "Query parameter \"q\" is required",
        ));
    };

    // Short queries are not an error: empty results, 200
    if query.chars().count() < MIN_QUERY_LEN {
        return Ok(Json(SuggestResponse { results: Vec::new(), query, count: 0 }));
    }

    let include_out_of_stock = params.include_out_of_stock.as_deref() == Some("true");

    let service = Arc::clone(&state.service);
    let owned_query = query.clone();
    let results = tokio::task::spawn_blocking(move || {
        service.search_all(&owned_query, include_out_of_stock)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "suggest task failed");
        ApiError::search_failed()
    })?
    .map_err(|e| {
        tracing::error!(error = %e, query, "suggest query failed");
        ApiError::search_failed()
    })?;

    let count = results.len();
    Ok(Json(SuggestResponse { results, query, count }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// The generic 500 contract. The underlying error is logged, never
    /// exposed in the body.
    fn search_failed() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Search failed")
    }
}

impl From<PalengkeError> for ApiError {
    fn from(err: PalengkeError) -> Self {
        tracing::error!(error = %err, "suggest service error");
        ApiError::search_failed()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.message };
        (self.status, Json(body)).into_response()
    }
}
