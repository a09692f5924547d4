//! HTTP client for the suggest endpoint.
//!
//! Wraps `reqwest` behind the [`SuggestClient`] trait so the typeahead can
//! talk to a remote server or, in tests, to a scripted stub.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::interface::{PalengkeError, SearchResult, SuggestResponse};
use crate::typeahead::SuggestClient;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Error payload the server sends on 4xx/5xx.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Suggest client backed by a running server.
pub struct HttpSuggestClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSuggestClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, PalengkeError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PalengkeError::Http(e.to_string()))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { http, base_url })
    }
}

#[async_trait]
impl SuggestClient for HttpSuggestClient {
    async fn suggest(
        &self,
        query: &str,
        include_out_of_stock: bool,
    ) -> Result<Vec<SearchResult>, PalengkeError> {
        let mut params = vec![("q", query.to_string())];
        if include_out_of_stock {
            params.push(("includeOutOfStock", "true".to_string()));
        }
        let resp = self
            .http
            .get(format!("{}/search/suggest", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| PalengkeError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            // Prefer the server's own error message when the body parses
            let message = match resp.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("server returned {status}"),
            };
            return Err(PalengkeError::Http(message));
        }

        let body: SuggestResponse = resp
            .json()
            .await
            .map_err(|e| PalengkeError::Http(e.to_string()))?;
        Ok(body.results)
    }
}
