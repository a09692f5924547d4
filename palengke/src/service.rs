//! Suggest service: ranked multi-entity search with short-lived caching.
//!
//! One public operation, `search_all`, merges stall and item candidates into
//! a single relevance-ranked list of at most [`MAX_RESULTS`], caching merged
//! result sets per (query, stock-filter) pair to absorb repeated keystrokes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::database::Catalog;
use crate::interface::{PalengkeError, SearchResult};
use crate::ranking;

/// Queries shorter than this return no results and touch neither the cache
/// nor the catalog. Hard floor against pathological broad scans.
pub const MIN_QUERY_LEN: usize = 2;

/// Merged results are truncated to this many entries.
pub const MAX_RESULTS: usize = 10;

/// Candidates kept per entity kind before the merge. Weak matches of one
/// kind can be crowded out entirely by strong matches of the other.
pub const CANDIDATES_PER_KIND: usize = 20;

/// How long a cached result set stays live.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

struct CacheEntry {
    results: Vec<SearchResult>,
    stored_at: Instant,
}

/// Relevance-ranked suggest over the stall/item catalog.
///
/// The cache is an in-memory map scoped to this instance; entries are
/// evicted lazily on read, there is no background sweep, and growth is
/// unbounded. Safe to share behind a multi-worker runtime: two simultaneous
/// misses for the same new query may both compute and write, which is an
/// idempotent overwrite, not a correctness problem.
pub struct SuggestService {
    catalog: Arc<Catalog>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    cache_ttl: Duration,
}

impl SuggestService {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_cache_ttl(catalog, CACHE_TTL)
    }

    /// Construct with a custom TTL (used by tests to exercise expiry).
    pub fn with_cache_ttl(catalog: Arc<Catalog>, cache_ttl: Duration) -> Self {
        Self { catalog, cache: Mutex::new(HashMap::new()), cache_ttl }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Ranked suggestions for `query`, at most [`MAX_RESULTS`] entries,
    /// sorted descending by relevance score.
    ///
    /// Equal scores keep the backing order: stalls before items, each in
    /// ascending id order (the catalog queries return id order and the sort
    /// is stable).
    pub fn search_all(
        &self,
        query: &str,
        include_out_of_stock: bool,
    ) -> Result<Vec<SearchResult>, PalengkeError> {
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let cache_key = format!("{query}:{include_out_of_stock}");
        if let Some(results) = self.cache_lookup(&cache_key) {
            tracing::debug!(query, "suggest cache hit");
            return Ok(results);
        }

        let needle = query.to_lowercase();

        let mut stalls: Vec<SearchResult> = self
            .catalog
            .match_stalls(&needle)?
            .into_iter()
            .map(|hit| {
                let score = ranking::score_stall(&hit, &needle);
                hit.into_result(score)
            })
            .collect();
        let mut items: Vec<SearchResult> = self
            .catalog
            .match_items(&needle, include_out_of_stock)?
            .into_iter()
            .map(|hit| {
                let score = ranking::score_item(&hit, &needle);
                hit.into_result(score)
            })
            .collect();

        sort_by_score(&mut stalls);
        stalls.truncate(CANDIDATES_PER_KIND);
        sort_by_score(&mut items);
        items.truncate(CANDIDATES_PER_KIND);

        let mut merged = stalls;
        merged.append(&mut items);
        sort_by_score(&mut merged);
        merged.truncate(MAX_RESULTS);

        tracing::debug!(query, count = merged.len(), "suggest cache miss");
        self.cache.lock().insert(
            cache_key,
            CacheEntry { results: merged.clone(), stored_at: Instant::now() },
        );
        Ok(merged)
    }

    /// Drop every cache entry unconditionally. For tests and manual
    /// invalidation; not exposed to end users.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    fn cache_lookup(&self, key: &str) -> Option<Vec<SearchResult>> {
        let mut cache = self.cache.lock();
        match cache.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.cache_ttl => {
                Some(entry.results.clone())
            }
            Some(_) => {
                // Expired: evict lazily on read
                cache.remove(key);
                None
            }
            None => None,
        }
    }
}

/// Stable descending sort by relevance score. Results the service builds
/// always carry a score; the unwrap_or(0) mirrors the wire contract where
/// the field is optional.
fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.relevance_score
            .unwrap_or(0)
            .cmp(&a.relevance_score.unwrap_or(0))
    });
}
