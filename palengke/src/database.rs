//! SQLite catalog layer for stalls and items.
//!
//! The relational store itself is an external collaborator; this module owns
//! only the thin candidate-query layer the suggest service needs, plus insert
//! helpers so binaries and tests can build catalogs. Uses r2d2 connection
//! pooling so concurrent suggest requests read without mutex blocking.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use thiserror::Error;

use crate::models::{ItemHit, NewItem, NewStall, StallHit};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Thread-safe catalog wrapper using connection pooling.
///
/// WAL mode lets readers proceed without blocking each other.
pub struct Catalog {
    pool: Pool<SqliteConnectionManager>,
    /// Candidate queries run so far. Exposed for the stats surface and for
    /// asserting the short-query and cache fast paths never hit the catalog.
    queries_run: AtomicU64,
}

impl Catalog {
    /// Open or create a catalog database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA foreign_keys=ON;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let catalog = Self { pool, queries_run: AtomicU64::new(0) };
        catalog.setup_schema()?;
        Ok(catalog)
    }

    /// Open an in-memory catalog (for testing).
    #[cfg(test)]
    pub(crate) fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys=ON;")?;
            Ok(())
        });

        // In-memory needs a single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let catalog = Self { pool, queries_run: AtomicU64::new(0) };
        catalog.setup_schema()?;
        Ok(catalog)
    }

    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stalls (
                stall_id INTEGER PRIMARY KEY AUTOINCREMENT,
                stall_name TEXT NOT NULL,
                stall_description TEXT,
                category TEXT,
                image_url TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS stall_items (
                item_id INTEGER PRIMARY KEY AUTOINCREMENT,
                stall_id INTEGER NOT NULL REFERENCES stalls(stall_id) ON DELETE CASCADE,
                item_name TEXT NOT NULL,
                item_description TEXT,
                price REAL,
                in_stock INTEGER NOT NULL DEFAULT 1,
                image_url TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_stall_items_stall ON stall_items(stall_id);
            CREATE INDEX IF NOT EXISTS idx_stalls_name ON stalls(stall_name COLLATE NOCASE);
            CREATE INDEX IF NOT EXISTS idx_stall_items_name ON stall_items(item_name COLLATE NOCASE);
        "#,
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Candidate queries (read side)
    // ─────────────────────────────────────────────────────────────────────────

    /// Stalls whose name, category, or description contains `needle`
    /// (already lowercased). Rows come back in id order; that order is the
    /// service's documented tiebreak for equal relevance scores.
    ///
    /// SQLite's `LOWER()` folds ASCII only, so a row is a candidate only if
    /// it matches under ASCII case folding; an accented uppercase letter
    /// ("É") does not fold and will not match its lowercase query form.
    pub fn match_stalls(&self, needle: &str) -> DatabaseResult<Vec<StallHit>> {
        self.queries_run.fetch_add(1, Ordering::Relaxed);
        let pattern = like_pattern(needle);
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r"
            SELECT stall_id, stall_name, stall_description, category, image_url
            FROM stalls
            WHERE LOWER(stall_name) LIKE ?1 ESCAPE '\'
               OR LOWER(COALESCE(category, '')) LIKE ?1 ESCAPE '\'
               OR LOWER(COALESCE(stall_description, '')) LIKE ?1 ESCAPE '\'
            ORDER BY stall_id
        ",
        )?;
        let rows = stmt
            .query_map(params![pattern], |row| {
                Ok(StallHit {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    category: row.get(3)?,
                    image_url: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Items whose name, description, or owning stall's name contains
    /// `needle` (already lowercased). When `include_out_of_stock` is false,
    /// out-of-stock items are excluded from the candidate set entirely.
    /// Candidate case folding is ASCII-only, as in [`Catalog::match_stalls`].
    pub fn match_items(
        &self,
        needle: &str,
        include_out_of_stock: bool,
    ) -> DatabaseResult<Vec<ItemHit>> {
        self.queries_run.fetch_add(1, Ordering::Relaxed);
        let pattern = like_pattern(needle);
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r"
            SELECT si.item_id, si.item_name, si.item_description, si.price,
                   si.in_stock, s.stall_name, s.category, si.image_url
            FROM stall_items si
            INNER JOIN stalls s ON s.stall_id = si.stall_id
            WHERE (LOWER(si.item_name) LIKE ?1 ESCAPE '\'
                OR LOWER(COALESCE(si.item_description, '')) LIKE ?1 ESCAPE '\'
                OR LOWER(s.stall_name) LIKE ?1 ESCAPE '\')
              AND (?2 OR si.in_stock = 1)
            ORDER BY si.item_id
        ",
        )?;
        let rows = stmt
            .query_map(params![pattern, include_out_of_stock], |row| {
                Ok(ItemHit {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    price: row.get(3)?,
                    in_stock: row.get(4)?,
                    stall_name: row.get(5)?,
                    category: row.get(6)?,
                    image_url: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Candidate queries executed since this catalog was opened.
    pub fn queries_run(&self) -> u64 {
        self.queries_run.load(Ordering::Relaxed)
    }

    pub fn count_stalls(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM stalls", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    pub fn count_items(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM stall_items", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Insert helpers (write side)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn insert_stall(&self, stall: &NewStall) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO stalls (stall_name, stall_description, category, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                stall.name,
                stall.description,
                stall.category,
                stall.image_url,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_item(&self, item: &NewItem) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO stall_items (stall_id, item_name, item_description, price, in_stock, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.stall_id,
                item.name,
                item.description,
                item.price,
                item.in_stock,
                item.image_url,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

/// Wrap a lowercased needle in `%...%`, escaping LIKE metacharacters so user
/// input like `100%` matches literally. The comparison happens inside
/// SQLite against `LOWER(col)`, which is ASCII-only folding; Unicode
/// uppercase in stored text stays uppercase on the left side of the LIKE.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_catalog() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        let nena = catalog
            .insert_stall(
                &NewStall::new("Aling Nena's")
                    .category("Fresh Produce")
                    .description("Vegetables straight from Benguet"),
            )
            .unwrap();
        let tomato = catalog
            .insert_stall(&NewStall::new("Tomato Corner").category("Produce"))
            .unwrap();
        catalog
            .insert_item(
                &NewItem::new(nena, "Fresh Tomatoes")
                    .description("Vine ripened, by the kilo")
                    .price(45.0),
            )
            .unwrap();
        catalog
            .insert_item(&NewItem::new(tomato, "Tomato Paste").price(30.0).in_stock(false))
            .unwrap();
        catalog
            .insert_item(&NewItem::new(nena, "Red Onions").price(60.0))
            .unwrap();
        catalog
    }

    #[test]
    fn test_match_stalls_over_all_fields() {
        let catalog = seeded_catalog();
        // Name
        assert_eq!(catalog.match_stalls("tomato").unwrap().len(), 1);
        // Category matches both "Fresh Produce" and "Produce"
        assert_eq!(catalog.match_stalls("produce").unwrap().len(), 2);
        // Description
        let hits = catalog.match_stalls("benguet").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Aling Nena's");
    }

    #[test]
    fn test_match_items_joins_stall_fields() {
        let catalog = seeded_catalog();
        let hits = catalog.match_items("onion", true).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].stall_name, "Aling Nena's");
        assert_eq!(hits[0].category.as_deref(), Some("Fresh Produce"));
    }

    #[test]
    fn test_stock_filter_excludes_before_scoring() {
        let catalog = seeded_catalog();
        // "tomato" matches Fresh Tomatoes (in stock) and Tomato Paste (out)
        let in_stock_only = catalog.match_items("tomato", false).unwrap();
        assert_eq!(in_stock_only.len(), 1);
        assert_eq!(in_stock_only[0].name, "Fresh Tomatoes");

        let all = catalog.match_items("tomato", true).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_items_match_via_owning_stall_name() {
        let catalog = seeded_catalog();
        // Tomato Paste is out of stock; only via include_out_of_stock
        let hits = catalog.match_items("corner", true).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Tomato Paste");
    }

    #[test]
    fn test_rows_ordered_by_id() {
        let catalog = seeded_catalog();
        let hits = catalog.match_items("a", true).unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern(r"a\b"), "%a\\\\b%");

        let catalog = Catalog::open_in_memory().unwrap();
        let id = catalog.insert_stall(&NewStall::new("Everything 50% Off")).unwrap();
        catalog.insert_item(&NewItem::new(id, "Discount Rice")).unwrap();
        // "%" must match literally, not as a wildcard
        assert_eq!(catalog.match_stalls("50%").unwrap().len(), 1);
        assert_eq!(catalog.match_stalls("99%").unwrap().len(), 0);
    }

    #[test]
    fn test_candidate_folding_is_ascii_only() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.insert_stall(&NewStall::new("CAFÉ MARIKINA")).unwrap();
        // ASCII letters fold, so the ASCII part of the name matches
        assert_eq!(catalog.match_stalls("caf").unwrap().len(), 1);
        assert_eq!(catalog.match_stalls("marikina").unwrap().len(), 1);
        // "É" does not fold under SQLite's LOWER; the accented query misses
        assert_eq!(catalog.match_stalls("café").unwrap().len(), 0);
    }

    #[test]
    fn test_query_counter() {
        let catalog = seeded_catalog();
        let before = catalog.queries_run();
        catalog.match_stalls("x").unwrap();
        catalog.match_items("x", false).unwrap();
        assert_eq!(catalog.queries_run(), before + 2);
    }
}
