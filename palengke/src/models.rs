//! Catalog row types shared between the database layer and the service.

use crate::interface::SearchResult;

// ─────────────────────────────────────────────────────────────────────────────
// CANDIDATE ROWS (read side)
// ─────────────────────────────────────────────────────────────────────────────

/// A stall row admitted by the candidate filter, before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct StallHit {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl StallHit {
    pub fn into_result(self, relevance_score: i32) -> SearchResult {
        SearchResult::stall(
            self.id,
            self.name,
            self.description,
            self.category,
            self.image_url,
            relevance_score,
        )
    }
}

/// An item row admitted by the candidate filter, joined with its owning stall.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemHit {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub in_stock: bool,
    pub stall_name: String,
    /// Parent stall's category.
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl ItemHit {
    pub fn into_result(self, relevance_score: i32) -> SearchResult {
        SearchResult::item(
            self.id,
            self.name,
            self.description,
            self.category,
            self.price,
            self.image_url,
            self.stall_name,
            self.in_stock,
            relevance_score,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// INSERT PAYLOADS (write side, used by binaries and tests)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct NewStall {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl NewStall {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    pub fn category(mut self, c: impl Into<String>) -> Self {
        self.category = Some(c.into());
        self
    }

    pub fn image_url(mut self, u: impl Into<String>) -> Self {
        self.image_url = Some(u.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub stall_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub in_stock: bool,
    pub image_url: Option<String>,
}

impl NewItem {
    pub fn new(stall_id: i64, name: impl Into<String>) -> Self {
        Self {
            stall_id,
            name: name.into(),
            description: None,
            price: None,
            in_stock: true,
            image_url: None,
        }
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    pub fn price(mut self, p: f64) -> Self {
        self.price = Some(p);
        self
    }

    pub fn in_stock(mut self, s: bool) -> Self {
        self.in_stock = s;
        self
    }

    pub fn image_url(mut self, u: impl Into<String>) -> Self {
        self.image_url = Some(u.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::ResultKind;

    #[test]
    fn test_stall_hit_into_result() {
        let hit = StallHit {
            id: 4,
            name: "Tomato Corner".into(),
            description: None,
            category: Some("Produce".into()),
            image_url: None,
        };
        let r = hit.into_result(60);
        assert_eq!(r.kind, ResultKind::Stall);
        assert_eq!(r.id, 4);
        assert_eq!(r.category.as_deref(), Some("Produce"));
        assert_eq!(r.relevance_score, Some(60));
    }

    #[test]
    fn test_item_hit_into_result_carries_stall_fields() {
        let hit = ItemHit {
            id: 9,
            name: "Fresh Tomatoes".into(),
            description: Some("Vine ripened".into()),
            price: Some(45.0),
            in_stock: false,
            stall_name: "Tomato Corner".into(),
            category: Some("Produce".into()),
            image_url: None,
        };
        let r = hit.into_result(50);
        assert_eq!(r.kind, ResultKind::Item);
        assert_eq!(r.stall_name.as_deref(), Some("Tomato Corner"));
        assert_eq!(r.in_stock, Some(false));
        assert_eq!(r.price, Some(45.0));
    }
}
