//! Relevance tiers for suggest results.
//!
//! Each entity kind gets an ordered table of (predicate, tier) rules,
//! evaluated top to bottom with the first match winning. The tiers are
//! priorities, not additive weights; an entity that slips past every rule
//! still scores the floor tier because the candidate filter only admits
//! entities that matched *some* field.
//!
//! All matching is case-insensitive substring matching. Callers pass the
//! query already lowercased.

use crate::models::{ItemHit, StallHit};

/// Name equals the query exactly.
pub const TIER_EXACT_NAME: i32 = 100;
/// Name starts with the query.
pub const TIER_NAME_PREFIX: i32 = 80;
/// Stall name contains the query somewhere past the start.
pub const TIER_NAME_CONTAINS: i32 = 60;
/// Stall category contains the query.
pub const TIER_CATEGORY_CONTAINS: i32 = 60;
/// Item description contains the query.
pub const TIER_ITEM_DESCRIPTION: i32 = 50;
/// Stall description contains the query.
pub const TIER_STALL_DESCRIPTION: i32 = 40;
/// Owning stall's name contains the query (items only).
pub const TIER_OWNING_STALL: i32 = 40;
/// Guaranteed-match floor: the candidate filter admitted the entity but no
/// ranked field explains why. Not a true relevance signal.
pub const TIER_FLOOR: i32 = 20;

/// Tier for a stall candidate. `needle` must be lowercased.
pub fn score_stall(hit: &StallHit, needle: &str) -> i32 {
    let name = hit.name.to_lowercase();
    let rules = [
        (name == needle, TIER_EXACT_NAME),
        (name.starts_with(needle), TIER_NAME_PREFIX),
        (name.contains(needle), TIER_NAME_CONTAINS),
        (contains(hit.category.as_deref(), needle), TIER_CATEGORY_CONTAINS),
        (contains(hit.description.as_deref(), needle), TIER_STALL_DESCRIPTION),
    ];
    first_match(&rules)
}

/// Tier for an item candidate. `needle` must be lowercased.
///
/// Items have no dedicated name-contains tier: an item whose name merely
/// contains the query falls through to description, owning-stall, or the
/// floor.
pub fn score_item(hit: &ItemHit, needle: &str) -> i32 {
    let name = hit.name.to_lowercase();
    let rules = [
        (name == needle, TIER_EXACT_NAME),
        (name.starts_with(needle), TIER_NAME_PREFIX),
        (contains(hit.description.as_deref(), needle), TIER_ITEM_DESCRIPTION),
        (
            hit.stall_name.to_lowercase().contains(needle),
            TIER_OWNING_STALL,
        ),
    ];
    first_match(&rules)
}

fn contains(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

fn first_match(rules: &[(bool, i32)]) -> i32 {
    rules
        .iter()
        .find(|(matched, _)| *matched)
        .map(|&(_, tier)| tier)
        .unwrap_or(TIER_FLOOR)
}
