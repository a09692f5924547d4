//! Palengke Core - ranked multi-entity suggest for a marketplace storefront
//!
//! Unifies two catalog entity types (stalls and items) into a single
//! relevance-ranked suggestion list, served over HTTP and consumed by a
//! debounced, cancellation-aware typeahead component.

pub mod client;
pub mod database;
pub mod demo;
pub mod interface;
pub mod models;
pub mod ranking;
pub mod server;
pub mod service;
pub mod typeahead;

pub use interface::*;
pub use service::SuggestService;
pub use typeahead::{SuggestClient, Typeahead};
