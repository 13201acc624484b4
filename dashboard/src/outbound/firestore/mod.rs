//! Hosted document store adapter for watchlist records.
//!
//! Records live in one flat collection of `{ crypto, user }` documents.

mod dto;
mod http_store;

pub use http_store::{DEFAULT_BASE_URL, FirestoreConfig, FirestoreWatchlistStore};
