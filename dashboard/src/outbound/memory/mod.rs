//! In-process adapters used when no hosted project is configured.
//!
//! They keep state in memory only and are intended for local development
//! and tests.

mod identity_provider;
mod watchlist_store;

pub use identity_provider::InMemoryIdentityProvider;
pub use watchlist_store::InMemoryWatchlistStore;
