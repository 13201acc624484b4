//! Driving port for watchlist membership.
//!
//! Inbound adapters depend on this trait rather than on the concrete
//! [`WatchlistService`](crate::domain::WatchlistService), so handlers can be
//! tested against a mock.

use async_trait::async_trait;

use crate::domain::{CoinId, WatchlistOutcome, WatchlistSnapshot};

/// Membership queries and mutations for the signed-in user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WatchlistMembership: Send + Sync {
    /// Followed coins in insertion order. Empty while signed out or loading.
    fn watchlist(&self) -> Vec<CoinId>;

    /// Whether `coin` is currently followed.
    fn is_in_watchlist(&self, coin: &CoinId) -> bool;

    /// Phase, user, and items in one consistent read.
    fn snapshot(&self) -> WatchlistSnapshot;

    /// Follow `coin`.
    async fn add_to_watchlist(&self, coin: CoinId) -> WatchlistOutcome;

    /// Stop following `coin`.
    async fn remove_from_watchlist(&self, coin: CoinId) -> WatchlistOutcome;
}
