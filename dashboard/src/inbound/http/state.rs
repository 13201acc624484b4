//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and services and remain testable without I/O.
//!
//! The identity provider holds a single server-wide session: whoever signs in
//! last is the identity every HTTP client acts as. Keep the server bound to
//! loopback (the default `127.0.0.1:8080`) so only the local user reaches it.

use std::sync::Arc;

use crate::domain::MarketDataService;
use crate::domain::ports::{IdentityProvider, MarketDataSource, WatchlistMembership};

/// Market service over any market data source.
pub type Markets = MarketDataService<dyn MarketDataSource>;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Sign-up, sign-in, and current identity.
    pub identity: Arc<dyn IdentityProvider>,
    /// Watchlist membership of the signed-in user.
    pub watchlist: Arc<dyn WatchlistMembership>,
    /// Cached market data.
    pub markets: Arc<Markets>,
}

impl HttpState {
    /// Bundle the ports handlers depend on.
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        watchlist: Arc<dyn WatchlistMembership>,
        markets: Arc<Markets>,
    ) -> Self {
        Self {
            identity,
            watchlist,
            markets,
        }
    }
}
