//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports describe what the domain needs from the outside world (the
//! identity provider, the watchlist record store, the market data provider).
//! The driving port describes what inbound adapters may ask of the domain.

mod macros;

pub(crate) use macros::define_port_error;

mod identity_provider;
mod market_data_source;
mod watchlist_membership;
mod watchlist_store;

#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{IdentityBroadcaster, IdentityProvider, IdentityProviderError};
#[cfg(test)]
pub use market_data_source::MockMarketDataSource;
pub use market_data_source::{FixtureMarketDataSource, MarketDataSource, MarketDataSourceError};
#[cfg(test)]
pub use watchlist_membership::MockWatchlistMembership;
pub use watchlist_membership::WatchlistMembership;
#[cfg(test)]
pub use watchlist_store::MockWatchlistStore;
pub use watchlist_store::{
    FixtureWatchlistStore, WatchlistStore, WatchlistStoreError, records_for,
};
