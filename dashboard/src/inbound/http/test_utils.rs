//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use mockable::DefaultClock;

use crate::domain::ports::{FixtureMarketDataSource, MarketDataSource};
use crate::domain::{MarketDataService, MarketSettings};
use crate::inbound::http::state::Markets;

/// Market service over an empty fixture source.
pub fn fixture_markets() -> Arc<Markets> {
    markets_over(Arc::new(FixtureMarketDataSource))
}

/// Market service over `source` with default settings.
pub fn markets_over(source: Arc<dyn MarketDataSource>) -> Arc<Markets> {
    Arc::new(MarketDataService::new(
        source,
        Arc::new(DefaultClock),
        MarketSettings::default(),
    ))
}
