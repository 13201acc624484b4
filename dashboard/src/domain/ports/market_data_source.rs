//! Port for the public market data provider.

use async_trait::async_trait;

use crate::domain::{ChartData, Coin, CoinId, MarketListingQuery, MarketStats, TimeFrame};

use super::define_port_error;

define_port_error! {
    /// Errors raised by market data adapters.
    pub enum MarketDataSourceError {
        /// Transport or connectivity failure.
        Transport { message: String } =>
            "market data transport failed: {message}",
        /// Request exceeded the configured timeout.
        Timeout { message: String } =>
            "market data request timed out: {message}",
        /// Upstream throttled the request.
        RateLimited { message: String } =>
            "market data request was rate limited: {message}",
        /// Upstream rejected request parameters.
        InvalidRequest { message: String } =>
            "market data request was rejected: {message}",
        /// Response payload could not be decoded.
        Decode { message: String } =>
            "market data response could not be decoded: {message}",
    }
}

/// Port for listing, global statistics, and historical series.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// One page of coins ordered by market capitalisation.
    async fn top_coins(&self, query: &MarketListingQuery)
    -> Result<Vec<Coin>, MarketDataSourceError>;

    /// Global market statistics.
    async fn global_stats(&self) -> Result<MarketStats, MarketDataSourceError>;

    /// Historical series for `coin` over `timeframe`.
    async fn market_chart(
        &self,
        coin: &CoinId,
        vs_currency: &str,
        timeframe: TimeFrame,
    ) -> Result<ChartData, MarketDataSourceError>;
}

/// Fixture source that serves an empty market.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureMarketDataSource;

#[async_trait]
impl MarketDataSource for FixtureMarketDataSource {
    async fn top_coins(
        &self,
        _query: &MarketListingQuery,
    ) -> Result<Vec<Coin>, MarketDataSourceError> {
        Ok(Vec::new())
    }

    async fn global_stats(&self) -> Result<MarketStats, MarketDataSourceError> {
        Err(MarketDataSourceError::transport(
            "fixture source has no global statistics",
        ))
    }

    async fn market_chart(
        &self,
        _coin: &CoinId,
        _vs_currency: &str,
        _timeframe: TimeFrame,
    ) -> Result<ChartData, MarketDataSourceError> {
        Ok(ChartData::default())
    }
}
