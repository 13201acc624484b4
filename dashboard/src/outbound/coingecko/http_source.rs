//! Reqwest-backed CoinGecko source adapter.
//!
//! This adapter owns transport details only: query construction, timeout and
//! HTTP error mapping, and JSON decoding into domain market records.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::dto::{CoinMarketDto, GlobalResponseDto, MarketChartDto, into_domain_coins};
use crate::domain::ports::{MarketDataSource, MarketDataSourceError};
use crate::domain::{ChartData, Coin, CoinId, MarketListingQuery, MarketStats, TimeFrame};
use crate::outbound::http_support::{body_preview, join_segments};

/// Public API root used when no override is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const API_KEY_PARAM: &str = "x_cg_demo_api_key";
const DEFAULT_USER_AGENT: &str = "dashboard-market-source/0.1";

/// Market data adapter that performs HTTP GET requests against one API root.
pub struct CoinGeckoHttpSource {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl CoinGeckoHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, MarketDataSourceError> {
        join_segments(&self.base_url, segments).ok_or_else(|| {
            MarketDataSourceError::invalid_request(format!(
                "base URL {} cannot carry a path",
                self.base_url
            ))
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, MarketDataSourceError> {
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);
        if let Some(key) = &self.api_key {
            request = request.query(&[(API_KEY_PARAM, key.as_str())]);
        }
        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        decode(body.as_ref())
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoHttpSource {
    async fn top_coins(
        &self,
        query: &MarketListingQuery,
    ) -> Result<Vec<Coin>, MarketDataSourceError> {
        let url = self.endpoint(["coins", "markets"])?;
        let params = listing_params(query);
        let rows: Vec<CoinMarketDto> = self.get_json(url, &params).await?;
        into_domain_coins(rows).map_err(MarketDataSourceError::decode)
    }

    async fn global_stats(&self) -> Result<MarketStats, MarketDataSourceError> {
        let url = self.endpoint(["global"])?;
        let response: GlobalResponseDto = self.get_json(url, &[]).await?;
        Ok(response.into_domain())
    }

    async fn market_chart(
        &self,
        coin: &CoinId,
        vs_currency: &str,
        timeframe: TimeFrame,
    ) -> Result<ChartData, MarketDataSourceError> {
        let url = self.endpoint(["coins", coin.as_ref(), "market_chart"])?;
        let params = [
            ("vs_currency", vs_currency.to_owned()),
            ("days", timeframe.days().to_owned()),
        ];
        let chart: MarketChartDto = self.get_json(url, &params).await?;
        chart.into_domain().map_err(MarketDataSourceError::decode)
    }
}

fn listing_params(query: &MarketListingQuery) -> Vec<(&'static str, String)> {
    vec![
        ("vs_currency", query.vs_currency.clone()),
        ("order", "market_cap_desc".to_owned()),
        ("per_page", query.per_page.to_string()),
        ("page", query.page.to_string()),
        ("sparkline", "false".to_owned()),
        ("price_change_percentage", "24h".to_owned()),
    ]
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, MarketDataSourceError> {
    serde_json::from_slice(body).map_err(|error| {
        MarketDataSourceError::decode(format!("invalid market data JSON payload: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> MarketDataSourceError {
    if error.is_timeout() {
        MarketDataSourceError::timeout(error.to_string())
    } else {
        MarketDataSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MarketDataSourceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => MarketDataSourceError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            MarketDataSourceError::timeout(message)
        }
        _ if status.is_client_error() => MarketDataSourceError::invalid_request(message),
        _ => MarketDataSourceError::transport(message),
    }
}
