//! DTOs for decoding CoinGecko JSON responses.
//!
//! Rows are decoded into these transport DTOs first, then mapped into domain
//! records in one pass so identifier and timestamp checks live in one place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{ChartData, Coin, CoinId, MarketStats, SeriesPoint};

#[derive(Debug, Deserialize)]
pub(super) struct CoinMarketDto {
    pub(super) id: String,
    pub(super) symbol: String,
    pub(super) name: String,
    pub(super) image: Option<String>,
    pub(super) current_price: Option<f64>,
    pub(super) market_cap: Option<f64>,
    pub(super) market_cap_rank: Option<u32>,
    pub(super) total_volume: Option<f64>,
    pub(super) high_24h: Option<f64>,
    pub(super) low_24h: Option<f64>,
    pub(super) price_change_24h: Option<f64>,
    pub(super) price_change_percentage_24h: Option<f64>,
    pub(super) market_cap_change_24h: Option<f64>,
    pub(super) market_cap_change_percentage_24h: Option<f64>,
    pub(super) circulating_supply: Option<f64>,
    pub(super) total_supply: Option<f64>,
    pub(super) max_supply: Option<f64>,
    pub(super) last_updated: Option<DateTime<Utc>>,
}

impl CoinMarketDto {
    pub(super) fn into_domain(self) -> Result<Coin, String> {
        let id = CoinId::new(self.id.as_str())
            .map_err(|error| format!("coin row {:?} has an invalid id: {error}", self.id))?;
        Ok(Coin {
            id,
            symbol: self.symbol,
            name: self.name,
            image: self.image,
            current_price: self.current_price,
            market_cap: self.market_cap,
            market_cap_rank: self.market_cap_rank,
            total_volume: self.total_volume,
            high_24h: self.high_24h,
            low_24h: self.low_24h,
            price_change_24h: self.price_change_24h,
            price_change_percentage_24h: self.price_change_percentage_24h,
            market_cap_change_24h: self.market_cap_change_24h,
            market_cap_change_percentage_24h: self.market_cap_change_percentage_24h,
            circulating_supply: self.circulating_supply,
            total_supply: self.total_supply,
            max_supply: self.max_supply,
            last_updated: self.last_updated,
        })
    }
}

pub(super) fn into_domain_coins(rows: Vec<CoinMarketDto>) -> Result<Vec<Coin>, String> {
    rows.into_iter().map(CoinMarketDto::into_domain).collect()
}

#[derive(Debug, Deserialize)]
pub(super) struct GlobalResponseDto {
    pub(super) data: GlobalDataDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct GlobalDataDto {
    #[serde(default)]
    pub(super) active_cryptocurrencies: u64,
    #[serde(default)]
    pub(super) markets: u64,
    #[serde(default)]
    pub(super) total_market_cap: HashMap<String, f64>,
    #[serde(default)]
    pub(super) total_volume: HashMap<String, f64>,
    #[serde(default)]
    pub(super) market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    pub(super) market_cap_change_percentage_24h_usd: f64,
}

impl GlobalResponseDto {
    pub(super) fn into_domain(self) -> MarketStats {
        let data = self.data;
        MarketStats {
            active_cryptocurrencies: data.active_cryptocurrencies,
            markets: data.markets,
            total_market_cap: data.total_market_cap,
            total_volume: data.total_volume,
            market_cap_percentage: data.market_cap_percentage,
            market_cap_change_percentage_24h_usd: data.market_cap_change_percentage_24h_usd,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct MarketChartDto {
    #[serde(default)]
    pub(super) prices: Vec<(i64, f64)>,
    #[serde(default)]
    pub(super) market_caps: Vec<(i64, f64)>,
    #[serde(default)]
    pub(super) total_volumes: Vec<(i64, f64)>,
}

impl MarketChartDto {
    pub(super) fn into_domain(self) -> Result<ChartData, String> {
        Ok(ChartData {
            prices: series(self.prices, "prices")?,
            market_caps: series(self.market_caps, "market_caps")?,
            total_volumes: series(self.total_volumes, "total_volumes")?,
        })
    }
}

fn series(samples: Vec<(i64, f64)>, name: &str) -> Result<Vec<SeriesPoint>, String> {
    samples
        .into_iter()
        .map(|(millis, value)| {
            let timestamp = DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| format!("{name} sample has out-of-range timestamp {millis}"))?;
            Ok(SeriesPoint { timestamp, value })
        })
        .collect()
}
