//! Market data read models.
//!
//! Field names follow the listing provider so the JSON surface stays
//! familiar to dashboard front-ends.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CoinId;

/// One row of the market listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Provider identifier, e.g. `bitcoin`.
    pub id: CoinId,
    /// Ticker symbol, e.g. `btc`.
    pub symbol: String,
    /// Display name, e.g. `Bitcoin`.
    pub name: String,
    /// Logo URL.
    pub image: Option<String>,
    /// Latest price in the quote currency.
    pub current_price: Option<f64>,
    /// Market capitalisation.
    pub market_cap: Option<f64>,
    /// Rank by market capitalisation.
    pub market_cap_rank: Option<u32>,
    /// Traded volume over 24 hours.
    pub total_volume: Option<f64>,
    /// 24 hour high.
    pub high_24h: Option<f64>,
    /// 24 hour low.
    pub low_24h: Option<f64>,
    /// Absolute price change over 24 hours.
    pub price_change_24h: Option<f64>,
    /// Relative price change over 24 hours, in percent.
    pub price_change_percentage_24h: Option<f64>,
    /// Absolute market capitalisation change over 24 hours.
    pub market_cap_change_24h: Option<f64>,
    /// Relative market capitalisation change over 24 hours, in percent.
    pub market_cap_change_percentage_24h: Option<f64>,
    /// Coins in circulation.
    pub circulating_supply: Option<f64>,
    /// Coins in existence, when known.
    pub total_supply: Option<f64>,
    /// Hard cap, when one exists.
    pub max_supply: Option<f64>,
    /// Provider timestamp of the last update.
    pub last_updated: Option<DateTime<Utc>>,
}

impl Coin {
    /// Case-insensitive substring match on name or symbol.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle) || self.symbol.to_lowercase().contains(&needle)
    }
}

/// Global market statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Number of tracked coins.
    pub active_cryptocurrencies: u64,
    /// Number of tracked exchanges.
    pub markets: u64,
    /// Total market capitalisation keyed by quote currency.
    pub total_market_cap: HashMap<String, f64>,
    /// Total 24 hour volume keyed by quote currency.
    pub total_volume: HashMap<String, f64>,
    /// Dominance percentage keyed by coin symbol.
    pub market_cap_percentage: HashMap<String, f64>,
    /// 24 hour market capitalisation change, in percent.
    pub market_cap_change_percentage_24h_usd: f64,
}

impl MarketStats {
    /// Bitcoin dominance, in percent.
    pub fn btc_dominance(&self) -> Option<f64> {
        self.market_cap_percentage.get("btc").copied()
    }

    /// Ether dominance, in percent.
    pub fn eth_dominance(&self) -> Option<f64> {
        self.market_cap_percentage.get("eth").copied()
    }
}

/// A timestamped sample in a historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Sample time.
    pub timestamp: DateTime<Utc>,
    /// Sample value in the quote currency.
    pub value: f64,
}

/// Historical series for one coin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    /// Price samples.
    pub prices: Vec<SeriesPoint>,
    /// Market capitalisation samples.
    pub market_caps: Vec<SeriesPoint>,
    /// Volume samples.
    pub total_volumes: Vec<SeriesPoint>,
}

/// Error returned when parsing an unknown [`TimeFrame`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timeframe must be one of 24h, 7d, 30d, 90d, 1y (got {0:?})")]
pub struct TimeFrameParseError(pub String);

/// Chart window selectable by the viewer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    /// Last 24 hours.
    #[serde(rename = "24h")]
    Day,
    /// Last 7 days.
    #[default]
    #[serde(rename = "7d")]
    Week,
    /// Last 30 days.
    #[serde(rename = "30d")]
    Month,
    /// Last 90 days.
    #[serde(rename = "90d")]
    Quarter,
    /// Last year.
    #[serde(rename = "1y")]
    Year,
}

impl TimeFrame {
    /// Every selectable window, shortest first.
    pub const ALL: [Self; 5] = [
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Quarter,
        Self::Year,
    ];

    /// Value for the provider's `days` parameter.
    pub fn days(self) -> &'static str {
        match self {
            Self::Day => "1",
            Self::Week => "7",
            Self::Month => "30",
            Self::Quarter => "90",
            Self::Year => "365",
        }
    }

    /// Short label shown on the selector.
    pub fn label(self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::Year => "1y",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeFrame {
    type Err = TimeFrameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|frame| frame.label() == s)
            .ok_or_else(|| TimeFrameParseError(s.to_owned()))
    }
}

/// Parameters for one page of the market listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketListingQuery {
    /// Quote currency, e.g. `usd`.
    pub vs_currency: String,
    /// One-based page number.
    pub page: u32,
    /// Rows per page.
    pub per_page: u32,
}

/// Keep only the coins present in `watchlist`, in listing order.
///
/// # Examples
/// ```
/// use dashboard::domain::{CoinId, watched_coins};
///
/// let watchlist = vec![CoinId::new("ethereum").unwrap()];
/// assert!(watched_coins(Vec::new(), &watchlist).is_empty());
/// ```
pub fn watched_coins(coins: Vec<Coin>, watchlist: &[CoinId]) -> Vec<Coin> {
    coins
        .into_iter()
        .filter(|coin| watchlist.contains(&coin.id))
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_coin(id: &str, name: &str, symbol: &str) -> Coin {
    Coin {
        id: CoinId::new(id).expect("valid coin id"),
        symbol: symbol.to_owned(),
        name: name.to_owned(),
        image: None,
        current_price: Some(1.0),
        market_cap: None,
        market_cap_rank: None,
        total_volume: None,
        high_24h: None,
        low_24h: None,
        price_change_24h: None,
        price_change_percentage_24h: None,
        market_cap_change_24h: None,
        market_cap_change_percentage_24h: None,
        circulating_supply: None,
        total_supply: None,
        max_supply: None,
        last_updated: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("24h", TimeFrame::Day, "1")]
    #[case("7d", TimeFrame::Week, "7")]
    #[case("30d", TimeFrame::Month, "30")]
    #[case("90d", TimeFrame::Quarter, "90")]
    #[case("1y", TimeFrame::Year, "365")]
    fn timeframes_map_to_provider_days(
        #[case] label: &str,
        #[case] frame: TimeFrame,
        #[case] days: &str,
    ) {
        assert_eq!(label.parse::<TimeFrame>(), Ok(frame));
        assert_eq!(frame.days(), days);
        assert_eq!(
            serde_json::to_value(frame).expect("serialise"),
            serde_json::json!(label)
        );
    }

    #[test]
    fn unknown_timeframe_is_rejected() {
        let err = "2w".parse::<TimeFrame>().expect_err("unknown label");
        assert!(err.to_string().contains("2w"));
    }

    #[rstest]
    #[case("bit", true)]
    #[case("BTC", true)]
    #[case("  ", true)]
    #[case("doge", false)]
    fn coin_search_matches_name_or_symbol(#[case] term: &str, #[case] expected: bool) {
        let coin = sample_coin("bitcoin", "Bitcoin", "btc");
        assert_eq!(coin.matches(term), expected);
    }

    #[test]
    fn watched_coins_keep_listing_order() {
        let coins = vec![
            sample_coin("bitcoin", "Bitcoin", "btc"),
            sample_coin("ethereum", "Ethereum", "eth"),
            sample_coin("dogecoin", "Dogecoin", "doge"),
        ];
        let watchlist = vec![
            CoinId::new("dogecoin").expect("id"),
            CoinId::new("bitcoin").expect("id"),
        ];

        let ids: Vec<String> = watched_coins(coins, &watchlist)
            .into_iter()
            .map(|coin| coin.id.to_string())
            .collect();
        assert_eq!(ids, vec!["bitcoin", "dogecoin"]);
    }

    #[test]
    fn dominance_reads_symbol_percentages() {
        let stats = MarketStats {
            active_cryptocurrencies: 10,
            markets: 2,
            total_market_cap: HashMap::new(),
            total_volume: HashMap::new(),
            market_cap_percentage: HashMap::from([("btc".to_owned(), 52.5)]),
            market_cap_change_percentage_24h_usd: -1.2,
        };
        assert_eq!(stats.btc_dominance(), Some(52.5));
        assert_eq!(stats.eth_dominance(), None);
    }
}
