//! Market data queries with a short stale-time cache.
//!
//! Listing pages, global statistics, and charts are cached per query for
//! `stale_after`; within that window repeated reads do not reach the
//! provider. Searches and watchlist views are derived from the first listing
//! page.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{MarketDataSource, MarketDataSourceError};
use crate::domain::{
    ChartData, Coin, CoinId, Error, MarketListingQuery, MarketStats, TimeFrame, watched_coins,
};

/// Largest page size accepted by the listing provider.
pub const MAX_PER_PAGE: u32 = 250;

/// Most entries any one cache holds.
const CACHE_CAPACITY: usize = 64;

/// Tunables for [`MarketDataService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSettings {
    /// Quote currency for prices, e.g. `usd`.
    pub vs_currency: String,
    /// Page size used for the first page and derived views.
    pub per_page: u32,
    /// How long a cached response is served before refetching.
    pub stale_after: Duration,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            vs_currency: "usd".to_owned(),
            per_page: 40,
            stale_after: Duration::from_secs(30),
        }
    }
}

struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, (DateTime<Utc>, V)>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    fn get(&self, key: &K, now: DateTime<Utc>, stale_after: Duration) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let (fetched_at, value) = entries.get(key)?;
        let fresh = (now - *fetched_at)
            .to_std()
            .is_ok_and(|age| age < stale_after);
        fresh.then(|| value.clone())
    }

    /// Insert `value`, first dropping stale entries and, at capacity, the
    /// oldest one.
    fn put(&self, key: K, now: DateTime<Utc>, stale_after: Duration, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, (fetched_at, _)| {
            !(now - *fetched_at)
                .to_std()
                .is_ok_and(|age| age >= stale_after)
        });
        if entries.len() >= CACHE_CAPACITY && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (fetched_at, _))| *fetched_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(key, (now, value));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Read side of the dashboard's market views.
pub struct MarketDataService<M: ?Sized> {
    source: Arc<M>,
    clock: Arc<dyn Clock>,
    settings: MarketSettings,
    listings: TtlCache<MarketListingQuery, Vec<Coin>>,
    global: TtlCache<(), MarketStats>,
    charts: TtlCache<(CoinId, TimeFrame), ChartData>,
}

impl<M> MarketDataService<M>
where
    M: MarketDataSource + ?Sized,
{
    /// Create a service reading from `source`.
    pub fn new(source: Arc<M>, clock: Arc<dyn Clock>, settings: MarketSettings) -> Self {
        Self {
            source,
            clock,
            settings,
            listings: TtlCache::default(),
            global: TtlCache::default(),
            charts: TtlCache::default(),
        }
    }

    /// Settings in effect.
    pub fn settings(&self) -> &MarketSettings {
        &self.settings
    }

    fn map_source_error(error: MarketDataSourceError) -> Error {
        match error {
            MarketDataSourceError::RateLimited { .. }
            | MarketDataSourceError::Timeout { .. }
            | MarketDataSourceError::Transport { .. } => {
                Error::service_unavailable(error.to_string())
            }
            MarketDataSourceError::InvalidRequest { .. } => {
                Error::invalid_request(error.to_string())
            }
            MarketDataSourceError::Decode { .. } => Error::internal(error.to_string()),
        }
    }

    /// One page of coins by market capitalisation.
    pub async fn top_coins(&self, page: u32, per_page: u32) -> Result<Vec<Coin>, Error> {
        if page == 0 {
            return Err(Error::invalid_request("page must be at least 1"));
        }
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(Error::invalid_request(format!(
                "perPage must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        let query = MarketListingQuery {
            vs_currency: self.settings.vs_currency.clone(),
            page,
            per_page,
        };
        let now = self.clock.utc();
        if let Some(coins) = self.listings.get(&query, now, self.settings.stale_after) {
            debug!(page, per_page, "serving cached market listing");
            return Ok(coins);
        }
        let coins = self
            .source
            .top_coins(&query)
            .await
            .map_err(Self::map_source_error)?;
        self.listings
            .put(query, self.clock.utc(), self.settings.stale_after, coins.clone());
        Ok(coins)
    }

    /// First listing page at the configured page size.
    pub async fn first_page(&self) -> Result<Vec<Coin>, Error> {
        self.top_coins(1, self.settings.per_page).await
    }

    /// Global market statistics.
    pub async fn global_stats(&self) -> Result<MarketStats, Error> {
        let now = self.clock.utc();
        if let Some(stats) = self.global.get(&(), now, self.settings.stale_after) {
            return Ok(stats);
        }
        let stats = self
            .source
            .global_stats()
            .await
            .map_err(Self::map_source_error)?;
        self.global
            .put((), self.clock.utc(), self.settings.stale_after, stats.clone());
        Ok(stats)
    }

    /// Historical series for `coin`.
    pub async fn chart(&self, coin: &CoinId, timeframe: TimeFrame) -> Result<ChartData, Error> {
        let key = (coin.clone(), timeframe);
        let now = self.clock.utc();
        if let Some(chart) = self.charts.get(&key, now, self.settings.stale_after) {
            return Ok(chart);
        }
        let chart = self
            .source
            .market_chart(coin, &self.settings.vs_currency, timeframe)
            .await
            .map_err(Self::map_source_error)?;
        self.charts
            .put(key, self.clock.utc(), self.settings.stale_after, chart.clone());
        Ok(chart)
    }

    /// Look a coin up in the first listing page.
    pub async fn find_coin(&self, coin: &CoinId) -> Result<Coin, Error> {
        self.first_page()
            .await?
            .into_iter()
            .find(|candidate| &candidate.id == coin)
            .ok_or_else(|| Error::not_found(format!("coin {coin} is not listed")))
    }

    /// Coins in the first listing page whose name or symbol contains `term`.
    pub async fn search(&self, term: &str) -> Result<Vec<Coin>, Error> {
        let coins = self.first_page().await?;
        Ok(coins.into_iter().filter(|coin| coin.matches(term)).collect())
    }

    /// First listing page filtered to `watchlist`, in market-cap order.
    pub async fn watched_coins(&self, watchlist: &[CoinId]) -> Result<Vec<Coin>, Error> {
        if watchlist.is_empty() {
            return Ok(Vec::new());
        }
        let coins = self.first_page().await?;
        Ok(watched_coins(coins, watchlist))
    }
}
