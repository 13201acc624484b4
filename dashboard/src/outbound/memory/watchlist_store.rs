//! Watchlist records held in a vector.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{WatchlistStore, WatchlistStoreError, records_for};
use crate::domain::{CoinId, DeleteOutcome, UserId, WatchlistRecord};

/// Flat record collection mirroring the hosted store's shape, duplicates
/// included.
#[derive(Debug, Default)]
pub struct InMemoryWatchlistStore {
    records: Mutex<Vec<WatchlistRecord>>,
}

impl InMemoryWatchlistStore {
    /// Store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = WatchlistRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().collect()),
        }
    }

    /// Copy of every stored record.
    pub fn records(&self) -> Vec<WatchlistRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl WatchlistStore for InMemoryWatchlistStore {
    async fn list_items(&self, user: &UserId) -> Result<Vec<CoinId>, WatchlistStoreError> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records_for(records.iter(), user))
    }

    async fn insert_item(&self, user: &UserId, coin: &CoinId) -> Result<(), WatchlistStoreError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(WatchlistRecord::new(user.clone(), coin.clone()));
        Ok(())
    }

    async fn delete_item(
        &self,
        user: &UserId,
        coin: &CoinId,
    ) -> Result<DeleteOutcome, WatchlistStoreError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|record| !(&record.user == user && &record.coin == coin));
        Ok(if records.len() < before {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }
}
