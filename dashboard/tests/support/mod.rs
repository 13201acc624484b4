//! Shared test doubles for integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashboard::domain::ports::{WatchlistStore, WatchlistStoreError};
use dashboard::domain::{CoinId, DeleteOutcome, UserId};
use tokio::sync::Notify;

pub fn coin(raw: &str) -> CoinId {
    CoinId::new(raw).expect("valid coin id")
}

pub fn coins(raw: &[&str]) -> Vec<CoinId> {
    raw.iter().map(|id| coin(id)).collect()
}

pub fn user(raw: &str) -> UserId {
    UserId::new(raw).expect("valid user id")
}

/// A call observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List(UserId),
    Insert(UserId, CoinId),
    Delete(UserId, CoinId),
}

/// Store double that records every call and answers from scripted results.
///
/// Listings for a user can be held back with [`RecordingStore::hold_listing`]
/// until the returned gate is notified.
#[derive(Default)]
pub struct RecordingStore {
    listings: Mutex<HashMap<UserId, Vec<CoinId>>>,
    calls: Mutex<Vec<StoreCall>>,
    insert_failure: Mutex<Option<WatchlistStoreError>>,
    delete_result: Mutex<Option<Result<DeleteOutcome, WatchlistStoreError>>>,
    listing_gates: Mutex<HashMap<UserId, Arc<Notify>>>,
}

impl RecordingStore {
    pub fn with_listing(user: &UserId, items: &[&str]) -> Self {
        let store = Self::default();
        store.set_listing(user, items);
        store
    }

    pub fn set_listing(&self, user: &UserId, items: &[&str]) {
        self.listings
            .lock()
            .expect("listings lock")
            .insert(user.clone(), coins(items));
    }

    pub fn fail_next_insert(&self, error: WatchlistStoreError) {
        *self.insert_failure.lock().expect("insert lock") = Some(error);
    }

    pub fn next_delete(&self, result: Result<DeleteOutcome, WatchlistStoreError>) {
        *self.delete_result.lock().expect("delete lock") = Some(result);
    }

    /// Hold listings for `user` until the returned gate is notified.
    pub fn hold_listing(&self, user: &UserId) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.listing_gates
            .lock()
            .expect("gate lock")
            .insert(user.clone(), Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !matches!(call, StoreCall::List(_)))
            .count()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl WatchlistStore for RecordingStore {
    async fn list_items(&self, user: &UserId) -> Result<Vec<CoinId>, WatchlistStoreError> {
        self.record(StoreCall::List(user.clone()));
        let gate = self.listing_gates.lock().expect("gate lock").get(user).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self
            .listings
            .lock()
            .expect("listings lock")
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_item(&self, user: &UserId, coin: &CoinId) -> Result<(), WatchlistStoreError> {
        self.record(StoreCall::Insert(user.clone(), coin.clone()));
        match self.insert_failure.lock().expect("insert lock").take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn delete_item(
        &self,
        user: &UserId,
        coin: &CoinId,
    ) -> Result<DeleteOutcome, WatchlistStoreError> {
        self.record(StoreCall::Delete(user.clone(), coin.clone()));
        self.delete_result
            .lock()
            .expect("delete lock")
            .take()
            .unwrap_or(Ok(DeleteOutcome::Deleted))
    }
}
