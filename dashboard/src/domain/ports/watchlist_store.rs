//! Port for the remote per-user watchlist record store.
//!
//! The store is a flat collection of `(user, coin)` records. Adapters provide
//! listing by user, insertion, and deletion matched on the exact pair. The
//! store is not required to enforce uniqueness; callers guard against
//! duplicate inserts.

use async_trait::async_trait;

use crate::domain::{CoinId, DeleteOutcome, UserId, WatchlistRecord};

use super::define_port_error;

define_port_error! {
    /// Errors raised by watchlist store adapters.
    pub enum WatchlistStoreError {
        /// The store could not be reached.
        Connection { message: String } =>
            "watchlist store connection failed: {message}",
        /// The store rejected the credentials for the request.
        PermissionDenied { message: String } =>
            "watchlist store denied access: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "watchlist store query failed: {message}",
        /// The store answered with a payload we could not decode.
        Decode { message: String } =>
            "watchlist store response could not be decoded: {message}",
    }
}

/// Port for watchlist record storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    /// List the coins recorded for `user`, in storage order.
    ///
    /// The result may contain duplicates if the store holds them.
    async fn list_items(&self, user: &UserId) -> Result<Vec<CoinId>, WatchlistStoreError>;

    /// Record that `user` follows `coin`.
    async fn insert_item(&self, user: &UserId, coin: &CoinId) -> Result<(), WatchlistStoreError>;

    /// Delete every record matching the exact `(user, coin)` pair.
    async fn delete_item(
        &self,
        user: &UserId,
        coin: &CoinId,
    ) -> Result<DeleteOutcome, WatchlistStoreError>;
}

/// Fixture implementation that stores nothing.
///
/// Listing is always empty, inserts succeed, and deletes never match. Use it
/// where watchlist persistence is not under test.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureWatchlistStore;

#[async_trait]
impl WatchlistStore for FixtureWatchlistStore {
    async fn list_items(&self, _user: &UserId) -> Result<Vec<CoinId>, WatchlistStoreError> {
        Ok(Vec::new())
    }

    async fn insert_item(&self, _user: &UserId, _coin: &CoinId) -> Result<(), WatchlistStoreError> {
        Ok(())
    }

    async fn delete_item(
        &self,
        _user: &UserId,
        _coin: &CoinId,
    ) -> Result<DeleteOutcome, WatchlistStoreError> {
        Ok(DeleteOutcome::NotFound)
    }
}

/// Convenience for adapters that keep whole records.
pub fn records_for<'a>(
    records: impl IntoIterator<Item = &'a WatchlistRecord>,
    user: &UserId,
) -> Vec<CoinId> {
    records
        .into_iter()
        .filter(|record| &record.user == user)
        .map(|record| record.coin.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("u1").expect("valid user")
    }

    fn coin() -> CoinId {
        CoinId::new("bitcoin").expect("valid coin")
    }

    #[tokio::test]
    async fn fixture_store_lists_nothing() {
        let store = FixtureWatchlistStore;
        let items = store.list_items(&user()).await.expect("fixture list");
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn fixture_store_accepts_inserts_and_never_matches_deletes() {
        let store = FixtureWatchlistStore;
        store
            .insert_item(&user(), &coin())
            .await
            .expect("fixture insert");
        let outcome = store
            .delete_item(&user(), &coin())
            .await
            .expect("fixture delete");
        assert_eq!(outcome, DeleteOutcome::NotFound);
    }

    #[test]
    fn records_for_filters_by_owner() {
        let other = UserId::new("u2").expect("valid user");
        let records = vec![
            WatchlistRecord::new(user(), coin()),
            WatchlistRecord::new(other, CoinId::new("ethereum").expect("valid coin")),
        ];
        assert_eq!(records_for(&records, &user()), vec![coin()]);
    }

    #[test]
    fn error_messages_include_context() {
        let error = WatchlistStoreError::permission_denied("missing token");
        assert_eq!(
            error.to_string(),
            "watchlist store denied access: missing token"
        );
    }
}
