//! Keeps the watchlist membership in step with the signed-in identity.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::ports::{IdentityProvider, WatchlistStore};
use crate::domain::{UserId, UserIdentity, WatchlistService};

/// Handle to the background identity subscription.
///
/// Dropping the handle stops the subscription.
#[derive(Debug)]
pub struct IdentitySync {
    task: JoinHandle<()>,
}

impl IdentitySync {
    /// Stop reacting to identity changes.
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    /// Whether the subscription task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for IdentitySync {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn uid_of(identity: Option<&UserIdentity>) -> Option<UserId> {
    identity.map(|identity| identity.uid().clone())
}

/// Apply `user` to the service and fetch its membership in a separate task.
fn apply<S>(service: &WatchlistService<S>, user: Option<&UserId>)
where
    S: WatchlistStore + ?Sized + 'static,
{
    if let Some(ticket) = service.begin_resync(user) {
        let service = service.clone();
        tokio::spawn(async move {
            let outcome = service.complete_resync(ticket).await;
            debug!(?outcome, "watchlist resynchronised");
        });
    }
}

/// Subscribe `service` to identity changes published by `provider`.
///
/// The current identity is applied before this returns; later transitions
/// are applied by a background task. Re-publishing the same user id does not
/// trigger a reload. Must be called from within a Tokio runtime.
pub fn spawn_identity_sync<S, P>(service: WatchlistService<S>, provider: &P) -> IdentitySync
where
    S: WatchlistStore + ?Sized + 'static,
    P: IdentityProvider + ?Sized,
{
    let mut receiver = provider.subscribe();
    let mut current = uid_of(receiver.borrow_and_update().as_ref());
    apply(&service, current.as_ref());

    let task = tokio::spawn(async move {
        while receiver.changed().await.is_ok() {
            let next = uid_of(receiver.borrow_and_update().as_ref());
            if next == current {
                debug!("identity re-published unchanged; skipping reload");
                continue;
            }
            apply(&service, next.as_ref());
            current = next;
        }
        debug!("identity channel closed; stopping watchlist sync");
    });

    IdentitySync { task }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::domain::ports::{
        IdentityBroadcaster, MockIdentityProvider, MockWatchlistStore, WatchlistMembership,
    };
    use crate::domain::{CoinId, MutationPolicy, SessionPhase};

    fn identity(uid: &str) -> UserIdentity {
        UserIdentity::new(UserId::new(uid).expect("valid uid"), None)
    }

    fn provider_for(broadcaster: &IdentityBroadcaster) -> MockIdentityProvider {
        let receiver = broadcaster.subscribe();
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_subscribe()
            .times(1)
            .returning(move || receiver.clone());
        provider
    }

    async fn eventually(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition reached");
    }

    fn store_listing(uid: &'static str, coin: &'static str, times: usize) -> MockWatchlistStore {
        let mut store = MockWatchlistStore::new();
        store
            .expect_list_items()
            .withf(move |user| user.as_ref() == uid)
            .times(times)
            .returning(move |_| Ok(vec![CoinId::new(coin).expect("valid coin")]));
        store
    }

    #[tokio::test]
    async fn signed_out_start_stays_unauthenticated() {
        let broadcaster = IdentityBroadcaster::default();
        let provider = provider_for(&broadcaster);
        let service = WatchlistService::new(
            Arc::new(MockWatchlistStore::new()),
            MutationPolicy::Rollback,
        );

        let _sync = spawn_identity_sync(service.clone(), &provider);

        assert_eq!(service.snapshot().phase, SessionPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn follows_sign_in_and_sign_out() {
        let broadcaster = IdentityBroadcaster::default();
        broadcaster.publish(Some(identity("u1")));
        let provider = provider_for(&broadcaster);
        let service = WatchlistService::new(
            Arc::new(store_listing("u1", "bitcoin", 1)),
            MutationPolicy::Rollback,
        );

        let _sync = spawn_identity_sync(service.clone(), &provider);
        assert_eq!(service.snapshot().phase, SessionPhase::Loading);
        eventually(|| service.snapshot().phase == SessionPhase::Ready).await;
        assert_eq!(service.watchlist().len(), 1);

        broadcaster.publish(None);
        eventually(|| service.snapshot().phase == SessionPhase::Unauthenticated).await;
        assert!(service.watchlist().is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_stops_following_identity() {
        let broadcaster = IdentityBroadcaster::default();
        let provider = provider_for(&broadcaster);
        let service = WatchlistService::new(
            Arc::new(MockWatchlistStore::new()),
            MutationPolicy::Rollback,
        );

        let sync = spawn_identity_sync(service.clone(), &provider);
        sync.unsubscribe();
        tokio::task::yield_now().await;

        broadcaster.publish(Some(identity("u1")));
        tokio::task::yield_now().await;
        assert_eq!(service.snapshot().phase, SessionPhase::Unauthenticated);
    }
}
