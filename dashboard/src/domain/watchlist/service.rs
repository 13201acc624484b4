//! Membership service reconciling local state with the remote store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{
    DeleteOutcome, MembershipState, MutationPolicy, ResyncOutcome, ResyncTicket, SessionPhase,
    WatchlistOutcome, WatchlistSnapshot,
};
use crate::domain::ports::{WatchlistMembership, WatchlistStore};
use crate::domain::{CoinId, UserId};

/// Watchlist membership for the active user.
///
/// Local state is updated before the remote call returns so views reflect a
/// mutation immediately. The lock is never held across an await; completions
/// re-check the identity generation before touching state.
///
/// Each remote write and its reconciliation run in a spawned Tokio task, so
/// a caller that stops polling (a disconnected HTTP client, a timeout) never
/// leaves an optimistic change without its completion. Mutations must be
/// called from within a Tokio runtime.
pub struct WatchlistService<S: ?Sized> {
    store: Arc<S>,
    state: Arc<Mutex<MembershipState>>,
    policy: MutationPolicy,
}

impl<S: ?Sized> Clone for WatchlistService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
            policy: self.policy,
        }
    }
}

/// Clears a coin's in-flight mark when the mutation finishes or is dropped.
struct PendingMark {
    state: Arc<Mutex<MembershipState>>,
    coin: CoinId,
    generation: u64,
}

impl Drop for PendingMark {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation() == self.generation {
            state.clear_pending(&self.coin);
        }
    }
}

impl<S> WatchlistService<S>
where
    S: WatchlistStore + ?Sized + 'static,
{
    /// Create a signed-out service backed by `store`.
    pub fn new(store: Arc<S>, policy: MutationPolicy) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(MembershipState::default())),
            policy,
        }
    }

    /// Policy applied to remote write failures.
    pub fn policy(&self) -> MutationPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, MembershipState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve the user a mutation applies to, rejecting it when nobody is
    /// ready or the coin already has a change outstanding.
    fn admit(state: &MembershipState, coin: &CoinId) -> Result<UserId, WatchlistOutcome> {
        let Some(user) = state.ready_user() else {
            return Err(match state.phase() {
                SessionPhase::Loading => WatchlistOutcome::syncing(),
                SessionPhase::Unauthenticated | SessionPhase::Ready => {
                    WatchlistOutcome::unauthenticated()
                }
            });
        };
        if state.is_pending(coin) {
            return Err(WatchlistOutcome::in_flight(coin));
        }
        Ok(user.clone())
    }

    fn mark_pending(&self, state: &mut MembershipState, coin: &CoinId) -> PendingMark {
        state.mark_pending(coin.clone());
        PendingMark {
            state: Arc::clone(&self.state),
            coin: coin.clone(),
            generation: state.generation(),
        }
    }

    /// Follow `coin` for the active user.
    pub async fn add(&self, coin: CoinId) -> WatchlistOutcome {
        let (user, mark) = {
            let mut state = self.lock();
            let user = match Self::admit(&state, &coin) {
                Ok(user) => user,
                Err(outcome) => return outcome,
            };
            if state.contains(&coin) {
                return WatchlistOutcome::already_present(&coin);
            }
            let mark = self.mark_pending(&mut state, &coin);
            state.push(coin.clone());
            (user, mark)
        };

        let service = self.clone();
        let task_coin = coin.clone();
        tokio::spawn(async move { service.complete_add(user, task_coin, mark).await })
            .await
            .unwrap_or_else(|error| {
                warn!(%coin, %error, "watchlist add task did not finish");
                WatchlistOutcome::add_failed(&coin)
            })
    }

    async fn complete_add(
        &self,
        user: UserId,
        coin: CoinId,
        mark: PendingMark,
    ) -> WatchlistOutcome {
        let result = self.store.insert_item(&user, &coin).await;

        let mut state = self.lock();
        if state.generation() != mark.generation {
            debug!(%user, %coin, "identity changed during add; discarding completion");
            return match result {
                Ok(()) => WatchlistOutcome::added(&coin),
                Err(_) => WatchlistOutcome::add_failed(&coin),
            };
        }
        let outcome = match result {
            Ok(()) => {
                info!(%user, %coin, "added to watchlist");
                WatchlistOutcome::added(&coin)
            }
            Err(error) => {
                warn!(%user, %coin, %error, "watchlist insert failed");
                if self.policy == MutationPolicy::Rollback {
                    state.remove(&coin);
                }
                WatchlistOutcome::add_failed(&coin)
            }
        };
        drop(state);
        drop(mark);
        outcome
    }

    /// Stop following `coin` for the active user.
    pub async fn remove(&self, coin: CoinId) -> WatchlistOutcome {
        let (user, mark, position) = {
            let mut state = self.lock();
            let user = match Self::admit(&state, &coin) {
                Ok(user) => user,
                Err(outcome) => return outcome,
            };
            let mark = self.mark_pending(&mut state, &coin);
            let position = match self.policy {
                MutationPolicy::Rollback => state.remove(&coin),
                MutationPolicy::ConfirmRemovals => None,
            };
            (user, mark, position)
        };

        let service = self.clone();
        let task_coin = coin.clone();
        tokio::spawn(async move {
            service
                .complete_remove(user, task_coin, mark, position)
                .await
        })
        .await
        .unwrap_or_else(|error| {
            warn!(%coin, %error, "watchlist remove task did not finish");
            WatchlistOutcome::remove_failed(&coin)
        })
    }

    async fn complete_remove(
        &self,
        user: UserId,
        coin: CoinId,
        mark: PendingMark,
        position: Option<usize>,
    ) -> WatchlistOutcome {
        let result = self.store.delete_item(&user, &coin).await;

        let mut state = self.lock();
        if state.generation() != mark.generation {
            debug!(%user, %coin, "identity changed during remove; discarding completion");
            return match result {
                Ok(DeleteOutcome::Deleted) => WatchlistOutcome::removed(&coin),
                Ok(DeleteOutcome::NotFound) => WatchlistOutcome::not_found(&coin),
                Err(_) => WatchlistOutcome::remove_failed(&coin),
            };
        }
        let outcome = match result {
            Ok(DeleteOutcome::Deleted) => {
                info!(%user, %coin, "removed from watchlist");
                state.remove(&coin);
                WatchlistOutcome::removed(&coin)
            }
            Ok(DeleteOutcome::NotFound) => {
                info!(%user, %coin, "watchlist delete matched no record");
                if let Some(position) = position {
                    state.restore(position, coin.clone());
                }
                WatchlistOutcome::not_found(&coin)
            }
            Err(error) => {
                warn!(%user, %coin, %error, "watchlist delete failed");
                if let Some(position) = position {
                    state.restore(position, coin.clone());
                }
                WatchlistOutcome::remove_failed(&coin)
            }
        };
        drop(state);
        drop(mark);
        outcome
    }

    /// Apply an identity transition synchronously.
    ///
    /// Items are cleared immediately. Returns a ticket for the remote fetch
    /// when a user is signed in, or `None` after a sign-out.
    pub fn begin_resync(&self, user: Option<&UserId>) -> Option<ResyncTicket> {
        let mut state = self.lock();
        let generation = state.transition(user.cloned());
        match user {
            Some(user) => {
                debug!(%user, generation, "loading watchlist");
                Some(ResyncTicket {
                    user: user.clone(),
                    generation,
                })
            }
            None => {
                info!(generation, "signed out; watchlist cleared");
                None
            }
        }
    }

    /// Fetch the membership for `ticket` and install it if still current.
    pub async fn complete_resync(&self, ticket: ResyncTicket) -> ResyncOutcome {
        let result = self.store.list_items(&ticket.user).await;

        let mut state = self.lock();
        if state.generation() != ticket.generation {
            debug!(
                user = %ticket.user,
                generation = ticket.generation,
                "discarding stale watchlist listing"
            );
            return ResyncOutcome::Stale;
        }
        match result {
            Ok(items) => {
                let items = state.load(items);
                info!(user = %ticket.user, items, "watchlist loaded");
                ResyncOutcome::Loaded { items }
            }
            Err(error) => {
                warn!(user = %ticket.user, %error, "watchlist listing failed; starting empty");
                state.load_empty();
                ResyncOutcome::FailedOpen
            }
        }
    }

    /// Transition to `user` and load their membership.
    pub async fn resynchronize(&self, user: Option<&UserId>) -> ResyncOutcome {
        match self.begin_resync(user) {
            Some(ticket) => self.complete_resync(ticket).await,
            None => ResyncOutcome::SignedOut,
        }
    }

    /// Identity the membership currently belongs to.
    pub fn current_user(&self) -> Option<UserId> {
        self.lock().user().cloned()
    }
}

#[async_trait]
impl<S> WatchlistMembership for WatchlistService<S>
where
    S: WatchlistStore + ?Sized + 'static,
{
    fn watchlist(&self) -> Vec<CoinId> {
        self.lock().items().to_vec()
    }

    fn is_in_watchlist(&self, coin: &CoinId) -> bool {
        self.lock().contains(coin)
    }

    fn snapshot(&self) -> WatchlistSnapshot {
        self.lock().snapshot()
    }

    async fn add_to_watchlist(&self, coin: CoinId) -> WatchlistOutcome {
        self.add(coin).await
    }

    async fn remove_from_watchlist(&self, coin: CoinId) -> WatchlistOutcome {
        self.remove(coin).await
    }
}
