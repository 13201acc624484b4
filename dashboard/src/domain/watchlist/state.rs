//! In-memory membership for the active user.

use std::collections::HashSet;

use super::{SessionPhase, WatchlistSnapshot};
use crate::domain::{CoinId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Unauthenticated,
    Loading(UserId),
    Ready(UserId),
}

/// Ordered set of followed coins plus the bookkeeping needed to reconcile it.
///
/// ## Invariants
/// - `items` holds no duplicates and `index` contains exactly its elements.
/// - `items` is empty unless the phase is `Ready`.
/// - `generation` increases on every identity transition; `pending` only
///   tracks mutations started under the current generation.
#[derive(Debug)]
pub struct MembershipState {
    phase: Phase,
    items: Vec<CoinId>,
    index: HashSet<CoinId>,
    pending: HashSet<CoinId>,
    generation: u64,
}

impl Default for MembershipState {
    fn default() -> Self {
        Self {
            phase: Phase::Unauthenticated,
            items: Vec::new(),
            index: HashSet::new(),
            pending: HashSet::new(),
            generation: 0,
        }
    }
}

impl MembershipState {
    /// O(1) membership check.
    pub fn contains(&self, coin: &CoinId) -> bool {
        self.index.contains(coin)
    }

    /// Followed coins in insertion order.
    pub fn items(&self) -> &[CoinId] {
        &self.items
    }

    /// Generation of the current identity.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        match self.phase {
            Phase::Unauthenticated => SessionPhase::Unauthenticated,
            Phase::Loading(_) => SessionPhase::Loading,
            Phase::Ready(_) => SessionPhase::Ready,
        }
    }

    /// Signed-in user, whether loading or ready.
    pub fn user(&self) -> Option<&UserId> {
        match &self.phase {
            Phase::Unauthenticated => None,
            Phase::Loading(user) | Phase::Ready(user) => Some(user),
        }
    }

    /// User whose membership may be mutated right now.
    pub(super) fn ready_user(&self) -> Option<&UserId> {
        match &self.phase {
            Phase::Ready(user) => Some(user),
            _ => None,
        }
    }

    /// Copy the state for the view layer.
    pub fn snapshot(&self) -> WatchlistSnapshot {
        WatchlistSnapshot {
            phase: self.phase(),
            user: self.user().cloned(),
            items: self.items.clone(),
        }
    }

    /// Start a new identity generation, dropping items and pending marks.
    pub(super) fn transition(&mut self, user: Option<UserId>) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.clear_items();
        self.pending.clear();
        self.phase = user.map_or(Phase::Unauthenticated, Phase::Loading);
        self.generation
    }

    /// Install the fetched membership, collapsing duplicates.
    pub(super) fn load(&mut self, items: Vec<CoinId>) -> usize {
        self.clear_items();
        for coin in items {
            self.push(coin);
        }
        self.mark_ready();
        self.items.len()
    }

    /// Resolve loading with an empty membership.
    pub(super) fn load_empty(&mut self) {
        self.clear_items();
        self.mark_ready();
    }

    /// Append a coin; returns `false` if it was already present.
    pub(super) fn push(&mut self, coin: CoinId) -> bool {
        if !self.index.insert(coin.clone()) {
            return false;
        }
        self.items.push(coin);
        true
    }

    /// Remove a coin, returning its former position.
    pub(super) fn remove(&mut self, coin: &CoinId) -> Option<usize> {
        if !self.index.remove(coin) {
            return None;
        }
        let position = self.items.iter().position(|item| item == coin)?;
        self.items.remove(position);
        Some(position)
    }

    /// Put a coin back at (or as close as possible to) its former position.
    pub(super) fn restore(&mut self, position: usize, coin: CoinId) {
        if !self.index.insert(coin.clone()) {
            return;
        }
        let position = position.min(self.items.len());
        self.items.insert(position, coin);
    }

    pub(super) fn is_pending(&self, coin: &CoinId) -> bool {
        self.pending.contains(coin)
    }

    pub(super) fn mark_pending(&mut self, coin: CoinId) {
        self.pending.insert(coin);
    }

    pub(super) fn clear_pending(&mut self, coin: &CoinId) {
        self.pending.remove(coin);
    }

    fn mark_ready(&mut self) {
        if let Phase::Loading(user) = &self.phase {
            self.phase = Phase::Ready(user.clone());
        }
    }

    fn clear_items(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(raw: &str) -> CoinId {
        CoinId::new(raw).expect("valid coin id")
    }

    fn user(raw: &str) -> UserId {
        UserId::new(raw).expect("valid user id")
    }

    fn ready_state(items: &[&str]) -> MembershipState {
        let mut state = MembershipState::default();
        state.transition(Some(user("u1")));
        state.load(items.iter().map(|raw| coin(raw)).collect());
        state
    }

    #[test]
    fn starts_unauthenticated_and_empty() {
        let state = MembershipState::default();
        assert_eq!(state.phase(), SessionPhase::Unauthenticated);
        assert!(state.items().is_empty());
        assert!(state.user().is_none());
    }

    #[test]
    fn load_collapses_duplicates_keeping_first_position() {
        let state = ready_state(&["bitcoin", "ethereum", "bitcoin"]);
        assert_eq!(state.items(), &[coin("bitcoin"), coin("ethereum")]);
        assert_eq!(state.phase(), SessionPhase::Ready);
    }

    #[test]
    fn restore_returns_item_to_original_position() {
        let mut state = ready_state(&["bitcoin", "ethereum", "dogecoin"]);
        let position = state.remove(&coin("ethereum")).expect("present");
        assert_eq!(position, 1);
        state.restore(position, coin("ethereum"));
        assert_eq!(
            state.items(),
            &[coin("bitcoin"), coin("ethereum"), coin("dogecoin")]
        );
    }

    #[test]
    fn transition_bumps_generation_and_clears_everything() {
        let mut state = ready_state(&["bitcoin"]);
        state.mark_pending(coin("bitcoin"));
        let before = state.generation();

        let after = state.transition(Some(user("u2")));

        assert!(after > before);
        assert!(state.items().is_empty());
        assert!(!state.contains(&coin("bitcoin")));
        assert!(!state.is_pending(&coin("bitcoin")));
        assert_eq!(state.phase(), SessionPhase::Loading);
        assert!(state.ready_user().is_none());
    }

    #[test]
    fn load_after_sign_out_stays_unauthenticated() {
        let mut state = MembershipState::default();
        state.transition(None);
        state.load_empty();
        assert_eq!(state.phase(), SessionPhase::Unauthenticated);
    }
}
