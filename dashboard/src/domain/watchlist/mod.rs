//! Watchlist membership: which coins the signed-in user follows.
//!
//! [`WatchlistService`] owns the in-memory membership for the active user and
//! reconciles it with the remote store. Mutations report failures as
//! [`WatchlistOutcome`] values rather than errors so the view layer can show
//! the message and move on.

mod service;
mod state;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{CoinId, UserId};

pub use service::WatchlistService;
pub use state::MembershipState;

/// A persisted `(user, coin)` membership pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchlistRecord {
    /// Owner of the record.
    pub user: UserId,
    /// Followed coin.
    pub coin: CoinId,
}

impl WatchlistRecord {
    /// Build a record for the pair.
    pub fn new(user: UserId, coin: CoinId) -> Self {
        Self { user, coin }
    }
}

/// Result of a remote delete matched on the exact `(user, coin)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// At least one matching record was removed.
    Deleted,
    /// No record matched the pair.
    NotFound,
}

/// What a watchlist mutation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The coin was added and the remote store confirmed it.
    Added,
    /// The coin was already followed; nothing was sent.
    AlreadyPresent,
    /// The coin was removed and the remote store confirmed it.
    Removed,
    /// The remote store had no record for the pair.
    NotFound,
    /// Nobody is signed in.
    Unauthenticated,
    /// The membership for the current user is still loading.
    Syncing,
    /// Another change to the same coin has not finished yet.
    InFlight,
    /// The remote store rejected or failed the request.
    RemoteFailure,
}

impl OutcomeKind {
    /// Whether the outcome counts as success for the caller.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Added | Self::AlreadyPresent | Self::Removed)
    }
}

/// Value returned by every watchlist mutation.
///
/// ## Invariants
/// - `success` always equals `kind.is_success()`.
///
/// # Examples
/// ```
/// use dashboard::domain::{CoinId, OutcomeKind, WatchlistOutcome};
///
/// let coin = CoinId::new("bitcoin").unwrap();
/// let outcome = WatchlistOutcome::added(&coin);
/// assert!(outcome.success());
/// assert_eq!(outcome.kind(), OutcomeKind::Added);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistOutcome {
    success: bool,
    message: String,
    kind: OutcomeKind,
}

impl WatchlistOutcome {
    fn new(kind: OutcomeKind, message: String) -> Self {
        Self {
            success: kind.is_success(),
            message,
            kind,
        }
    }

    /// Remote insert confirmed.
    pub fn added(coin: &CoinId) -> Self {
        Self::new(
            OutcomeKind::Added,
            format!("{coin} added to watchlist successfully."),
        )
    }

    /// Coin already followed.
    pub fn already_present(coin: &CoinId) -> Self {
        Self::new(
            OutcomeKind::AlreadyPresent,
            format!("{coin} is already in watchlist"),
        )
    }

    /// Remote delete confirmed.
    pub fn removed(coin: &CoinId) -> Self {
        Self::new(
            OutcomeKind::Removed,
            format!("{coin} removed from watchlist successfully."),
        )
    }

    /// Remote delete matched nothing.
    pub fn not_found(coin: &CoinId) -> Self {
        Self::new(
            OutcomeKind::NotFound,
            format!("{coin} not found in watchlist."),
        )
    }

    /// No active user.
    pub fn unauthenticated() -> Self {
        Self::new(
            OutcomeKind::Unauthenticated,
            "Sign in to manage your watchlist.".to_owned(),
        )
    }

    /// Membership still loading for the active user.
    pub fn syncing() -> Self {
        Self::new(
            OutcomeKind::Syncing,
            "Watchlist is still loading; try again shortly.".to_owned(),
        )
    }

    /// Another mutation for the coin is outstanding.
    pub fn in_flight(coin: &CoinId) -> Self {
        Self::new(
            OutcomeKind::InFlight,
            format!("A change to {coin} is already in progress."),
        )
    }

    /// Remote insert failed.
    pub fn add_failed(coin: &CoinId) -> Self {
        Self::new(
            OutcomeKind::RemoteFailure,
            format!("Failed to add {coin} to watchlist."),
        )
    }

    /// Remote delete failed.
    pub fn remove_failed(coin: &CoinId) -> Self {
        Self::new(
            OutcomeKind::RemoteFailure,
            format!("Failed to remove {coin} from watchlist."),
        )
    }

    /// Whether the caller should treat the call as successful.
    pub fn success(&self) -> bool {
        self.success
    }

    /// Message suitable for a transient notification.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Machine-readable outcome.
    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }
}

/// How local state treats remote write failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationPolicy {
    /// Apply both adds and removals locally before the remote call and undo
    /// them when the remote call fails or matches nothing.
    #[default]
    Rollback,
    /// Apply adds locally without undo; apply removals only after the remote
    /// store confirms them.
    ConfirmRemovals,
}

/// Error returned when parsing an unknown [`MutationPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("mutation policy must be `rollback` or `confirm-removals` (got {0:?})")]
pub struct MutationPolicyParseError(pub String);

impl FromStr for MutationPolicy {
    type Err = MutationPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "rollback" => Ok(Self::Rollback),
            "confirm-removals" => Ok(Self::ConfirmRemovals),
            other => Err(MutationPolicyParseError(other.to_owned())),
        }
    }
}

impl fmt::Display for MutationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rollback => f.write_str("rollback"),
            Self::ConfirmRemovals => f.write_str("confirm-removals"),
        }
    }
}

/// Lifecycle of the membership for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nobody is signed in; the watchlist is empty.
    Unauthenticated,
    /// A user is signed in and their membership is being fetched.
    Loading,
    /// The membership for the signed-in user is available.
    Ready,
}

/// Read-only view of the membership handed to the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistSnapshot {
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Active user, if any.
    pub user: Option<UserId>,
    /// Followed coins in insertion order.
    pub items: Vec<CoinId>,
}

/// Handle for an outstanding resynchronisation fetch.
///
/// Produced by [`WatchlistService::begin_resync`]; the result is only applied
/// while no newer identity transition has happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResyncTicket {
    user: UserId,
    generation: u64,
}

impl ResyncTicket {
    /// User whose membership is being fetched.
    pub fn user(&self) -> &UserId {
        &self.user
    }
}

/// What a resynchronisation did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncOutcome {
    /// Identity became absent; state cleared without a remote call.
    SignedOut,
    /// Remote membership replaced local state.
    Loaded {
        /// Number of distinct coins loaded.
        items: usize,
    },
    /// Remote listing failed; state reset to empty.
    FailedOpen,
    /// A newer identity transition superseded this fetch; nothing changed.
    Stale,
}
