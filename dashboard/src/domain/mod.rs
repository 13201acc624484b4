//! Domain primitives, services, and ports.
//!
//! Purpose: Define the watchlist membership core and the market read models
//! it is shown alongside. Adapters live in `outbound` and `inbound`; nothing
//! in this module performs I/O directly.
//!
//! Public surface:
//! - Error (alias to `error::Error`): API error response payload.
//! - CoinId, UserId, UserIdentity, Credentials: validated identifiers.
//! - WatchlistService: membership state reconciled with the remote store.
//! - MarketDataService: cached market listing, statistics, and charts.
//! - spawn_identity_sync: drives resynchronisation from identity changes.

pub mod auth;
pub mod coin;
pub mod error;
pub mod identity_sync;
pub mod market;
pub mod market_service;
pub mod ports;
pub mod user;
pub mod watchlist;

pub use self::auth::{Credentials, CredentialsValidationError};
pub use self::coin::{COIN_ID_MAX, CoinId, CoinIdValidationError};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identity_sync::{IdentitySync, spawn_identity_sync};
pub use self::market::{
    ChartData, Coin, MarketListingQuery, MarketStats, SeriesPoint, TimeFrame,
    TimeFrameParseError, watched_coins,
};
pub use self::market_service::{MAX_PER_PAGE, MarketDataService, MarketSettings};
pub use self::user::{UserId, UserIdentity, UserValidationError};
pub use self::watchlist::{
    DeleteOutcome, MembershipState, MutationPolicy, MutationPolicyParseError, OutcomeKind,
    ResyncOutcome, ResyncTicket, SessionPhase, WatchlistOutcome, WatchlistRecord,
    WatchlistService, WatchlistSnapshot,
};

