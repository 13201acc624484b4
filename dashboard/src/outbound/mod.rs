//! Outbound adapters implementing domain ports for external services.
//!
//! - **coingecko**: reqwest-backed market data source
//! - **identity_toolkit**: hosted e-mail/password identity provider
//! - **firestore**: hosted document store for watchlist records
//! - **memory**: in-process doubles used when no hosted project is configured
//!
//! Adapters are thin translators between domain types and wire formats. They
//! contain no membership logic.

pub mod coingecko;
pub mod firestore;
mod http_support;
pub mod identity_toolkit;
pub mod memory;
