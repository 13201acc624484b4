//! Crypto dashboard backend.
//!
//! Serves cached market data and keeps the signed-in user's watchlist in
//! step with the hosted document store.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;

pub use config::{DashboardSettings, SettingsError};
