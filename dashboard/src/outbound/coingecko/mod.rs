//! CoinGecko outbound adapters.
//!
//! This module provides a thin HTTP implementation of the
//! `MarketDataSource` port.

mod dto;
mod http_source;

pub use http_source::{CoinGeckoHttpSource, DEFAULT_BASE_URL};
