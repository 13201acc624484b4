//! Hosted identity toolkit adapter.
//!
//! Implements the `IdentityProvider` port against the e-mail/password REST
//! endpoints of the hosted identity service, renewing ID tokens through the
//! secure token endpoint.

mod dto;
mod http_provider;

pub use http_provider::{DEFAULT_BASE_URL, DEFAULT_TOKEN_BASE_URL, IdentityToolkitProvider};
