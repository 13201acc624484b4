//! Dashboard configuration loaded via OrthoConfig.
//!
//! Every field is optional; accessors supply defaults and validate values so
//! `main` can fail fast with a readable message.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{MarketSettings, MutationPolicy, MutationPolicyParseError};
use crate::outbound::{coingecko, firestore, identity_toolkit};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MARKET_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_VS_CURRENCY: &str = "usd";
const DEFAULT_PER_PAGE: u32 = 40;
const DEFAULT_MARKET_STALE_SECS: u64 = 30;
const DEFAULT_WATCHLIST_COLLECTION: &str = "watchlist";

/// Errors raised while interpreting configured values.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not `host:port`.
    #[error("bind_addr {value:?} is not a socket address: {source}")]
    BindAddr {
        /// Configured value.
        value: String,
        /// Parser error.
        source: std::net::AddrParseError,
    },
    /// A base URL failed to parse.
    #[error("{field} {value:?} is not a valid URL: {source}")]
    Url {
        /// Setting name.
        field: &'static str,
        /// Configured value.
        value: String,
        /// Parser error.
        source: url::ParseError,
    },
    /// The mutation policy is unknown.
    #[error(transparent)]
    MutationPolicy(#[from] MutationPolicyParseError),
    /// The page size is outside the provider's range.
    #[error("per_page must be between 1 and {max} (got {value})")]
    PerPage {
        /// Configured value.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },
    /// A hosted API key was given without the project it belongs to.
    #[error("firebase_project_id is required when firebase_api_key is set")]
    MissingProjectId,
}

/// Hosted identity and document store coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedProject {
    /// Web API key.
    pub api_key: String,
    /// Project identifier.
    pub project_id: String,
}

/// Configuration values for the dashboard server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DASHBOARD")]
pub struct DashboardSettings {
    /// Address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Market data API root.
    pub market_base_url: Option<String>,
    /// Market data API key, sent as a query parameter when set.
    pub market_api_key: Option<String>,
    /// Market data request timeout in milliseconds.
    pub market_timeout_ms: Option<u64>,
    /// Quote currency for prices.
    pub vs_currency: Option<String>,
    /// Listing page size.
    pub per_page: Option<u32>,
    /// Seconds a cached market response stays fresh.
    pub market_stale_secs: Option<u64>,
    /// Hosted project web API key; in-memory adapters are used when absent.
    pub firebase_api_key: Option<String>,
    /// Hosted project identifier.
    pub firebase_project_id: Option<String>,
    /// Collection holding watchlist records.
    pub watchlist_collection: Option<String>,
    /// `rollback` or `confirm-removals`.
    pub mutation_policy: Option<String>,
    /// Identity toolkit API root override.
    pub identity_base_url: Option<String>,
    /// Secure token API root override, used to renew ID tokens.
    pub token_base_url: Option<String>,
    /// Document store API root override.
    pub firestore_base_url: Option<String>,
}

fn parse_url(
    field: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<Url, SettingsError> {
    let value = value.unwrap_or(default);
    Url::parse(value).map_err(|source| SettingsError::Url {
        field,
        value: value.to_owned(),
        source,
    })
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl DashboardSettings {
    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    /// Market data API root.
    pub fn market_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "market_base_url",
            self.market_base_url.as_deref(),
            coingecko::DEFAULT_BASE_URL,
        )
    }

    /// Market data API key, if one is configured.
    pub fn market_api_key(&self) -> Option<String> {
        non_blank(self.market_api_key.as_ref()).map(str::to_owned)
    }

    /// Timeout applied to every outbound request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.market_timeout_ms.unwrap_or(DEFAULT_MARKET_TIMEOUT_MS))
    }

    /// Market service tunables.
    pub fn market_settings(&self) -> Result<MarketSettings, SettingsError> {
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 || per_page > crate::domain::MAX_PER_PAGE {
            return Err(SettingsError::PerPage {
                value: per_page,
                max: crate::domain::MAX_PER_PAGE,
            });
        }
        Ok(MarketSettings {
            vs_currency: non_blank(self.vs_currency.as_ref())
                .unwrap_or(DEFAULT_VS_CURRENCY)
                .to_lowercase(),
            per_page,
            stale_after: Duration::from_secs(
                self.market_stale_secs.unwrap_or(DEFAULT_MARKET_STALE_SECS),
            ),
        })
    }

    /// Hosted project coordinates, or `None` to run with in-memory adapters.
    pub fn hosted_project(&self) -> Result<Option<HostedProject>, SettingsError> {
        let Some(api_key) = non_blank(self.firebase_api_key.as_ref()) else {
            return Ok(None);
        };
        let project_id =
            non_blank(self.firebase_project_id.as_ref()).ok_or(SettingsError::MissingProjectId)?;
        Ok(Some(HostedProject {
            api_key: api_key.to_owned(),
            project_id: project_id.to_owned(),
        }))
    }

    /// Collection holding watchlist records.
    pub fn watchlist_collection(&self) -> &str {
        non_blank(self.watchlist_collection.as_ref()).unwrap_or(DEFAULT_WATCHLIST_COLLECTION)
    }

    /// How watchlist mutations treat remote failures.
    pub fn mutation_policy(&self) -> Result<MutationPolicy, SettingsError> {
        match self.mutation_policy.as_deref() {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(MutationPolicy::default()),
        }
    }

    /// Identity toolkit API root.
    pub fn identity_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "identity_base_url",
            self.identity_base_url.as_deref(),
            identity_toolkit::DEFAULT_BASE_URL,
        )
    }

    /// Secure token API root.
    pub fn token_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "token_base_url",
            self.token_base_url.as_deref(),
            identity_toolkit::DEFAULT_TOKEN_BASE_URL,
        )
    }

    /// Document store API root.
    pub fn firestore_base_url(&self) -> Result<Url, SettingsError> {
        parse_url(
            "firestore_base_url",
            self.firestore_base_url.as_deref(),
            firestore::DEFAULT_BASE_URL,
        )
    }
}
