//! Reqwest-backed identity provider.
//!
//! Signing in keeps the returned tokens in memory so the watchlist store can
//! authorise its requests. ID tokens are short-lived; the refresh token is
//! exchanged for a new one shortly before the current token lapses. Every
//! successful sign-up, sign-in, or sign-out is published to subscribers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::dto::{
    AccountResponseDto, ErrorEnvelopeDto, PasswordRequestDto, RefreshRequestDto,
    RefreshResponseDto, TokenGrant,
};
use crate::domain::ports::{IdentityBroadcaster, IdentityProvider, IdentityProviderError};
use crate::domain::{Credentials, UserId, UserIdentity};
use crate::outbound::http_support::{body_preview, join_segments};

/// Identity toolkit API root used when no override is configured.
pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Secure token API root used when no override is configured.
pub const DEFAULT_TOKEN_BASE_URL: &str = "https://securetoken.googleapis.com/v1";

const SIGN_UP_PATH: &str = "accounts:signUp";
const SIGN_IN_PATH: &str = "accounts:signInWithPassword";
const REFRESH_PATH: &str = "token";

/// How long before expiry an ID token is replaced.
const REFRESH_MARGIN: TimeDelta = TimeDelta::seconds(60);

const REJECTED_REASONS: [&str; 9] = [
    "EMAIL_EXISTS",
    "INVALID_PASSWORD",
    "EMAIL_NOT_FOUND",
    "INVALID_LOGIN_CREDENTIALS",
    "WEAK_PASSWORD",
    "INVALID_EMAIL",
    "TOKEN_EXPIRED",
    "INVALID_REFRESH_TOKEN",
    "USER_DISABLED",
];

struct Session {
    identity: UserIdentity,
    id_token: Zeroizing<String>,
    refresh_token: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

fn expiry(now: DateTime<Utc>, lifetime: Duration) -> DateTime<Utc> {
    now + TimeDelta::from_std(lifetime).unwrap_or_default()
}

impl Session {
    fn new(identity: UserIdentity, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            identity,
            expires_at: expiry(now, grant.lifetime),
            id_token: Zeroizing::new(grant.id_token),
            refresh_token: Zeroizing::new(grant.refresh_token),
        }
    }

    fn renew(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.expires_at = expiry(now, grant.lifetime);
        self.id_token = Zeroizing::new(grant.id_token);
        self.refresh_token = Zeroizing::new(grant.refresh_token);
    }

    /// Whether the ID token lapses within [`REFRESH_MARGIN`] of `now`.
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + REFRESH_MARGIN >= self.expires_at
    }
}

/// Where a session's token must be renewed from, captured under the lock.
struct PendingRefresh {
    uid: UserId,
    refresh_token: Zeroizing<String>,
}

/// Identity provider backed by the hosted e-mail/password endpoints.
pub struct IdentityToolkitProvider {
    client: Client,
    base_url: Url,
    token_base_url: Url,
    api_key: Zeroizing<String>,
    clock: Arc<dyn Clock>,
    session: Mutex<Option<Session>>,
    broadcaster: IdentityBroadcaster,
}

impl IdentityToolkitProvider {
    /// Build a signed-out provider.
    ///
    /// `base_url` serves the account endpoints and `token_base_url` the
    /// refresh-token exchange.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: Url,
        token_base_url: Url,
        api_key: impl Into<String>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            token_base_url,
            api_key: Zeroizing::new(api_key.into()),
            clock,
            session: Mutex::new(None),
            broadcaster: IdentityBroadcaster::default(),
        })
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn post<T: DeserializeOwned>(
        &self,
        root: &Url,
        path: &str,
        body: &(impl serde::Serialize + Sync),
    ) -> Result<T, IdentityProviderError> {
        let url = join_segments(root, [path]).ok_or_else(|| {
            IdentityProviderError::transport(format!("base URL {root} cannot carry a path"))
        })?;
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|error| IdentityProviderError::transport(error.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| IdentityProviderError::transport(error.to_string()))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        serde_json::from_slice(body.as_ref()).map_err(|error| {
            IdentityProviderError::decode(format!("invalid JSON payload: {error}"))
        })
    }

    async fn authenticate(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<UserIdentity, IdentityProviderError> {
        let account: AccountResponseDto = self
            .post(
                &self.base_url,
                path,
                &PasswordRequestDto::from_credentials(credentials),
            )
            .await?;
        let (identity, grant) = account
            .into_session()
            .map_err(IdentityProviderError::decode)?;

        *self.lock_session() = Some(Session::new(identity.clone(), grant, self.clock.utc()));
        self.broadcaster.publish(Some(identity.clone()));
        info!(uid = %identity.uid(), "signed in");
        Ok(identity)
    }

    /// Token to hand out now, or the refresh that must happen first.
    fn token_or_refresh(&self) -> Result<Option<String>, PendingRefresh> {
        let session = self.lock_session();
        let Some(session) = session.as_ref() else {
            return Ok(None);
        };
        if session.needs_refresh(self.clock.utc()) {
            return Err(PendingRefresh {
                uid: session.identity.uid().clone(),
                refresh_token: session.refresh_token.clone(),
            });
        }
        Ok(Some(session.id_token.as_str().to_owned()))
    }

    async fn refresh(
        &self,
        pending: &PendingRefresh,
    ) -> Result<Option<String>, IdentityProviderError> {
        let response: RefreshResponseDto = self
            .post(
                &self.token_base_url,
                REFRESH_PATH,
                &RefreshRequestDto::new(pending.refresh_token.as_str()),
            )
            .await
            .inspect_err(|error| warn!(uid = %pending.uid, %error, "ID token refresh failed"))?;
        let grant = response
            .into_grant(&pending.uid)
            .map_err(IdentityProviderError::decode)?;

        let mut session = self.lock_session();
        match session.as_mut() {
            Some(current) if *current.identity.uid() == pending.uid => {
                current.renew(grant, self.clock.utc());
                debug!(
                    uid = %pending.uid,
                    expires_at = %current.expires_at,
                    "ID token refreshed"
                );
                Ok(Some(current.id_token.as_str().to_owned()))
            }
            // Signed out or switched accounts while the exchange was in flight.
            other => Ok(other.map(|s| s.id_token.as_str().to_owned())),
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    fn current_identity(&self) -> Option<UserIdentity> {
        self.broadcaster.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.broadcaster.subscribe()
    }

    async fn id_token(&self) -> Result<Option<String>, IdentityProviderError> {
        match self.token_or_refresh() {
            Ok(token) => Ok(token),
            Err(pending) => self.refresh(&pending).await,
        }
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
    ) -> Result<UserIdentity, IdentityProviderError> {
        self.authenticate(SIGN_UP_PATH, credentials).await
    }

    async fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> Result<UserIdentity, IdentityProviderError> {
        self.authenticate(SIGN_IN_PATH, credentials).await
    }

    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        let previous = self.lock_session().take();
        if let Some(session) = previous {
            info!(uid = %session.identity.uid(), "signed out");
        }
        self.broadcaster.publish(None);
        Ok(())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityProviderError {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelopeDto>(body) {
        let reason = envelope.error.reason();
        if REJECTED_REASONS.iter().any(|known| *known == reason) {
            return IdentityProviderError::rejected(reason);
        }
    }
    let preview = body_preview(body);
    warn!(status = status.as_u16(), body = %preview, "identity provider request failed");
    if status.is_client_error() {
        IdentityProviderError::rejected(format!("status {}", status.as_u16()))
    } else {
        IdentityProviderError::transport(format!("status {}: {preview}", status.as_u16()))
    }
}
