//! Reqwest-backed watchlist store.
//!
//! Requests are authorised with the ID token of the signed-in identity, so
//! the store only ever reads and writes the caller's own records.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{DocumentDto, NewDocumentDto, QueryRowDto, RunQueryDto, documents};
use crate::domain::ports::{
    IdentityProvider, IdentityProviderError, WatchlistStore, WatchlistStoreError,
};
use crate::domain::{CoinId, DeleteOutcome, UserId};
use crate::outbound::http_support::{body_preview, join_segments};

/// Document store API root used when no override is configured.
pub const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Location of the watchlist collection.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// API root.
    pub base_url: Url,
    /// Hosted project identifier.
    pub project_id: String,
    /// Collection holding watchlist records.
    pub collection: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Watchlist store backed by the hosted document database.
pub struct FirestoreWatchlistStore {
    client: Client,
    config: FirestoreConfig,
    identity: Arc<dyn IdentityProvider>,
}

impl FirestoreWatchlistStore {
    /// Build a store that authorises requests with `identity`'s ID token.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        config: FirestoreConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            identity,
        })
    }

    fn url<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, WatchlistStoreError> {
        join_segments(&self.config.base_url, segments).ok_or_else(|| {
            WatchlistStoreError::connection(format!(
                "base URL {} cannot carry a path",
                self.config.base_url
            ))
        })
    }

    /// URL under the project's default database; `tail` may borrow from
    /// `self`.
    fn documents_url<'a>(
        &'a self,
        tail: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, WatchlistStoreError> {
        let root = [
            "projects",
            self.config.project_id.as_str(),
            "databases",
            "(default)",
        ];
        self.url(root.into_iter().chain(tail))
    }

    async fn authorised(
        &self,
        request: RequestBuilder,
    ) -> Result<RequestBuilder, WatchlistStoreError> {
        let token = self
            .identity
            .id_token()
            .await
            .map_err(map_identity_error)?
            .ok_or_else(|| WatchlistStoreError::permission_denied("no signed-in session"))?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>, WatchlistStoreError> {
        let response = self
            .authorised(request)
            .await?
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        Ok(body.to_vec())
    }

    async fn run_query(
        &self,
        query: &RunQueryDto,
    ) -> Result<Vec<DocumentDto>, WatchlistStoreError> {
        let url = self.documents_url(["documents:runQuery"])?;
        let body = self.send(self.client.post(url).json(query)).await?;
        let rows: Vec<QueryRowDto> = decode(&body)?;
        Ok(documents(rows))
    }
}

#[async_trait]
impl WatchlistStore for FirestoreWatchlistStore {
    async fn list_items(&self, user: &UserId) -> Result<Vec<CoinId>, WatchlistStoreError> {
        let query = RunQueryDto::by_user(&self.config.collection, user.as_ref());
        self.run_query(&query)
            .await?
            .iter()
            .map(DocumentDto::coin)
            .collect::<Result<Vec<_>, _>>()
            .map_err(WatchlistStoreError::decode)
    }

    async fn insert_item(&self, user: &UserId, coin: &CoinId) -> Result<(), WatchlistStoreError> {
        let url = self.documents_url(["documents", self.config.collection.as_str()])?;
        let document = NewDocumentDto::record(user.as_ref(), coin.as_ref());
        self.send(self.client.post(url).json(&document)).await?;
        Ok(())
    }

    async fn delete_item(
        &self,
        user: &UserId,
        coin: &CoinId,
    ) -> Result<DeleteOutcome, WatchlistStoreError> {
        let query = RunQueryDto::by_pair(&self.config.collection, user.as_ref(), coin.as_ref());
        let matches = self.run_query(&query).await?;
        if matches.is_empty() {
            return Ok(DeleteOutcome::NotFound);
        }
        for document in &matches {
            let url = self.url(document.name.split('/'))?;
            self.send(self.client.delete(url)).await?;
        }
        debug!(%user, %coin, deleted = matches.len(), "deleted watchlist records");
        Ok(DeleteOutcome::Deleted)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, WatchlistStoreError> {
    serde_json::from_slice(body).map_err(|error| {
        WatchlistStoreError::decode(format!("invalid document store JSON payload: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> WatchlistStoreError {
    WatchlistStoreError::connection(error.to_string())
}

/// A session whose token cannot be renewed no longer grants access.
fn map_identity_error(error: IdentityProviderError) -> WatchlistStoreError {
    match error {
        IdentityProviderError::Rejected { message } => {
            WatchlistStoreError::permission_denied(format!("session expired: {message}"))
        }
        IdentityProviderError::Transport { message } => WatchlistStoreError::connection(message),
        IdentityProviderError::Decode { message } => WatchlistStoreError::decode(message),
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> WatchlistStoreError {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    };
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            WatchlistStoreError::permission_denied(message)
        }
        _ if status.is_client_error() => WatchlistStoreError::query(message),
        _ => WatchlistStoreError::connection(message),
    }
}
