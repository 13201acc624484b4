//! Port for the hosted identity provider.
//!
//! The provider owns sign-up, sign-in, and sign-out, and publishes the
//! current identity on a [`tokio::sync::watch`] channel. Subscribers observe
//! every transition (sign-in, sign-out, account switch); dropping the
//! receiver unsubscribes.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{Credentials, UserIdentity};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// The provider refused the credentials or the account operation.
        Rejected { message: String } =>
            "identity provider rejected the request: {message}",
        /// The provider could not be reached.
        Transport { message: String } =>
            "identity provider unreachable: {message}",
        /// The provider answered with a payload we could not decode.
        Decode { message: String } =>
            "identity provider response could not be decoded: {message}",
    }
}

/// Port for authentication state and account operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Identity currently signed in, if any.
    fn current_identity(&self) -> Option<UserIdentity>;

    /// Subscribe to identity transitions.
    ///
    /// The receiver starts with the current value marked as seen; callers
    /// that need it should read [`watch::Receiver::borrow`] first.
    fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>>;

    /// Bearer token for the signed-in identity, for adapters that need it.
    ///
    /// Adapters whose tokens expire renew them here before handing one out,
    /// so the returned token is valid for at least a short while.
    async fn id_token(&self) -> Result<Option<String>, IdentityProviderError>;

    /// Create an account and sign it in.
    async fn sign_up(&self, credentials: &Credentials)
    -> Result<UserIdentity, IdentityProviderError>;

    /// Sign in with existing credentials.
    async fn sign_in(&self, credentials: &Credentials)
    -> Result<UserIdentity, IdentityProviderError>;

    /// Sign the current identity out. Signing out while signed out is a no-op.
    async fn sign_out(&self) -> Result<(), IdentityProviderError>;
}

/// Publisher side of the identity channel shared by provider adapters.
///
/// Publishing the value already held is suppressed so subscribers only wake
/// on real transitions.
#[derive(Debug)]
pub struct IdentityBroadcaster {
    sender: watch::Sender<Option<UserIdentity>>,
}

impl Default for IdentityBroadcaster {
    fn default() -> Self {
        let (sender, _receiver) = watch::channel(None);
        Self { sender }
    }
}

impl IdentityBroadcaster {
    /// Latest published identity.
    pub fn current(&self) -> Option<UserIdentity> {
        self.sender.borrow().clone()
    }

    /// New receiver for the channel.
    pub fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.sender.subscribe()
    }

    /// Publish `identity`; returns whether subscribers were notified.
    pub fn publish(&self, identity: Option<UserIdentity>) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == identity {
                return false;
            }
            *current = identity;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    fn identity(uid: &str) -> UserIdentity {
        UserIdentity::new(
            UserId::new(uid).expect("valid uid"),
            Some(format!("{uid}@example.com")),
        )
    }

    #[test]
    fn broadcaster_starts_signed_out() {
        let broadcaster = IdentityBroadcaster::default();
        assert!(broadcaster.current().is_none());
    }

    #[tokio::test]
    async fn broadcaster_notifies_on_transitions_only() {
        let broadcaster = IdentityBroadcaster::default();
        let mut receiver = broadcaster.subscribe();

        assert!(broadcaster.publish(Some(identity("u1"))));
        receiver.changed().await.expect("sender alive");
        assert_eq!(
            receiver.borrow_and_update().as_ref().map(|id| id.uid().to_string()),
            Some("u1".to_owned())
        );

        assert!(!broadcaster.publish(Some(identity("u1"))));
        assert!(!receiver.has_changed().expect("sender alive"));

        assert!(broadcaster.publish(None));
        assert!(receiver.has_changed().expect("sender alive"));
    }
}
