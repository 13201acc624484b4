//! Development identity provider with accounts kept in memory.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::ports::{IdentityBroadcaster, IdentityProvider, IdentityProviderError};
use crate::domain::{Credentials, UserId, UserIdentity};

const MIN_PASSWORD_CHARS: usize = 6;

struct Account {
    uid: UserId,
    email: String,
    password: Zeroizing<String>,
}

/// Account table and session for local runs.
///
/// Mirrors the hosted provider's rejection reasons so callers see the same
/// failures offline.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    broadcaster: IdentityBroadcaster,
}

impl InMemoryIdentityProvider {
    fn account_key(email: &str) -> String {
        email.to_lowercase()
    }

    fn sign_in_account(&self, account: &Account) -> UserIdentity {
        let identity = UserIdentity::new(account.uid.clone(), Some(account.email.clone()));
        self.broadcaster.publish(Some(identity.clone()));
        info!(uid = %account.uid, "signed in");
        identity
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn current_identity(&self) -> Option<UserIdentity> {
        self.broadcaster.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.broadcaster.subscribe()
    }

    async fn id_token(&self) -> Result<Option<String>, IdentityProviderError> {
        Ok(self
            .broadcaster
            .current()
            .map(|identity| format!("local-{}", identity.uid())))
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
    ) -> Result<UserIdentity, IdentityProviderError> {
        if credentials.password().chars().count() < MIN_PASSWORD_CHARS {
            return Err(IdentityProviderError::rejected("WEAK_PASSWORD"));
        }
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let key = Self::account_key(credentials.email());
        if accounts.contains_key(&key) {
            return Err(IdentityProviderError::rejected("EMAIL_EXISTS"));
        }
        let uid = UserId::new(Uuid::new_v4().simple().to_string())
            .map_err(|error| IdentityProviderError::decode(error.to_string()))?;
        let account = Account {
            uid,
            email: credentials.email().to_owned(),
            password: Zeroizing::new(credentials.password().to_owned()),
        };
        let identity = self.sign_in_account(&account);
        accounts.insert(key, account);
        Ok(identity)
    }

    async fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> Result<UserIdentity, IdentityProviderError> {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        match accounts.get(&Self::account_key(credentials.email())) {
            Some(account) if account.password.as_str() == credentials.password() => {
                Ok(self.sign_in_account(account))
            }
            _ => Err(IdentityProviderError::rejected("INVALID_LOGIN_CREDENTIALS")),
        }
    }

    async fn sign_out(&self) -> Result<(), IdentityProviderError> {
        if self.broadcaster.publish(None) {
            info!("signed out");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials::try_from_parts(email, password).expect("valid credentials")
    }

    #[tokio::test]
    async fn sign_up_signs_the_new_account_in() {
        let provider = InMemoryIdentityProvider::default();
        let receiver = provider.subscribe();

        let identity = provider
            .sign_up(&credentials("ada@example.com", "hunter22"))
            .await
            .expect("sign up");

        assert_eq!(identity.display_name(), "ada");
        assert_eq!(provider.current_identity(), Some(identity.clone()));
        assert!(receiver.has_changed().expect("sender alive"));
        assert!(provider.id_token().await.expect("local token").is_some());
    }

    #[tokio::test]
    async fn duplicate_and_weak_sign_ups_are_rejected() {
        let provider = InMemoryIdentityProvider::default();
        provider
            .sign_up(&credentials("ada@example.com", "hunter22"))
            .await
            .expect("first sign up");

        let duplicate = provider
            .sign_up(&credentials("ADA@example.com", "another1"))
            .await
            .expect_err("duplicate");
        let weak = provider
            .sign_up(&credentials("bob@example.com", "123"))
            .await
            .expect_err("weak");

        assert_eq!(duplicate, IdentityProviderError::rejected("EMAIL_EXISTS"));
        assert_eq!(weak, IdentityProviderError::rejected("WEAK_PASSWORD"));
    }

    #[tokio::test]
    async fn sign_in_checks_password_and_sign_out_publishes_none() {
        let provider = InMemoryIdentityProvider::default();
        let created = provider
            .sign_up(&credentials("ada@example.com", "hunter22"))
            .await
            .expect("sign up");
        provider.sign_out().await.expect("sign out");
        assert!(provider.current_identity().is_none());

        let wrong = provider
            .sign_in(&credentials("ada@example.com", "wrong-pw"))
            .await
            .expect_err("bad password");
        assert_eq!(
            wrong,
            IdentityProviderError::rejected("INVALID_LOGIN_CREDENTIALS")
        );

        let signed_in = provider
            .sign_in(&credentials("ada@example.com", "hunter22"))
            .await
            .expect("sign in");
        assert_eq!(signed_in.uid(), created.uid());
    }
}
