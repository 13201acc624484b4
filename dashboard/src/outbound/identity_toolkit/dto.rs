//! Request and response bodies for the identity toolkit endpoints.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Credentials, UserId, UserIdentity};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PasswordRequestDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
    pub(super) return_secure_token: bool,
}

impl<'a> PasswordRequestDto<'a> {
    pub(super) fn from_credentials(credentials: &'a Credentials) -> Self {
        Self {
            email: credentials.email(),
            password: credentials.password(),
            return_secure_token: true,
        }
    }
}

/// Tokens issued with a session, and how long the ID token stays valid.
pub(super) struct TokenGrant {
    pub(super) id_token: String,
    pub(super) refresh_token: String,
    pub(super) lifetime: Duration,
}

fn parse_lifetime(raw: &str) -> Result<Duration, String> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|error| format!("token lifetime {raw:?} is not a number of seconds: {error}"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AccountResponseDto {
    pub(super) local_id: String,
    pub(super) email: Option<String>,
    pub(super) id_token: String,
    pub(super) refresh_token: String,
    pub(super) expires_in: String,
}

impl AccountResponseDto {
    pub(super) fn into_session(self) -> Result<(UserIdentity, TokenGrant), String> {
        let uid = UserId::new(self.local_id.as_str())
            .map_err(|error| format!("account id {:?} is invalid: {error}", self.local_id))?;
        let email = self.email.filter(|email| !email.trim().is_empty());
        let grant = TokenGrant {
            lifetime: parse_lifetime(&self.expires_in)?,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        };
        Ok((UserIdentity::new(uid, email), grant))
    }
}

/// Body of a token exchange against the secure token endpoint.
#[derive(Debug, Serialize)]
pub(super) struct RefreshRequestDto<'a> {
    pub(super) grant_type: &'static str,
    pub(super) refresh_token: &'a str,
}

impl<'a> RefreshRequestDto<'a> {
    pub(super) fn new(refresh_token: &'a str) -> Self {
        Self {
            grant_type: "refresh_token",
            refresh_token,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RefreshResponseDto {
    pub(super) id_token: String,
    pub(super) refresh_token: String,
    pub(super) expires_in: String,
    pub(super) user_id: String,
}

impl RefreshResponseDto {
    /// Tokens for `expected`; a grant for any other account is refused.
    pub(super) fn into_grant(self, expected: &UserId) -> Result<TokenGrant, String> {
        let expected_raw: &str = expected.as_ref();
        if self.user_id != expected_raw {
            return Err(format!(
                "refreshed tokens belong to {:?}, not {expected}",
                self.user_id
            ));
        }
        Ok(TokenGrant {
            lifetime: parse_lifetime(&self.expires_in)?,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub(super) error: ErrorBodyDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    pub(super) message: String,
}

impl ErrorBodyDto {
    /// Leading reason code, e.g. `WEAK_PASSWORD` from
    /// `WEAK_PASSWORD : Password should be at least 6 characters`.
    pub(super) fn reason(&self) -> &str {
        self.message
            .split_once(':')
            .map_or(self.message.as_str(), |(code, _)| code)
            .trim()
    }
}
