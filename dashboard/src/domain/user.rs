//! Authenticated principal identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Validation errors returned by [`UserId::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// The identifier was empty.
    EmptyId,
    /// The identifier carried surrounding whitespace or control characters.
    InvalidId,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(
                f,
                "user id must not contain whitespace or control characters"
            ),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable identifier issued by the identity provider.
///
/// The value is opaque: nothing in this crate interprets its structure.
///
/// # Examples
/// ```
/// use dashboard::domain::UserId;
///
/// let id = UserId::new("u1").expect("valid id");
/// assert_eq!(id.as_ref(), "u1");
/// assert!(UserId::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`].
    pub fn new(id: impl Into<String>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.into())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(UserValidationError::InvalidId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

const FALLBACK_DISPLAY_NAME: &str = "User";

/// Signed-in principal as published by the identity provider.
///
/// ## Invariants
/// - `display_name` is the local part of `email`, or `"User"` when the
///   provider did not supply an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    uid: UserId,
    email: Option<String>,
    display_name: String,
}

impl UserIdentity {
    /// Build an identity, deriving the display name from the e-mail address.
    ///
    /// # Examples
    /// ```
    /// use dashboard::domain::{UserId, UserIdentity};
    ///
    /// let uid = UserId::new("u1").expect("valid id");
    /// let identity = UserIdentity::new(uid, Some("ada@example.com".to_owned()));
    /// assert_eq!(identity.display_name(), "ada");
    /// ```
    pub fn new(uid: UserId, email: Option<String>) -> Self {
        let display_name = email
            .as_deref()
            .and_then(|address| address.split('@').next())
            .filter(|local| !local.trim().is_empty())
            .map_or_else(|| FALLBACK_DISPLAY_NAME.to_owned(), str::to_owned);
        Self {
            uid,
            email,
            display_name,
        }
    }

    /// Stable identifier of the principal.
    pub fn uid(&self) -> &UserId {
        &self.uid
    }

    /// E-mail address, when the provider knows one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Name shown in the header.
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", UserValidationError::EmptyId)]
    #[case(" u1", UserValidationError::InvalidId)]
    #[case("u 1", UserValidationError::InvalidId)]
    #[case("u1\n", UserValidationError::InvalidId)]
    fn user_id_rejects_malformed_values(#[case] raw: &str, #[case] expected: UserValidationError) {
        assert_eq!(UserId::new(raw), Err(expected));
    }

    #[test]
    fn user_id_accepts_provider_uids() {
        let id = UserId::new("Xy7pQm3Lr0aZ9bC2dE4fG6hJ8kN1").expect("firebase-style uid");
        assert_eq!(id.to_string(), "Xy7pQm3Lr0aZ9bC2dE4fG6hJ8kN1");
    }

    #[test]
    fn user_id_deserialisation_validates() {
        let ok: UserId = serde_json::from_str("\"u1\"").expect("valid id");
        assert_eq!(ok.as_ref(), "u1");
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }

    #[rstest]
    #[case(Some("satoshi@example.com"), "satoshi")]
    #[case(Some("@example.com"), "User")]
    #[case(None, "User")]
    fn display_name_is_derived_from_email(#[case] email: Option<&str>, #[case] expected: &str) {
        let uid = UserId::new("u1").expect("valid id");
        let identity = UserIdentity::new(uid, email.map(str::to_owned));
        assert_eq!(identity.display_name(), expected);
    }
}
