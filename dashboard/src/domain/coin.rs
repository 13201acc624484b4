//! Followable market instrument identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Longest identifier accepted from callers.
pub const COIN_ID_MAX: usize = 128;

/// Validation errors returned by [`CoinId::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoinIdValidationError {
    /// The identifier was empty.
    Empty,
    /// The identifier exceeded [`COIN_ID_MAX`] characters.
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The identifier contained whitespace, control characters, or `/`.
    InvalidCharacters,
}

impl fmt::Display for CoinIdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "coin id must not be empty"),
            Self::TooLong { max } => write!(f, "coin id must be at most {max} characters"),
            Self::InvalidCharacters => write!(
                f,
                "coin id must not contain whitespace, control characters, or '/'"
            ),
        }
    }
}

impl std::error::Error for CoinIdValidationError {}

/// Opaque identifier of a coin, e.g. `bitcoin` or `usd-coin`.
///
/// Only shape checks needed to place the value in a URL path are applied.
///
/// # Examples
/// ```
/// use dashboard::domain::CoinId;
///
/// let id = CoinId::new("bitcoin").expect("valid id");
/// assert_eq!(id.as_ref(), "bitcoin");
/// assert!(CoinId::new("bit coin").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CoinId(String);

impl CoinId {
    /// Validate and construct a [`CoinId`].
    pub fn new(id: impl Into<String>) -> Result<Self, CoinIdValidationError> {
        Self::from_owned(id.into())
    }

    fn from_owned(id: String) -> Result<Self, CoinIdValidationError> {
        if id.is_empty() {
            return Err(CoinIdValidationError::Empty);
        }
        if id.chars().count() > COIN_ID_MAX {
            return Err(CoinIdValidationError::TooLong { max: COIN_ID_MAX });
        }
        if id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/')
        {
            return Err(CoinIdValidationError::InvalidCharacters);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for CoinId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<CoinId> for String {
    fn from(value: CoinId) -> Self {
        value.0
    }
}

impl TryFrom<String> for CoinId {
    type Error = CoinIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}
