//! Resource visibility tiers.
//!
//! # Invariants
//! - Every ownable resource carries exactly one `AccessLevel`.
//! - Levels are not ordered: each tier has its own visibility predicate in
//!   `auth::ownership`, so no `PartialOrd` is derived here.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Visibility tier attached to pictograms and choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    /// Visible to everyone, including unauthenticated callers.
    Public,
    /// Visible to members of an owning department.
    Protected,
    /// Visible to direct owners only.
    Private,
}

impl AccessLevel {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }

    /// Parses a storage value produced by [`AccessLevel::as_str`].
    pub fn parse(value: &str) -> Result<Self, AccessLevelParseError> {
        match value {
            "public" => Ok(Self::Public),
            "protected" => Ok(Self::Protected),
            "private" => Ok(Self::Private),
            other => Err(AccessLevelParseError(other.to_string())),
        }
    }
}

impl Display for AccessLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when persisted access level text is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLevelParseError(pub String);

impl Display for AccessLevelParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown access level `{}`", self.0)
    }
}

impl Error for AccessLevelParseError {}

#[cfg(test)]
mod tests {
    use super::AccessLevel;

    #[test]
    fn storage_values_parse_back() {
        for level in [
            AccessLevel::Public,
            AccessLevel::Protected,
            AccessLevel::Private,
        ] {
            assert_eq!(AccessLevel::parse(level.as_str()), Ok(level));
        }
    }

    #[test]
    fn rejects_uppercase_storage_value() {
        let err = AccessLevel::parse("PUBLIC").expect_err("storage values are lowercase");
        assert_eq!(err.0, "PUBLIC");
    }
}
