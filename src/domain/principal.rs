//! Type-safe user identity.
//!
//! [`UserPrincipal`] is a newtype over the canonical textual form of a
//! ledger principal. Ownership checks compare principals by that text and
//! nothing else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Canonical identity of a user or account.
///
/// Construction normalizes the input (surrounding whitespace trimmed,
/// ASCII lowercased) and accepts only alphanumeric groups separated by
/// single dashes, e.g. `zv5zm-zyhmm-na6rs-2ykmi-binrr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserPrincipal(String);

impl UserPrincipal {
    /// Parses and normalizes a principal from text.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidPrincipal`] if the text is empty or
    /// contains anything other than dash-separated alphanumeric groups.
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        let canonical = text.trim().to_ascii_lowercase();
        let well_formed = !canonical.is_empty()
            && canonical
                .split('-')
                .all(|group| !group.is_empty() && group.chars().all(|c| c.is_ascii_alphanumeric()));
        if !well_formed {
            return Err(GatewayError::InvalidPrincipal(text.to_string()));
        }
        Ok(Self(canonical))
    }

    /// Returns the canonical textual form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserPrincipal {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserPrincipal {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UserPrincipal> for String {
    fn from(principal: UserPrincipal) -> Self {
        principal.0
    }
}
