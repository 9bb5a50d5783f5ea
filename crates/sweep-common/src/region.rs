//! Region identifiers

use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

/// Strongly-typed region code (e.g. `us-east-1`)
///
/// This newtype keeps region codes from being mixed up with resource type
/// identifiers or resource IDs. Values are trimmed and lowercased on parse.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    derive_more::Display,
    derive_more::Deref,
)]
#[serde(transparent)]
pub struct RegionId(String);

/// A region string that is not a plausible region code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid region '{0}': expected lowercase letters, digits and '-', e.g. us-east-1")]
pub struct InvalidRegion(pub String);

impl RegionId {
    /// Parse and normalize a region code
    pub fn new(raw: &str) -> Result<Self, InvalidRegion> {
        let normalized = raw.trim().to_ascii_lowercase();

        let valid = normalized
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase())
            && !normalized.ends_with('-')
            && !normalized.contains("--")
            && normalized
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

        if valid {
            Ok(RegionId(normalized))
        } else {
            Err(InvalidRegion(raw.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RegionId {
    type Err = InvalidRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegionId::new(s)
    }
}
