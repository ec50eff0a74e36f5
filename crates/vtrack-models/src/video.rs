//! Video identity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for one tracked video.
///
/// The identifier becomes part of storage keys, so only `[A-Za-z0-9._-]`
/// is accepted by [`VideoId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

/// Rejected video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid video id {0:?}: expected 1-128 characters of [A-Za-z0-9._-]")]
pub struct InvalidVideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate and wrap an externally supplied identifier.
    pub fn parse(s: impl Into<String>) -> Result<Self, InvalidVideoId> {
        let s = s.into();
        let valid = !s.is_empty()
            && s.len() <= 128
            && s != "."
            && s != ".."
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if valid {
            Ok(Self(s))
        } else {
            Err(InvalidVideoId(s))
        }
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
