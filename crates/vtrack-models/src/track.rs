//! Track identity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable integer label correlating one subject across frames.
///
/// Identities are assigned once, at bootstrap, starting at 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl TrackId {
    /// Identity of the first bootstrapped subject.
    pub const FIRST: TrackId = TrackId(1);

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TrackId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
