//! Recording identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one ADT recording (sequence), e.g.
/// `Apartment_release_clean_seq131_M1292`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordingId(pub String);

impl RecordingId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id can be used as a single directory name.
    ///
    /// Rejects empty ids, path separators and relative components so a
    /// manifest can never write outside the dataset root.
    pub fn is_safe_dir_name(&self) -> bool {
        let s = self.0.as_str();
        !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\', '\0'])
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordingId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
