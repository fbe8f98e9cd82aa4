//! Object instance metadata from `instances.json`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Object identifier as it appears in `instances.json` keys and the
/// `object_uid` column of the per-frame tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectUid(pub String);

impl ObjectUid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectUid {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<String> for ObjectUid {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// Static / dynamic classification of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum MotionType {
    Static,
    Dynamic,
    #[default]
    Unknown,
}

impl From<String> for MotionType {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => MotionType::Static,
            "dynamic" => MotionType::Dynamic,
            _ => MotionType::Unknown,
        }
    }
}

impl From<MotionType> for String {
    fn from(m: MotionType) -> Self {
        match m {
            MotionType::Static => "static",
            MotionType::Dynamic => "dynamic",
            MotionType::Unknown => "unknown",
        }
        .to_string()
    }
}

/// One entry of `instances.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInstance {
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub prototype_name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub motion_type: MotionType,
}

impl ObjectInstance {
    pub fn is_dynamic(&self) -> bool {
        self.motion_type == MotionType::Dynamic
    }

    /// Human-readable name, falling back to the prototype name.
    pub fn display_name(&self) -> &str {
        if !self.instance_name.is_empty() {
            return &self.instance_name;
        }
        self.prototype_name.as_deref().unwrap_or("object")
    }
}
