//! Prompt templates for training records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Template used when none is configured.
pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "USER: <image>\nDynamic Objects: {objects}\nDescribe the actions in this frame.\nASSISTANT: {activity}.";

const OBJECTS_PLACEHOLDER: &str = "{objects}";
const ACTIVITY_PLACEHOLDER: &str = "{activity}";
const NO_OBJECTS: &str = "none";

/// Prompt template with optional `{objects}` and `{activity}` placeholders.
///
/// A template without placeholders is emitted verbatim for every frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate(String);

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the prompt for one frame.
    pub fn render(&self, dynamic_objects: &[String], activity: &str) -> String {
        self.0
            .replace(OBJECTS_PLACEHOLDER, &describe_objects(dynamic_objects))
            .replace(ACTIVITY_PLACEHOLDER, activity)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_TEMPLATE)
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `Cup is moving, Book is moving`, or `none`.
fn describe_objects(names: &[String]) -> String {
    if names.is_empty() {
        return NO_OBJECTS.to_string();
    }
    names
        .iter()
        .map(|name| format!("{} is moving", name))
        .collect::<Vec<_>>()
        .join(", ")
}
