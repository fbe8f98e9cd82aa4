//! Utility functions for recording identifiers.

use tracing::warn;

/// Label returned when a recording id carries no recognisable activity.
pub const UNKNOWN_ACTIVITY: &str = "Unknown";

/// Extract the activity label from an ADT recording id.
///
/// `Apartment_release_clean_seq131_M1292` yields `Clean`. When `release` is
/// followed by a capture qualifier (`skeleton`, `multiskeleton`,
/// `multiuser`) the next token is used instead.
pub fn parse_activity_label(recording_id: &str) -> String {
    let parts: Vec<&str> = recording_id.split('_').collect();

    let label = parts
        .iter()
        .position(|p| *p == "release")
        .and_then(|idx| {
            let next = parts.get(idx + 1)?;
            if is_capture_qualifier(next) {
                parts.get(idx + 2)
            } else {
                Some(next)
            }
        })
        .filter(|label| !label.is_empty());

    match label {
        Some(label) => capitalize(label),
        None => {
            warn!(recording_id, "Could not parse activity label from recording id");
            UNKNOWN_ACTIVITY.to_string()
        }
    }
}

fn is_capture_qualifier(token: &str) -> bool {
    matches!(
        token.to_ascii_lowercase().as_str(),
        "skeleton" | "multiskeleton" | "multiuser"
    )
}

fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
