//! Training record emitted by the prepare stage.

use serde::{Deserialize, Serialize};

/// Flat unit of output consumed by the vision-language trainer.
///
/// `image` is relative to the dataset root unless absolute paths were
/// requested at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub image: String,
    pub prompt: String,
    /// Names of dynamic objects visible in the frame. Serialized as `[]`
    /// when nothing dynamic is visible.
    pub dynamic_objects: Vec<String>,
}
