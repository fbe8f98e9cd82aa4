//! Annotation normalization for ADT recordings.
//!
//! Turns a recording's ground truth (`instances.json` plus the per-frame
//! bounding-box table) into the set of dynamic objects visible in each
//! extracted frame.

pub mod align;
pub mod error;
pub mod instances;
pub mod normalize;
pub mod table;

pub use align::{align_to_frames, merge_tables, PerFrameTable};
pub use error::{AnnotationError, AnnotationResult};
pub use instances::{dynamic_uids, load_instances, InstanceMap};
pub use normalize::{classify_dynamic_objects, normalize_recording, FramePresence};
pub use table::{read_box_table, AnnotationRow, RowKey, TableFilter, DEFAULT_STREAM_ID};
