//! Per-frame dynamic object presence.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use adt_models::{AssetKind, FrameTimeline, ObjectUid, RecordingLayout};
use tracing::{debug, info};

use crate::align::{align_to_frames, merge_tables, PerFrameTable};
use crate::error::{AnnotationError, AnnotationResult};
use crate::instances::{dynamic_uids, load_instances, InstanceMap};
use crate::table::{read_box_table, AnnotationRow, TableFilter};

/// Dynamic objects visible in each frame of a recording.
///
/// Frames without a visible dynamic object map to an empty set; they are
/// never omitted.
#[derive(Debug, Clone, Default)]
pub struct FramePresence {
    instances: InstanceMap,
    frames: BTreeMap<u32, BTreeSet<ObjectUid>>,
}

impl FramePresence {
    /// Dynamic object uids visible in `frame`, or `None` if the frame is
    /// not covered by the tables.
    pub fn dynamic_objects(&self, frame: u32) -> Option<&BTreeSet<ObjectUid>> {
        self.frames.get(&frame)
    }

    /// Display names of the dynamic objects visible in `frame`, in uid
    /// order. Empty when the frame has none or is not covered.
    pub fn dynamic_names(&self, frame: u32) -> Vec<String> {
        self.frames
            .get(&frame)
            .into_iter()
            .flatten()
            .filter_map(|uid| self.instances.get(uid))
            .map(|instance| instance.display_name().to_string())
            .collect()
    }

    pub fn frames(&self) -> impl Iterator<Item = (u32, &BTreeSet<ObjectUid>)> {
        self.frames.iter().map(|(frame, objects)| (*frame, objects))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames with at least one dynamic object.
    pub fn frames_with_dynamic_objects(&self) -> usize {
        self.frames.values().filter(|objects| !objects.is_empty()).count()
    }
}

/// Classify the objects of each frame against `instances.json`, keeping
/// only dynamic ones.
///
/// Fails when the instances file is missing or unreadable, or when a table
/// references a uid that `instances.json` does not define.
pub fn classify_dynamic_objects(
    instances_path: &Path,
    per_frame_tables: &[PerFrameTable],
) -> AnnotationResult<FramePresence> {
    classify(load_instances(instances_path)?, per_frame_tables)
}

fn classify(instances: InstanceMap, per_frame_tables: &[PerFrameTable]) -> AnnotationResult<FramePresence> {
    let dynamic = dynamic_uids(&instances);
    let merged = merge_tables(per_frame_tables);

    let mut frames = BTreeMap::new();
    for (frame, objects) in merged {
        if let Some(uid) = objects.iter().find(|uid| !instances.contains_key(*uid)) {
            return Err(AnnotationError::UnknownObject {
                uid: uid.clone(),
                frame,
            });
        }
        let visible: BTreeSet<ObjectUid> = objects.intersection(&dynamic).cloned().collect();
        frames.insert(frame, visible);
    }

    debug!(
        instances = instances.len(),
        dynamic = dynamic.len(),
        frames = frames.len(),
        "Classified dynamic objects"
    );

    Ok(FramePresence { instances, frames })
}

/// Every row of `table` must name an object defined in `instances`.
fn check_rows_defined(rows: &[AnnotationRow], instances: &InstanceMap, table: &Path) -> AnnotationResult<()> {
    match rows.iter().find(|row| !instances.contains_key(&row.object_uid)) {
        Some(row) => Err(AnnotationError::UndefinedObject {
            uid: row.object_uid.clone(),
            table: table.to_path_buf(),
        }),
        None => Ok(()),
    }
}

/// Normalize the ground truth of one recording against its frame timeline.
///
/// Reads `annotations/instances.json` and `annotations/2d_bounding_box.csv`
/// on a blocking thread.
pub async fn normalize_recording(
    layout: &RecordingLayout,
    timeline: &FrameTimeline,
    filter: &TableFilter,
) -> AnnotationResult<FramePresence> {
    let instances_path = layout.asset_path(AssetKind::Instances);
    let table_path = layout.asset_path(AssetKind::BoundingBox2d);
    let timeline = timeline.clone();
    let filter = filter.clone();
    let recording_id = layout.recording_id().clone();

    let presence = tokio::task::spawn_blocking(move || {
        // Loaded first so a recording lacking both reports the instances file
        let instances = load_instances(&instances_path)?;
        let rows = read_box_table(&table_path, &filter)?;
        // Checked before alignment so the outcome does not depend on sampling
        check_rows_defined(&rows, &instances, &table_path)?;
        let table = align_to_frames(&rows, &timeline);
        classify(instances, &[table])
    })
    .await
    .map_err(|e| AnnotationError::internal(format!("normalization task failed: {}", e)))??;

    info!(
        recording_id = %recording_id,
        frames = presence.frame_count(),
        frames_with_dynamic = presence.frames_with_dynamic_objects(),
        "Normalized annotations"
    );

    Ok(presence)
}
