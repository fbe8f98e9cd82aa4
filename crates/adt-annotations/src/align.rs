//! Alignment of annotation rows to extracted frames.
//!
//! Annotation timestamps are device clock values, frame timestamps are
//! relative to the start of the video. Both are taken relative to their
//! first sample, and each frame is assigned the annotation timestamp group
//! with the greatest relative timestamp not after the frame (nearest
//! floor). Rows keyed by frame index are used as-is.

use std::collections::{BTreeMap, BTreeSet};

use adt_models::{FrameTimeline, ObjectUid};

use crate::table::{AnnotationRow, RowKey};

/// Frame index (1-based) to the objects observed in that frame.
pub type PerFrameTable = BTreeMap<u32, BTreeSet<ObjectUid>>;

/// Build a per-frame table for every frame of `timeline`.
///
/// Every frame of the timeline gets an entry, empty when no annotation
/// group precedes it. Frame-keyed rows beyond the timeline are kept so
/// that lookups against instance metadata still see them.
pub fn align_to_frames(rows: &[AnnotationRow], timeline: &FrameTimeline) -> PerFrameTable {
    let mut table: PerFrameTable = (1..=timeline.len() as u32).map(|i| (i, BTreeSet::new())).collect();

    let mut groups: BTreeMap<i64, BTreeSet<ObjectUid>> = BTreeMap::new();
    for row in rows {
        match row.key {
            RowKey::Frame(frame) => {
                table.entry(frame).or_default().insert(row.object_uid.clone());
            }
            RowKey::Timestamp(ts) => {
                groups.entry(ts).or_default().insert(row.object_uid.clone());
            }
        }
    }

    let Some(&origin) = groups.keys().next() else {
        return table;
    };

    for frame in 1..=timeline.len() as u32 {
        let Some(frame_ns) = timeline.timestamp_ns(frame) else {
            continue;
        };
        if let Some((_, objects)) = groups.range(..=origin.saturating_add(frame_ns)).next_back() {
            table.entry(frame).or_default().extend(objects.iter().cloned());
        }
    }

    table
}

/// Union of several per-frame tables.
pub fn merge_tables(tables: &[PerFrameTable]) -> PerFrameTable {
    let mut merged = PerFrameTable::new();
    for table in tables {
        for (frame, objects) in table {
            merged.entry(*frame).or_default().extend(objects.iter().cloned());
        }
    }
    merged
}
