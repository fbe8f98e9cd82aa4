//! Per-frame bounding-box tables.
//!
//! ADT ships `2d_bounding_box.csv` with one row per (stream, object,
//! timestamp):
//!
//! ```text
//! stream_id,object_uid,timestamp[ns],x_min[pixel],x_max[pixel],y_min[pixel],y_max[pixel],visibility_ratio[%]
//! 214-1,101,14588206187000,10,40,12,60,0.83
//! ```
//!
//! Tables that carry an explicit `frame` column instead of a timestamp are
//! also accepted.

use std::path::Path;

use adt_models::ObjectUid;
use tracing::debug;

use crate::error::{AnnotationError, AnnotationResult};

/// RGB camera stream of the Aria glasses.
pub const DEFAULT_STREAM_ID: &str = "214-1";

const OBJECT_UID_COLUMN: &str = "object_uid";
const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp[ns]", "timestamp_ns", "timestamp"];
const FRAME_COLUMN: &str = "frame";
const STREAM_COLUMN: &str = "stream_id";
const VISIBILITY_COLUMNS: [&str; 2] = ["visibility_ratio[%]", "visibility_ratio"];

/// Row filters applied while reading a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFilter {
    /// Keep only rows of this stream. Ignored when the table has no
    /// `stream_id` column.
    pub stream_id: Option<String>,
    /// Drop rows whose visibility ratio is below this value.
    pub min_visibility: f64,
}

impl Default for TableFilter {
    fn default() -> Self {
        Self {
            stream_id: Some(DEFAULT_STREAM_ID.to_string()),
            min_visibility: 0.0,
        }
    }
}

/// Position of a row in the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowKey {
    /// Device timestamp in nanoseconds
    Timestamp(i64),
    /// 1-based frame index
    Frame(u32),
}

/// One object observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRow {
    pub object_uid: ObjectUid,
    pub key: RowKey,
}

struct Columns {
    object_uid: usize,
    key: KeyColumn,
    stream: Option<usize>,
    visibility: Option<usize>,
}

enum KeyColumn {
    Timestamp(usize),
    Frame(usize),
}

impl Columns {
    fn resolve(path: &Path, headers: &csv::StringRecord) -> AnnotationResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let find_any = |names: &[&str]| names.iter().find_map(|n| find(*n));

        let object_uid =
            find(OBJECT_UID_COLUMN).ok_or_else(|| AnnotationError::missing_column(path, OBJECT_UID_COLUMN))?;

        let key = match (find(FRAME_COLUMN), find_any(&TIMESTAMP_COLUMNS)) {
            (Some(idx), _) => KeyColumn::Frame(idx),
            (None, Some(idx)) => KeyColumn::Timestamp(idx),
            (None, None) => return Err(AnnotationError::missing_column(path, TIMESTAMP_COLUMNS[0])),
        };

        Ok(Self {
            object_uid,
            key,
            stream: find(STREAM_COLUMN),
            visibility: find_any(&VISIBILITY_COLUMNS),
        })
    }
}

/// Read a bounding-box table, applying `filter`.
///
/// Fails with [`AnnotationError::MissingTable`] when the file is absent.
pub fn read_box_table(path: &Path, filter: &TableFilter) -> AnnotationResult<Vec<AnnotationRow>> {
    if !path.exists() {
        return Err(AnnotationError::MissingTable(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let columns = Columns::resolve(path, reader.headers()?)?;

    let mut rows = Vec::new();
    let mut filtered = 0usize;
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let field = |idx: usize| record.get(idx).unwrap_or("");

        if let (Some(idx), Some(stream)) = (columns.stream, filter.stream_id.as_deref()) {
            if field(idx) != stream {
                filtered += 1;
                continue;
            }
        }

        if let Some(idx) = columns.visibility {
            let raw = field(idx);
            if !raw.is_empty() {
                let visibility: f64 = raw.parse().map_err(|_| {
                    AnnotationError::invalid_row(path, line, format!("invalid visibility `{}`", raw))
                })?;
                if visibility < filter.min_visibility {
                    filtered += 1;
                    continue;
                }
            }
        }

        let uid = field(columns.object_uid);
        if uid.is_empty() {
            return Err(AnnotationError::invalid_row(path, line, "empty object_uid"));
        }

        let key = match columns.key {
            KeyColumn::Timestamp(idx) => {
                let raw = field(idx);
                RowKey::Timestamp(raw.parse().map_err(|_| {
                    AnnotationError::invalid_row(path, line, format!("invalid timestamp `{}`", raw))
                })?)
            }
            KeyColumn::Frame(idx) => {
                let raw = field(idx);
                match raw.parse::<u32>() {
                    Ok(frame) if frame > 0 => RowKey::Frame(frame),
                    _ => {
                        return Err(AnnotationError::invalid_row(
                            path,
                            line,
                            format!("invalid frame index `{}`", raw),
                        ))
                    }
                }
            }
        };

        rows.push(AnnotationRow {
            object_uid: ObjectUid::from(uid),
            key,
        });
    }

    debug!(
        path = %path.display(),
        rows = rows.len(),
        filtered,
        "Read annotation table"
    );

    Ok(rows)
}
