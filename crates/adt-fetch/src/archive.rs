//! Ground-truth archive unpacking.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use adt_models::AssetKind;
use tracing::{debug, info};

use crate::client::part_path;
use crate::error::{FetchError, FetchResult};

/// Written into `annotations/` once every table of the archive is in place.
/// Lists the unpacked tables, one file name per line.
pub const UNPACKED_MARKER: &str = ".groundtruth_unpacked";

/// Unpack the annotation tables contained in a ground-truth zip into
/// `annotations_dir`, flattening any directory prefix.
///
/// Entries that are not known annotation tables are skipped. Returns the
/// kinds that were unpacked. Fails if the archive has no `instances.json`;
/// [`UNPACKED_MARKER`] is only written on success.
pub async fn unpack_groundtruth(archive: &Path, annotations_dir: &Path) -> FetchResult<Vec<AssetKind>> {
    let archive = archive.to_path_buf();
    let annotations_dir = annotations_dir.to_path_buf();

    tokio::task::spawn_blocking(move || unpack_blocking(&archive, &annotations_dir))
        .await
        .map_err(|e| FetchError::archive(format!("unpack task failed: {}", e)))?
}

fn unpack_blocking(archive: &Path, annotations_dir: &Path) -> FetchResult<Vec<AssetKind>> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    std::fs::create_dir_all(annotations_dir)?;

    let mut unpacked = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        let Some(file_name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        else {
            debug!(entry = entry.name(), "Skipping archive entry with unsafe path");
            continue;
        };

        let Some(kind) = AssetKind::ANNOTATION_TABLES
            .into_iter()
            .find(|k| k.file_name() == file_name)
        else {
            debug!(entry = %file_name, "Skipping non-annotation archive entry");
            continue;
        };

        if unpacked.contains(&kind) {
            continue;
        }

        let dest = annotations_dir.join(&file_name);
        let part = part_path(&dest);
        {
            let mut out = BufWriter::new(File::create(&part)?);
            std::io::copy(&mut entry, &mut out)?;
            out.flush()?;
        }
        std::fs::rename(&part, &dest)?;
        unpacked.push(kind);
    }

    if !unpacked.contains(&AssetKind::Instances) {
        return Err(FetchError::archive(format!(
            "{} does not contain {}",
            archive.display(),
            AssetKind::Instances.file_name()
        )));
    }

    let listing: String = unpacked.iter().map(|k| format!("{}\n", k.file_name())).collect();
    std::fs::write(annotations_dir.join(UNPACKED_MARKER), listing)?;

    info!(
        archive = %archive.display(),
        tables = unpacked.len(),
        "Unpacked ground-truth archive"
    );
    Ok(unpacked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, files: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in files {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_unpack_flattens_and_filters() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("groundtruth.zip");
        write_zip(
            &archive,
            &[
                ("seq1/instances.json", "{}"),
                ("seq1/2d_bounding_box.csv", "object_uid,timestamp[ns]\n"),
                ("seq1/depth_images.vrs", "binary"),
            ],
        );

        let annotations = dir.path().join("annotations");
        let kinds = unpack_groundtruth(&archive, &annotations).await.unwrap();

        assert_eq!(kinds, vec![AssetKind::Instances, AssetKind::BoundingBox2d]);
        assert!(annotations.join("instances.json").exists());
        assert!(annotations.join("2d_bounding_box.csv").exists());
        assert!(!annotations.join("depth_images.vrs").exists());
        assert_eq!(
            std::fs::read_to_string(annotations.join(UNPACKED_MARKER)).unwrap(),
            "instances.json\n2d_bounding_box.csv\n"
        );
    }

    #[tokio::test]
    async fn test_unpack_requires_instances() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("groundtruth.zip");
        write_zip(&archive, &[("metadata.json", "{}")]);

        let annotations = dir.path().join("annotations");
        let err = unpack_groundtruth(&archive, &annotations).await.unwrap_err();
        assert!(matches!(err, FetchError::Archive(_)));
        assert!(!annotations.join(UNPACKED_MARKER).exists());
    }

    #[tokio::test]
    async fn test_unpack_corrupt_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("groundtruth.zip");
        std::fs::write(&archive, b"not a zip").unwrap();

        let err = unpack_groundtruth(&archive, &dir.path().join("annotations"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Archive(_)));
    }
}
