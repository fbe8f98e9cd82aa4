//! End-to-end tests of the fetch and prepare stages.

use std::path::Path;

use adt_models::TrainingRecord;
use adt_pipeline::{
    run_fetch_stage, run_prepare_stage, ExclusionReason, ExtractionStatus, PipelineConfig,
    RecordingOutcome,
};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const INSTANCES: &str = r#"{
    "1": { "instance_name": "Mug", "motion_type": "dynamic" },
    "2": { "instance_name": "Shelf", "motion_type": "static" },
    "3": { "instance_name": "Remote", "motion_type": "dynamic" }
}"#;

/// Lay out a recording the way the fetch stage leaves it, with one frame
/// per second.
fn seed_recording(dataset_dir: &Path, id: &str, frames: usize, boxes: &str, instances: Option<&str>) {
    let root = dataset_dir.join(id);
    let frames_dir = root.join("frames");
    let annotations = root.join("annotations");
    std::fs::create_dir_all(&frames_dir).unwrap();
    std::fs::create_dir_all(&annotations).unwrap();

    for i in 1..=frames {
        std::fs::write(frames_dir.join(format!("frame_{:04}.jpg", i)), b"\xff\xd8jpg").unwrap();
    }
    let timestamps: Vec<f64> = (0..frames).map(|i| i as f64).collect();
    std::fs::write(
        frames_dir.join("frames.json"),
        serde_json::json!({
            "sampling": "fps:1",
            "source_fps": 30.0,
            "duration_secs": frames as f64,
            "timestamps_secs": timestamps,
        })
        .to_string(),
    )
    .unwrap();

    std::fs::write(annotations.join("2d_bounding_box.csv"), boxes).unwrap();
    if let Some(instances) = instances {
        std::fs::write(annotations.join("instances.json"), instances).unwrap();
    }
}

fn config(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        dataset_dir: dir.path().join("aria_dataset"),
        output_dir: dir.path().join("prepared_dataset"),
        ..Default::default()
    }
}

fn read_output(path: &Path) -> Vec<TrainingRecord> {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_prepare_stage_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);

    seed_recording(
        &config.dataset_dir,
        "Apartment_release_work_seq2",
        3,
        "stream_id,object_uid,timestamp[ns],visibility_ratio[%]\n\
         214-1,1,7000000000,0.9\n\
         214-1,2,7000000000,0.9\n\
         1201-1,3,7000000000,0.9\n\
         214-1,3,8000000000,0.7\n\
         214-1,2,9000000000,1.0\n",
        Some(INSTANCES),
    );
    seed_recording(
        &config.dataset_dir,
        "Apartment_release_clean_seq1",
        2,
        "stream_id,object_uid,timestamp[ns],visibility_ratio[%]\n214-1,3,0,1.0\n",
        Some(INSTANCES),
    );

    let report = run_prepare_stage(&config).await.unwrap();
    assert_eq!(report.included_count(), 2);
    assert_eq!(report.records_written, 5);

    let records = read_output(&report.output_path);
    assert_eq!(report.output_path, config.output_dir.join("dataset.json"));

    let images: Vec<&str> = records.iter().map(|r| r.image.as_str()).collect();
    assert_eq!(
        images,
        vec![
            "Apartment_release_clean_seq1/frames/frame_0001.jpg",
            "Apartment_release_clean_seq1/frames/frame_0002.jpg",
            "Apartment_release_work_seq2/frames/frame_0001.jpg",
            "Apartment_release_work_seq2/frames/frame_0002.jpg",
            "Apartment_release_work_seq2/frames/frame_0003.jpg",
        ]
    );

    assert_eq!(records[0].dynamic_objects, vec!["Remote"]);
    assert!(records[0].prompt.ends_with("ASSISTANT: Clean."));
    assert_eq!(records[2].dynamic_objects, vec!["Mug"]);
    assert_eq!(records[3].dynamic_objects, vec!["Remote"]);
    assert!(records[4].dynamic_objects.is_empty());
    assert!(records[4].prompt.contains("Dynamic Objects: none"));
    assert!(records[4].prompt.ends_with("ASSISTANT: Work."));

    for record in &records {
        assert!(config.dataset_dir.join(&record.image).is_file());
    }
}

#[tokio::test]
async fn test_empty_dynamic_objects_serialized_as_empty_list() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    seed_recording(
        &config.dataset_dir,
        "seq",
        1,
        "object_uid,timestamp[ns]\n2,100\n",
        Some(INSTANCES),
    );

    let report = run_prepare_stage(&config).await.unwrap();

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&report.output_path).unwrap()).unwrap();
    assert_eq!(json[0]["dynamic_objects"], serde_json::json!([]));
}

#[tokio::test]
async fn test_missing_instances_excluded() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    seed_recording(&config.dataset_dir, "seq_ok", 2, "object_uid,timestamp[ns]\n1,0\n", Some(INSTANCES));
    seed_recording(&config.dataset_dir, "seq_missing", 2, "object_uid,timestamp[ns]\n1,0\n", None);

    let report = run_prepare_stage(&config).await.unwrap();

    assert_eq!(report.included_count(), 1);
    assert_eq!(report.exclusion_counts()["annotations"], 1);
    let excluded: Vec<_> = report.excluded().collect();
    assert_eq!(excluded[0].0.as_str(), "seq_missing");

    let records = read_output(&report.output_path);
    assert!(records.iter().all(|r| r.image.starts_with("seq_ok/")));
}

#[tokio::test]
async fn test_unknown_object_excludes_only_that_recording() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    seed_recording(&config.dataset_dir, "seq_a", 2, "object_uid,timestamp[ns]\n1,0\n", Some(INSTANCES));
    seed_recording(
        &config.dataset_dir,
        "seq_b",
        2,
        "object_uid,timestamp[ns]\n1,0\nobj_42,1000000000\n",
        Some(INSTANCES),
    );
    seed_recording(&config.dataset_dir, "seq_c", 1, "object_uid,timestamp[ns]\n3,0\n", Some(INSTANCES));

    let report = run_prepare_stage(&config).await.unwrap();

    let outcomes: Vec<(&str, &RecordingOutcome)> = report
        .recordings
        .iter()
        .map(|r| (r.recording_id.as_str(), &r.outcome))
        .collect();
    assert_eq!(outcomes[0], ("seq_a", &RecordingOutcome::Included { records: 2 }));
    match outcomes[1] {
        ("seq_b", RecordingOutcome::Excluded(ExclusionReason::Annotations(msg))) => {
            assert!(msg.contains("obj_42"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(outcomes[2], ("seq_c", &RecordingOutcome::Included { records: 1 }));
    assert_eq!(report.records_written, 3);
}

#[tokio::test]
async fn test_prepare_overwrites_previous_output() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    seed_recording(&config.dataset_dir, "seq", 2, "object_uid,timestamp[ns]\n1,0\n", Some(INSTANCES));

    let first = run_prepare_stage(&config).await.unwrap();
    assert_eq!(read_output(&first.output_path).len(), 2);

    std::fs::remove_file(config.dataset_dir.join("seq/frames/frame_0002.jpg")).unwrap();
    let second = run_prepare_stage(&config).await.unwrap();
    assert_eq!(read_output(&second.output_path).len(), 1);
}

#[tokio::test]
async fn test_fetch_stage_bounds_downloads_and_reports_extraction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not really a video"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut manifest = serde_json::Map::new();
    for i in 0..15 {
        let id = format!("Apartment_release_clean_seq{:03}", i);
        manifest.insert(
            id.clone(),
            serde_json::json!({
                "video": format!("{}/{}/video.mp4", server.uri(), id),
                "instances": format!("{}/{}/instances.json", server.uri(), id),
            }),
        );
    }
    manifest.insert(
        "no_video".to_string(),
        serde_json::json!({ "instances": format!("{}/x/instances.json", server.uri()) }),
    );
    let manifest_path = dir.path().join("download_urls.json");
    std::fs::write(&manifest_path, serde_json::Value::Object(manifest).to_string()).unwrap();

    let config = config(&dir);
    let report = run_fetch_stage(&config, &manifest_path).await.unwrap();

    assert_eq!(report.skipped_entries, 1);
    assert_eq!(report.fetch.recordings.len(), 10);
    assert_eq!(report.fetch.not_selected, 5);
    assert_eq!(report.fetch.complete_count(), 10);
    assert!(report.is_success());

    let on_disk = std::fs::read_dir(&config.dataset_dir).unwrap().count();
    assert_eq!(on_disk, 10);

    // The downloaded "videos" cannot be decoded
    assert_eq!(report.extractions.len(), 10);
    assert!(report
        .extractions
        .iter()
        .all(|e| matches!(e.status, ExtractionStatus::Failed(_))));
    assert_eq!(report.frames_extracted(), 0);
}

#[tokio::test]
async fn test_fetch_stage_rejects_malformed_manifest() {
    let dir = TempDir::new().unwrap();
    let manifest_path = dir.path().join("download_urls.json");
    std::fs::write(&manifest_path, "{ not json").unwrap();

    let err = run_fetch_stage(&config(&dir), &manifest_path).await.unwrap_err();
    assert!(matches!(err, adt_pipeline::PipelineError::Manifest(_)));
    assert!(!dir.path().join("aria_dataset").exists());
}

#[tokio::test]
async fn test_stages_reject_out_of_range_config() {
    let dir = TempDir::new().unwrap();
    let manifest_path = dir.path().join("download_urls.json");
    std::fs::write(&manifest_path, "{}").unwrap();
    let config = PipelineConfig {
        min_visibility: 50.0,
        ..config(&dir)
    };

    let err = run_fetch_stage(&config, &manifest_path).await.unwrap_err();
    assert!(matches!(err, adt_pipeline::PipelineError::ConfigError(_)));
    let err = run_prepare_stage(&config).await.unwrap_err();
    assert!(matches!(err, adt_pipeline::PipelineError::ConfigError(_)));
    assert!(!config.output_path().exists());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_full_pipeline_with_generated_video() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.mp4");
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", "testsrc=duration=2:size=160x120:rate=10"])
        .arg(&source)
        .status()
        .await
        .unwrap();
    assert!(status.success());

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/seq/video.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(std::fs::read(&source).unwrap()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/seq/instances.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INSTANCES))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/seq/2d_bounding_box.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "stream_id,object_uid,timestamp[ns],visibility_ratio[%]\n214-1,1,500,1.0\n214-1,2,1000000500,1.0\n",
        ))
        .mount(&server)
        .await;

    let manifest_path = dir.path().join("download_urls.json");
    std::fs::write(
        &manifest_path,
        serde_json::json!({
            "Apartment_release_cook_seq": {
                "video": format!("{}/seq/video.mp4", server.uri()),
                "instances": format!("{}/seq/instances.json", server.uri()),
                "2d_bounding_box": format!("{}/seq/2d_bounding_box.csv", server.uri()),
            }
        })
        .to_string(),
    )
    .unwrap();

    let config = PipelineConfig {
        sampling: "fps:2".parse().unwrap(),
        ..config(&dir)
    };
    let fetched = run_fetch_stage(&config, &manifest_path).await.unwrap();
    let frames = fetched.extractions[0].status.frame_count();
    assert!((3..=5).contains(&frames), "extracted {} frames", frames);

    let prepared = run_prepare_stage(&config).await.unwrap();
    let records = read_output(&prepared.output_path);
    assert_eq!(records.len(), frames);
    assert_eq!(records[0].dynamic_objects, vec!["Mug"]);
    assert!(records.last().unwrap().dynamic_objects.is_empty());
    for record in &records {
        assert!(config.dataset_dir.join(&record.image).is_file());
    }
}
