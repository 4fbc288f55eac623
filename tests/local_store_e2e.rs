//! Full runs against a directory-backed store
//!
//! Uses the offline keyword model so the whole classification path runs
//! without network access; OCR is scripted.

use notefiler::classify::{KeywordModel, SubjectVocabulary, UNCATEGORIZED};
use notefiler::ocr::MockOcr;
use notefiler::pipeline::{NoteStatus, PipelineConfig, PipelineOrchestrator};
use notefiler::store::{LocalStore, BASE_FOLDER_NAME};
use notefiler::ConfidenceClassifier;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

async fn orchestrator(store_root: &std::path::Path, ocr: Arc<MockOcr>) -> PipelineOrchestrator {
    orchestrator_with(store_root, ocr, SubjectVocabulary::builtin()).await
}

async fn orchestrator_with(
    store_root: &std::path::Path,
    ocr: Arc<MockOcr>,
    vocabulary: SubjectVocabulary,
) -> PipelineOrchestrator {
    let store = LocalStore::open(store_root)
        .await
        .expect("Failed to open local store");
    let classifier = ConfidenceClassifier::new(
        Arc::new(KeywordModel::new()),
        Arc::new(vocabulary),
    );
    PipelineOrchestrator::new(
        ocr,
        Arc::new(classifier),
        Arc::new(store),
        PipelineConfig::new().with_workers(2),
    )
}

#[tokio::test]
async fn test_directory_of_scans_is_organized() {
    let scans = TempDir::new().unwrap();
    let drive = TempDir::new().unwrap();

    for name in ["algebra.png", "cells.JPG", "blank.tiff", "readme.md"] {
        fs::write(scans.path().join(name), b"scan").unwrap();
    }

    let ocr = Arc::new(MockOcr::new());
    ocr.add_text(
        "algebra.png",
        "Solve the quadratic equation using the formula; algebra and calculus review",
    );
    ocr.add_text(
        "cells.JPG",
        "Cells divide by mitosis; genetics and evolution of living organisms",
    );
    ocr.add_text("blank.tiff", "");

    let report = orchestrator(drive.path(), ocr.clone())
        .await
        .run(&[scans.path().to_path_buf()], 0.3, None)
        .await
        .unwrap();

    // readme.md is not an image and is skipped during discovery
    assert_eq!(report.notes.len(), 3);
    assert_eq!(report.summary.failed, 0);

    let base = drive.path().join(BASE_FOLDER_NAME);
    assert!(base.join("mathematics").join("algebra.png").is_file());
    assert!(base.join("biology").join("cells.JPG").is_file());
    assert!(base.join(UNCATEGORIZED).join("blank.tiff").is_file());

    let blank = report
        .notes
        .iter()
        .find(|n| n.path.ends_with("blank.tiff"))
        .unwrap();
    assert_eq!(blank.status, NoteStatus::Uploaded);
}

#[tokio::test]
async fn test_second_run_versions_instead_of_overwriting() {
    let scans = TempDir::new().unwrap();
    let drive = TempDir::new().unwrap();
    let scan = scans.path().join("notes.png");
    fs::write(&scan, b"first").unwrap();

    let ocr = Arc::new(MockOcr::new().with_fallback(""));

    let first = orchestrator(drive.path(), ocr.clone())
        .await
        .run(&[scan.clone()], 0.3, None)
        .await
        .unwrap();
    let second = orchestrator(drive.path(), ocr.clone())
        .await
        .run(&[scan], 0.3, None)
        .await
        .unwrap();

    assert_eq!(first.summary.folders_created, 2);
    assert_eq!(second.summary.folders_created, 0);

    let folder = drive.path().join(BASE_FOLDER_NAME).join(UNCATEGORIZED);
    assert!(folder.join("notes.png").is_file());
    assert!(folder.join("notes (1).png").is_file());
    assert_eq!(
        second.notes[0]
            .destination
            .as_ref()
            .unwrap()
            .remote_name
            .as_deref(),
        Some("notes (1).png")
    );
}

#[tokio::test]
async fn test_custom_subject_gets_its_own_folder() {
    let scans = TempDir::new().unwrap();
    let drive = TempDir::new().unwrap();
    let subjects = scans.path().join("subjects.yaml");
    fs::write(
        &subjects,
        "- label: robotics\n  description: actuators, sensors, kinematics, servo motors\n",
    )
    .unwrap();
    let scan = scans.path().join("arm.png");
    fs::write(&scan, b"scan").unwrap();

    let ocr = Arc::new(MockOcr::new());
    ocr.add_text("arm.png", "Servo actuators calibrated against joint sensors");

    let vocabulary = SubjectVocabulary::load(Some(&subjects)).unwrap();
    let report = orchestrator_with(drive.path(), ocr, vocabulary)
        .await
        .run(&[scan], 0.3, None)
        .await
        .unwrap();

    let verdict = report.notes[0].verdict.as_ref().unwrap();
    assert_eq!(verdict.subject, "robotics");
    assert!(drive
        .path()
        .join(BASE_FOLDER_NAME)
        .join("robotics")
        .join("arm.png")
        .is_file());
}
