mod common;

use std::fs;

use common::{frontal_face, turned_face, write_image, ScriptedDetector};
use fwhr::{BatchJob, Error, FailurePolicy, FwhrEstimator, SortKey};

/// a.jpg: ratio 2.0, b.png: turned away, c.jpg: ratio 2.5
fn three_images() -> (tempfile::TempDir, FwhrEstimator<ScriptedDetector>) {
    let dir = tempfile::tempdir().unwrap();
    write_image(dir.path(), "c.jpg", 12);
    write_image(dir.path(), "a.jpg", 10);
    write_image(dir.path(), "b.png", 11);

    let detector = ScriptedDetector::default()
        .with_face(10, frontal_face(100))
        .with_face(11, turned_face())
        .with_face(12, frontal_face(80));
    (dir, FwhrEstimator::new(detector))
}

#[test]
fn ratio_sort_puts_unsuitable_pictures_last() {
    let (dir, mut estimator) = three_images();

    let report = BatchJob::new(dir.path(), "ratio")
        .unwrap()
        .run(&mut estimator)
        .unwrap();

    assert_eq!(report.records.len(), 3);
    assert!(report.failures.is_empty());
    assert_eq!(report.output, dir.path().join("fwhr_ratios.csv"));

    let csv = fs::read_to_string(&report.output).unwrap();
    assert_eq!(csv, "Filename,Ratio\na.jpg,2.0\nc.jpg,2.5\nb.png,\n");
}

#[test]
fn filename_sort() {
    let (dir, mut estimator) = three_images();

    let report = BatchJob::with_sort_key(dir.path(), SortKey::Filename)
        .run(&mut estimator)
        .unwrap();

    let names: Vec<_> = report.records.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, ["a.jpg", "b.png", "c.jpg"]);
    assert_eq!(report.records[1].ratio, None);

    let csv = fs::read_to_string(&report.output).unwrap();
    assert_eq!(csv, "Filename,Ratio\na.jpg,2.0\nb.png,\nc.jpg,2.5\n");
}

#[test]
fn unknown_sort_key_writes_nothing() {
    let (dir, mut estimator) = three_images();

    let err = BatchJob::new(dir.path(), "size").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(err.to_string().contains("size"));

    assert_eq!(estimator.detector().calls, 0);
    assert!(!dir.path().join("fwhr_ratios.csv").exists());
}

#[test]
fn other_files_are_ignored() {
    let (dir, mut estimator) = three_images();
    fs::write(dir.path().join("notes.txt"), "not a picture").unwrap();
    fs::write(dir.path().join("upper.JPG"), b"garbage").unwrap();
    fs::write(dir.path().join("photo.jpeg"), b"garbage").unwrap();

    let report = BatchJob::new(dir.path(), "filename")
        .unwrap()
        .run(&mut estimator)
        .unwrap();

    assert_eq!(report.records.len(), 3);
    assert_eq!(estimator.detector().calls, 3);
}

#[test]
fn missing_face_aborts_by_default() {
    let (dir, mut estimator) = three_images();
    write_image(dir.path(), "crowd.png", 99);

    let err = BatchJob::new(dir.path(), "filename")
        .unwrap()
        .run(&mut estimator)
        .unwrap_err();

    match err {
        Error::NoFaceDetected { image } => assert!(image.ends_with("crowd.png")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("fwhr_ratios.csv").exists());
}

#[test]
fn keep_going_records_failures_with_empty_ratio() {
    let (dir, mut estimator) = three_images();
    write_image(dir.path(), "crowd.png", 99);
    fs::write(dir.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();

    let report = BatchJob::new(dir.path(), "ratio")
        .unwrap()
        .failure_policy(FailurePolicy::Continue)
        .run(&mut estimator)
        .unwrap();

    let failed: Vec<_> = report.failures.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(failed, ["broken.jpg", "crowd.png"]);

    let csv = fs::read_to_string(&report.output).unwrap();
    assert_eq!(
        csv,
        "Filename,Ratio\na.jpg,2.0\nc.jpg,2.5\nb.png,\nbroken.jpg,\ncrowd.png,\n"
    );
}

#[test]
fn empty_folder_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut estimator = FwhrEstimator::new(ScriptedDetector::default());

    let report = BatchJob::new(dir.path(), "ratio")
        .unwrap()
        .run(&mut estimator)
        .unwrap();

    assert!(report.records.is_empty());
    assert_eq!(fs::read_to_string(&report.output).unwrap(), "Filename,Ratio\n");
}

#[cfg(unix)]
#[test]
fn symlinked_images_are_measured() {
    let photos = tempfile::tempdir().unwrap();
    write_image(photos.path(), "face.jpg", 10);

    let dir = tempfile::tempdir().unwrap();
    std::os::unix::fs::symlink(photos.path().join("face.jpg"), dir.path().join("link.jpg")).unwrap();

    let detector = ScriptedDetector::default().with_face(10, frontal_face(100));
    let mut estimator = FwhrEstimator::new(detector);
    let report = BatchJob::new(dir.path(), "filename")
        .unwrap()
        .run(&mut estimator)
        .unwrap();

    assert_eq!(
        fs::read_to_string(&report.output).unwrap(),
        "Filename,Ratio\nlink.jpg,2.0\n"
    );
}
