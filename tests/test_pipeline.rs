mod common;

use common::{service_with, upload, FailingDetector, FakeDetector};
use lesion_review::error::ReviewError;
use lesion_review::service::Upload;
use lesion_review::summary::ClassCount;

#[test]
fn predict_saves_rows_and_reports_per_image() -> anyhow::Result<()> {
    let (review, _dir) = service_with(FakeDetector);

    let report = review.predict(&[upload("a.png", 20), upload("b.PNG", 20)])?;
    assert_eq!(report.predictions.len(), 2);
    assert!(report.errors.is_empty());
    assert_eq!(report.saved_rows, 4);

    let first = &report.predictions[0];
    assert_eq!(first.image_name, "a.png");
    assert_eq!(first.rows[0].name, "nevus");
    assert_eq!(first.rows[0].confidence, 0.875);
    assert!(first.message.is_none());
    assert!(!first.annotated_png_base64.is_empty());

    let log = review.history()?;
    let images: Vec<_> = log.iter().map(|d| d.image_name.as_str()).collect();
    assert_eq!(images, ["a.png", "a.png", "b.PNG", "b.PNG"]);
    Ok(())
}

#[test]
fn empty_detection_is_informational_and_saves_nothing() -> anyhow::Result<()> {
    let (review, dir) = service_with(FakeDetector);

    let report = review.predict(&[upload("tiny.png", 4)])?;
    assert_eq!(report.saved_rows, 0);
    assert_eq!(report.predictions[0].message.as_deref(), Some("No detections in tiny.png."));
    assert!(report.predictions[0].rows.is_empty());
    assert!(review.history()?.is_empty());
    assert!(!dir.path().join("predictions.csv").exists());
    Ok(())
}

#[test]
fn bad_files_are_reported_without_stopping_the_rest() -> anyhow::Result<()> {
    let (review, _dir) = service_with(FakeDetector);

    let report = review.predict(&[
        Upload { name: "broken.jpg".into(), bytes: b"not an image".to_vec() },
        upload("notes.gif", 20),
        upload("ok.png", 20),
    ])?;

    assert_eq!(report.predictions.len(), 1);
    assert_eq!(report.predictions[0].image_name, "ok.png");
    let failed: Vec<_> = report.errors.iter().map(|e| e.image_name.as_str()).collect();
    assert_eq!(failed, ["broken.jpg", "notes.gif"]);
    assert!(report.errors[1].error.contains("unsupported"));
    assert_eq!(report.saved_rows, 2);
    Ok(())
}

#[test]
fn nothing_decodable_is_an_error() {
    let (review, _dir) = service_with(FakeDetector);
    let res = review.predict(&[Upload { name: "x.png".into(), bytes: vec![0, 1, 2] }]);
    assert!(matches!(res, Err(ReviewError::NoImages)));
}

#[test]
fn detector_failure_saves_nothing() {
    let (review, _dir) = service_with(FailingDetector);
    let res = review.predict(&[upload("a.png", 20)]);
    assert!(matches!(res, Err(ReviewError::Detector(_))));
    assert!(review.history().unwrap().is_empty());
}

#[test]
fn summary_accumulates_across_runs_until_cleared() -> anyhow::Result<()> {
    let (review, _dir) = service_with(FakeDetector);

    review.predict(&[upload("a.png", 20)])?;
    review.predict(&[upload("b.png", 20), upload("c.png", 4)])?;

    assert_eq!(
        review.summary()?,
        vec![
            ClassCount { name: "melanoma".into(), count: 2 },
            ClassCount { name: "nevus".into(), count: 2 },
        ]
    );
    assert_eq!(review.history()?, review.history()?);
    assert!(review.chart()?.contains("Class counts in predictions.csv"));

    review.clear()?;
    assert!(review.summary()?.is_empty());
    review.clear()?;
    Ok(())
}
