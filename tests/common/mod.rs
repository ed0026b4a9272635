#![allow(dead_code)]

use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use lesion_review::detection::{RawBox, RawResult};
use lesion_review::service::{Detector, ReviewService, Upload};
use lesion_review::store::PredictionStore;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

/// Images wider than this get two detections, narrower ones none.
pub const DETECT_MIN_WIDTH: u32 = 16;

pub struct FakeDetector;

impl Detector for FakeDetector {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<RawResult> {
        let names = BTreeMap::from([(0, "melanoma".to_string()), (1, "nevus".to_string())]);
        if image.width() < DETECT_MIN_WIDTH {
            return Ok(RawResult { boxes: vec![], names });
        }
        Ok(RawResult {
            boxes: vec![
                RawBox { class_index: 1, confidence: 0.875, xyxy: [1.0, 1.0, 8.0, 8.0] },
                RawBox { class_index: 0, confidence: 0.5, xyxy: [2.5, 3.0, 12.0, 9.5] },
            ],
            names,
        })
    }
}

pub struct FailingDetector;

impl Detector for FailingDetector {
    fn detect(&self, _image: &RgbImage) -> anyhow::Result<RawResult> {
        anyhow::bail!("model exploded")
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: RgbImage = ImageBuffer::from_fn(width, height, |x, _| Rgb([(x * 10) as u8, 80, 160]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode test png");
    buf.into_inner()
}

pub fn upload(name: &str, width: u32) -> Upload {
    Upload { name: name.to_string(), bytes: png_bytes(width, 12) }
}

/// Service over a fresh log in a temp dir (keep the dir alive).
pub fn service_with(detector: impl Detector + 'static) -> (ReviewService, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let store = Arc::new(PredictionStore::new(dir.path().join("predictions.csv")));
    (ReviewService::new(Arc::new(detector), store), dir)
}
