use base64::{prelude::BASE64_STANDARD, Engine};
use image::RgbImage;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::annotate::{draw_detections, encode_png};
use crate::detection::{Detection, DetectionBatch, RawResult};
use crate::error::{ReviewError, ReviewResult};
use crate::normalize::normalize;
use crate::store::PredictionStore;
use crate::summary::{render_bar_chart, summarize, ClassCount};

/// Black-box object detector. Built once at startup and shared.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> anyhow::Result<RawResult>;
}

const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

/// A file as received from the user, not yet decoded.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisplayRow {
    pub image_name: String,
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImagePrediction {
    pub image_name: String,
    pub rows: Vec<DisplayRow>,
    pub detections: DetectionBatch,
    /// Set when nothing was detected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    pub annotated: RgbImage,
    pub annotated_png_base64: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub image_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub predictions: Vec<ImagePrediction>,
    pub errors: Vec<FileError>,
    pub saved_rows: usize,
    pub log_path: String,
}

/// Decodes an upload to RGB, rejecting anything that is not jpeg/jpg/png.
pub fn decode_upload(upload: &Upload) -> ReviewResult<RgbImage> {
    let ext = Path::new(&upload.name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ReviewError::UnsupportedFormat(upload.name.clone()));
    }

    image::load_from_memory(&upload.bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| ReviewError::Decode {
            name: upload.name.clone(),
            reason: e.to_string(),
        })
}

/// The review pipeline: detect, normalize, annotate, log, summarize.
#[derive(Clone)]
pub struct ReviewService {
    detector: Arc<dyn Detector>,
    store: Arc<PredictionStore>,
}

impl ReviewService {
    pub fn new(detector: Arc<dyn Detector>, store: Arc<PredictionStore>) -> Self {
        Self { detector, store }
    }

    pub fn store(&self) -> &PredictionStore {
        &self.store
    }

    /// Runs every decodable upload through the detector and appends all
    /// resulting rows to the log in one go. Files that fail to decode are
    /// reported and skipped; a detector failure aborts without saving.
    pub fn predict(&self, uploads: &[Upload]) -> ReviewResult<PredictionReport> {
        let mut errors = Vec::new();
        let mut images = Vec::new();
        for upload in uploads {
            match decode_upload(upload) {
                Ok(img) => images.push((upload.name.clone(), img)),
                Err(e) => {
                    warn!("skipping {}: {}", upload.name, e);
                    errors.push(FileError {
                        image_name: upload.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        if images.is_empty() {
            return Err(ReviewError::NoImages);
        }

        let mut predictions = Vec::with_capacity(images.len());
        for (name, img) in images {
            let raw = self.detector.detect(&img).map_err(ReviewError::Detector)?;
            let batch = normalize(&raw, &name);
            info!("{}: {} detections", name, batch.len());

            let annotated = draw_detections(&img, &batch);
            let png = encode_png(&annotated).map_err(|e| ReviewError::Encode {
                name: name.clone(),
                reason: e.to_string(),
            })?;

            predictions.push(ImagePrediction {
                rows: batch
                    .iter()
                    .map(|d| DisplayRow {
                        image_name: d.image_name.clone(),
                        name: d.class_name.clone(),
                        confidence: d.confidence,
                    })
                    .collect(),
                message: batch.is_empty().then(|| format!("No detections in {name}.")),
                image_name: name,
                detections: batch,
                annotated,
                annotated_png_base64: BASE64_STANDARD.encode(png),
            });
        }

        let batches: Vec<DetectionBatch> = predictions.iter().map(|p| p.detections.clone()).collect();
        let saved_rows = self.store.append(&batches)?;

        Ok(PredictionReport {
            predictions,
            errors,
            saved_rows,
            log_path: self.store.path().display().to_string(),
        })
    }

    pub fn history(&self) -> ReviewResult<Vec<Detection>> {
        self.store.read_all()
    }

    pub fn summary(&self) -> ReviewResult<Vec<ClassCount>> {
        Ok(summarize(&self.store.read_all()?))
    }

    pub fn chart(&self) -> ReviewResult<String> {
        let source = self
            .store
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.store.path().display().to_string());
        Ok(render_bar_chart(&self.summary()?, &source))
    }

    pub fn clear(&self) -> ReviewResult<()> {
        self.store.clear()
    }
}
