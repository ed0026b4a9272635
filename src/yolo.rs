use anyhow::{bail, Context, Result};
use image::{imageops::FilterType, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::detection::{RawBox, RawResult, YoloParams};
use crate::service::Detector;

/// Ultralytics-style YOLO export run through onnxruntime.
///
/// Expects a single `[1, 4 + classes, candidates]` output with centre-xywh
/// boxes in input pixels.
pub struct YoloDetector {
    session: Mutex<Session>,
    names: BTreeMap<usize, String>,
    params: YoloParams,
}

impl YoloDetector {
    pub fn new(model_path: &Path, names: BTreeMap<usize, String>, params: YoloParams) -> Result<Self> {
        if params.input_size == 0 {
            bail!("input size must be positive");
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(model_path)
            .with_context(|| format!("loading ONNX model {}", model_path.display()))?;

        info!(
            "loaded YOLO ONNX model from {} ({} class names)",
            model_path.display(),
            names.len()
        );
        Ok(Self {
            session: Mutex::new(session),
            names,
            params,
        })
    }

    fn prepare_input(&self, img: &RgbImage) -> Result<Tensor<f32>> {
        let size = self.params.input_size;
        let resized = image::imageops::resize(img, size, size, FilterType::Triangle);

        let plane = (size * size) as usize;
        let mut data = vec![0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let i = (y * size + x) as usize;
            data[i] = pixel[0] as f32 / 255.0;
            data[plane + i] = pixel[1] as f32 / 255.0;
            data[2 * plane + i] = pixel[2] as f32 / 255.0;
        }

        let shape = vec![1i64, 3, size as i64, size as i64];
        Ok(Tensor::from_array((shape, data))?)
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &RgbImage) -> Result<RawResult> {
        let input = self.prepare_input(image)?;

        let (dims, data) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow::anyhow!("detector session lock poisoned"))?;
            let outputs = session.run(ort::inputs![input])?;
            let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            (dims, data.to_vec())
        };

        if dims.len() != 3 || dims[0] != 1 || dims[1] <= 4 {
            bail!("unexpected model output shape {:?}", dims);
        }

        let scale_x = image.width() as f32 / self.params.input_size as f32;
        let scale_y = image.height() as f32 / self.params.input_size as f32;
        let boxes = decode_output(&data, dims[1], dims[2], scale_x, scale_y, &self.params);
        debug!("{} boxes after nms", boxes.len());

        Ok(RawResult {
            boxes,
            names: self.names.clone(),
        })
    }
}

/// Reads one class name per line; line N (from 0) names class index N.
/// A blank line leaves its index unnamed without shifting later lines.
pub fn load_class_names(path: &Path) -> Result<BTreeMap<usize, String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading class names {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, name)| !name.is_empty())
        .map(|(i, name)| (i, name.to_string()))
        .collect())
}

/// Turns the raw `[4 + classes, candidates]` output into thresholded,
/// class-aware NMS'd boxes in source-image pixels, best first.
fn decode_output(
    data: &[f32],
    rows: usize,
    candidates: usize,
    scale_x: f32,
    scale_y: f32,
    params: &YoloParams,
) -> Vec<RawBox> {
    let at = |row: usize, i: usize| data[row * candidates + i];

    let mut boxes = Vec::new();
    for i in 0..candidates {
        let (class_index, confidence) = (4..rows)
            .map(|r| (r - 4, at(r, i)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if confidence < params.conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        boxes.push(RawBox {
            class_index,
            confidence,
            xyxy: [
                (cx - w / 2.0) * scale_x,
                (cy - h / 2.0) * scale_y,
                (cx + w / 2.0) * scale_x,
                (cy + h / 2.0) * scale_y,
            ],
        });
    }

    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<RawBox> = Vec::new();
    for candidate in boxes {
        if kept.len() >= params.max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_index == candidate.class_index && iou(&k.xyxy, &candidate.xyxy) > params.iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);
    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
