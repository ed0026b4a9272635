use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One row of the prediction log.
///
/// Field order is the column order of the persisted CSV. Numbers are f64 so
/// rows written elsewhere at full precision survive a rewrite unchanged.
/// `class_id` is optional because logs written before it existed lack the
/// column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub image_name: String,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
    #[serde(default, deserialize_with = "deserialize_class_id")]
    pub class_id: Option<i64>,
    #[serde(rename = "name")]
    pub class_name: String,
}

// A column holding blanks is written as floats ("1.0") by pandas.
fn deserialize_class_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<f64>::deserialize(d)? {
        None => Ok(None),
        Some(v) if v.is_finite() && v.fract() == 0.0 => Ok(Some(v as i64)),
        Some(v) => Err(D::Error::custom(format!("class_id {v} is not an integer"))),
    }
}

/// All detections for one image, in detector order. May be empty.
pub type DetectionBatch = Vec<Detection>;

/// A single region as reported by the detector, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBox {
    pub class_index: usize,
    pub confidence: f32,
    /// x1, y1, x2, y2 in source-image pixels.
    pub xyxy: [f32; 4],
}

/// Detector output for one image plus the index-to-name table of the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub boxes: Vec<RawBox>,
    pub names: BTreeMap<usize, String>,
}

impl RawResult {
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,       // square model input, 640 for ultralytics exports
    pub conf_threshold: f32,   // 0..1
    pub iou_threshold: f32,    // 0..1
    pub max_detections: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}
