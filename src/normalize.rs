use crate::detection::{Detection, DetectionBatch, RawResult};

/// Turns one image's detector output into log rows.
///
/// Rows keep the detector's order; confidence and corners are copied as-is.
/// A class index missing from the name table is recorded under its number.
pub fn normalize(raw: &RawResult, image_name: &str) -> DetectionBatch {
    raw.boxes
        .iter()
        .map(|b| {
            let [x1, y1, x2, y2] = b.xyxy.map(f64::from);
            Detection {
                image_name: image_name.to_string(),
                x1,
                y1,
                x2,
                y2,
                confidence: f64::from(b.confidence),
                class_id: Some(b.class_index as i64),
                class_name: raw
                    .names
                    .get(&b.class_index)
                    .cloned()
                    .unwrap_or_else(|| b.class_index.to_string()),
            }
        })
        .collect()
}
