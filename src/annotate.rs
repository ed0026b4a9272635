use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::io::Cursor;

use crate::detection::Detection;

const PALETTE: [[u8; 3]; 8] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
];

const THICKNESS: i32 = 2;

fn class_color(class_id: Option<i64>) -> Rgb<u8> {
    let idx = class_id.unwrap_or(0).unsigned_abs() as usize % PALETTE.len();
    Rgb(PALETTE[idx])
}

/// Copy of `image` with a box drawn around every detection.
pub fn draw_detections(image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut out = image.clone();
    let (w, h) = (out.width() as f64, out.height() as f64);
    if w == 0.0 || h == 0.0 {
        return out;
    }

    for det in detections {
        let x1 = det.x1.min(det.x2).clamp(0.0, w - 1.0) as i32;
        let y1 = det.y1.min(det.y2).clamp(0.0, h - 1.0) as i32;
        let x2 = det.x1.max(det.x2).clamp(0.0, w - 1.0) as i32;
        let y2 = det.y1.max(det.y2).clamp(0.0, h - 1.0) as i32;
        let color = class_color(det.class_id);

        for t in 0..THICKNESS {
            let bw = x2 - x1 - 2 * t;
            let bh = y2 - y1 - 2 * t;
            if bw <= 0 || bh <= 0 {
                break;
            }
            let rect = Rect::at(x1 + t, y1 + t).of_size(bw as u32 + 1, bh as u32 + 1);
            draw_hollow_rect_mut(&mut out, rect, color);
        }
    }
    out
}

/// Output name for an annotated copy. Keeps the source extension in the
/// stem so `a.jpg` and `a.png` do not collide.
pub fn annotated_file_name(image_name: &str) -> String {
    format!("{image_name}.png")
}

pub fn encode_png(image: &RgbImage) -> image::ImageResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64) -> Detection {
        Detection {
            image_name: "t.png".into(),
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            class_id: Some(0),
            class_name: "nevus".into(),
        }
    }

    #[test]
    fn draws_box_edges_only() {
        let img = RgbImage::from_pixel(50, 50, Rgb([0, 0, 0]));
        let out = draw_detections(&img, &[det(10.0, 10.0, 30.0, 30.0)]);

        assert_eq!(*out.get_pixel(10, 10), Rgb(PALETTE[0]));
        assert_eq!(*out.get_pixel(30, 20), Rgb(PALETTE[0]));
        assert_eq!(*out.get_pixel(20, 20), Rgb([0, 0, 0]));
        // source untouched
        assert_eq!(*img.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn boxes_outside_the_image_are_clamped() {
        let img = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let out = draw_detections(&img, &[det(-50.0, -5.0, 500.0, 500.0)]);
        assert_eq!(*out.get_pixel(0, 0), Rgb(PALETTE[0]));
        assert_eq!(*out.get_pixel(19, 19), Rgb(PALETTE[0]));
    }

    #[test]
    fn annotated_names_keep_source_extension() {
        assert_eq!(annotated_file_name("a.jpg"), "a.jpg.png");
        assert_ne!(annotated_file_name("a.jpg"), annotated_file_name("a.png"));
    }

    #[test]
    fn png_roundtrips_dimensions() {
        let img = RgbImage::from_pixel(7, 5, Rgb([1, 2, 3]));
        let bytes = encode_png(&img).unwrap();
        let back = image::load_from_memory(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (7, 5));
    }
}
