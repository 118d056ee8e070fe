use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing;
use tracing::warn;

use crate::analyzer::FaceResult;

const GREEN: Rgb<u8> = Rgb([0u8, 255u8, 0u8]);
const LABEL_SCALE: f32 = 24.0;
/// Gap between a region's top edge and its label, in pixels.
const LABEL_GAP: i32 = 10;

/// Label fonts probed in order at startup.
const FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
];

/// Draws face boxes and emotion labels onto frames.
pub struct Annotator {
    font: Option<FontArc>,
}

impl Annotator {
    pub fn new() -> Annotator {
        let font = load_font();
        if font.is_none() {
            warn!("no label font found, drawing face boxes without text");
        }

        Annotator { font }
    }

    /// Draw a hollow box around each face and its dominant emotion above
    /// the box, in place.
    pub fn annotate(&self, img: &mut RgbImage, faces: &[FaceResult]) {
        for face in faces {
            if face.region.area() == 0 {
                continue;
            }

            drawing::draw_hollow_rect_mut(img, face.region.into(), GREEN);

            if let Some(font) = &self.font {
                let text = format!("Emotion: {}", face.dominant_emotion);
                let y = (face.region.y - LABEL_GAP - LABEL_SCALE as i32).max(0);
                drawing::draw_text_mut(
                    img,
                    GREEN,
                    face.region.x,
                    y,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &text,
                );
            }
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}

fn load_font() -> Option<FontArc> {
    for path in FONT_PATHS {
        if let Ok(data) = std::fs::read(path) {
            if let Ok(font) = FontArc::try_from_vec(data) {
                return Some(font);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::rect::Rect;
    use std::collections::BTreeMap;

    fn face(region: Rect) -> FaceResult {
        let mut emotion_scores = BTreeMap::new();
        emotion_scores.insert("happy".to_string(), 97.0);
        emotion_scores.insert("neutral".to_string(), 3.0);

        FaceResult {
            dominant_emotion: "happy".to_string(),
            emotion_scores,
            region,
            confidence: 97.0,
        }
    }

    #[test]
    fn test_draws_hollow_box_at_region_edges() {
        let annotator = Annotator { font: None };
        let mut img = RgbImage::new(100, 100);
        annotator.annotate(&mut img, &[face(Rect::new(10, 40, 30, 20))]);

        // corners of the box
        assert_eq!(img.get_pixel(10, 40), &GREEN);
        assert_eq!(img.get_pixel(39, 40), &GREEN);
        assert_eq!(img.get_pixel(10, 59), &GREEN);
        assert_eq!(img.get_pixel(39, 59), &GREEN);

        // interior stays untouched
        assert_eq!(img.get_pixel(25, 50), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_skips_empty_region() {
        let annotator = Annotator { font: None };
        let mut img = RgbImage::new(16, 16);
        annotator.annotate(&mut img, &[face(Rect::new(5, 5, 0, 0))]);

        assert!(img.pixels().all(|p| p == &Rgb([0, 0, 0])));
    }

    #[test]
    fn test_no_faces_leaves_frame_unchanged() {
        let annotator = Annotator { font: None };
        let mut img = RgbImage::from_pixel(8, 8, Rgb([7, 7, 7]));
        annotator.annotate(&mut img, &[]);

        assert!(img.pixels().all(|p| p == &Rgb([7, 7, 7])));
    }
}
