use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use ndarray::Array4;
use num_cpus::get as get_cpu_count;
use ort::value::Tensor;
use rustface::ImageData;
use tracing::{debug, trace};

use super::model::{Session, initialize_model};
use super::{AnalysisBackend, RawDetections, RawFace};
use crate::shapes::rect::Rect;

/// Emotion vocabulary of the scoring model, in output order.
pub const EMOTION_LABELS: [&str; 7] = [
    "angry", "disgust", "fear", "happy", "sad", "surprise", "neutral",
];

const FACE_MODEL_FILE: &str = "seeta_fd_frontal_v1.0.bin";
const EMOTION_MODEL_FILE: &str = "emotion_cnn.onnx";

/// Side length of the scoring model's square grayscale input.
const EMOTION_INPUT_SIZE: u32 = 48;

/*
SeetaFace locates face regions; the ONNX net scores one cropped region at
a time.

Model input: 1x1x48x48 f32 grayscale crop, values in 0..1 ("input")
Model output: 7 logits ("output"), softmaxed here into percentages
*/
pub struct OnnxEmotionBackend {
    face_model: rustface::Model,
    emotion_model: Session,
}

impl OnnxEmotionBackend {
    pub fn new(model_dir: &Path) -> Result<OnnxEmotionBackend> {
        let face_model_path = model_dir.join(FACE_MODEL_FILE);
        let data = fs::read(&face_model_path)
            .with_context(|| format!("reading {}", face_model_path.display()))?;
        let face_model = rustface::read_model(Cursor::new(data))
            .map_err(|e| anyhow!("failed to load face detection model: {e:?}"))?;

        let emotion_model =
            initialize_model(&model_dir.join(EMOTION_MODEL_FILE), get_cpu_count())?;

        Ok(OnnxEmotionBackend {
            face_model,
            emotion_model,
        })
    }

    fn detect_regions(&self, gray: &GrayImage) -> Vec<Rect> {
        // detectors carry per-run state, so build one per call from the
        // shared model
        let mut detector = rustface::create_detector_with_model(self.face_model.clone());
        detector.set_min_face_size(20);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let (width, height) = gray.dimensions();
        let faces = detector.detect(&ImageData::new(gray.as_raw(), width, height));
        trace!("detector reported {} region(s)", faces.len());

        faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                Rect::new(bbox.x(), bbox.y(), bbox.width(), bbox.height())
                    .clamp_to(width, height)
            })
            .filter(|region| region.area() > 0)
            .collect()
    }

    fn score_region(&mut self, gray: &GrayImage, region: Rect) -> Result<RawFace> {
        let input = Tensor::from_array(emotion_input(gray, region)?)?;
        let outputs = self.emotion_model.run(ort::inputs!["input" => input]?)?;
        let logits = outputs["output"].try_extract_tensor::<f32>()?;
        let logits = logits
            .as_slice()
            .ok_or_else(|| anyhow!("emotion model output is not contiguous"))?;

        if logits.len() != EMOTION_LABELS.len() {
            bail!(
                "emotion model produced {} scores, expected {}",
                logits.len(),
                EMOTION_LABELS.len()
            );
        }

        let scores = percentage_scores(logits);
        let emotion_scores: BTreeMap<String, f32> = EMOTION_LABELS
            .iter()
            .zip(&scores)
            .map(|(label, score)| (label.to_string(), *score))
            .collect();

        Ok(RawFace {
            region,
            dominant_emotion: dominant_label(&scores).to_string(),
            emotion_scores,
        })
    }
}

impl AnalysisBackend for OnnxEmotionBackend {
    fn analyze(&mut self, img: &RgbImage, enforce_detection: bool) -> Result<RawDetections> {
        let gray = imageops::grayscale(img);
        let regions = self.detect_regions(&gray);

        if regions.is_empty() {
            if enforce_detection {
                bail!("no face could be detected with sufficient confidence");
            }
            return Ok(RawDetections::Many(Vec::new()));
        }

        debug!("scoring {} face region(s)", regions.len());

        let mut faces = Vec::with_capacity(regions.len());
        for region in regions {
            faces.push(self.score_region(&gray, region)?);
        }

        // a bare record for exactly one face: the shape legacy callers of
        // this capability received
        if faces.len() == 1 {
            return Ok(RawDetections::Single(faces.remove(0)));
        }

        Ok(RawDetections::Many(faces))
    }
}

/// Crop `region`, resize to the model input size and scale to 0..1.
/// `region` must already be clamped to the image.
fn emotion_input(gray: &GrayImage, region: Rect) -> Result<Array4<f32>> {
    let crop = imageops::crop_imm(gray, region.x as u32, region.y as u32, region.w, region.h)
        .to_image();
    let resized = imageops::resize(
        &crop,
        EMOTION_INPUT_SIZE,
        EMOTION_INPUT_SIZE,
        FilterType::Triangle,
    );

    let data: Vec<f32> = resized.as_raw().iter().map(|&p| p as f32 / 255.0).collect();
    let input = Array4::from_shape_vec(
        (1, 1, EMOTION_INPUT_SIZE as usize, EMOTION_INPUT_SIZE as usize),
        data,
    )?;

    Ok(input)
}

fn percentage_scores(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max_logit).exp()).collect();
    let sum: f32 = exp.iter().sum();

    exp.iter().map(|&e| e / sum * 100.0).collect()
}

fn dominant_label(scores: &[f32]) -> &'static str {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = i;
        }
    }

    EMOTION_LABELS[best]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_percentage_scores_sum_to_one_hundred() {
        let scores = percentage_scores(&[0.3, -1.2, 4.0, 0.0, 2.5, -0.7, 1.1]);
        let sum: f32 = scores.iter().sum();
        assert!((sum - 100.0).abs() < 1e-3);
        assert!(scores.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn test_percentage_scores_preserve_ranking() {
        let scores = percentage_scores(&[0.0, 3.0, -2.0]);
        assert!(scores[1] > scores[0]);
        assert!(scores[0] > scores[2]);
    }

    #[test]
    fn test_dominant_label_is_argmax() {
        let scores = percentage_scores(&[0.1, 0.2, 0.3, 6.0, 0.4, 0.5, 0.6]);
        assert_eq!(dominant_label(&scores), "happy");
    }

    #[test]
    fn test_emotion_input_shape_and_range() {
        let gray = GrayImage::from_pixel(100, 80, Luma([128]));
        let input = emotion_input(&gray, Rect::new(10, 10, 40, 40)).unwrap();

        assert_eq!(input.shape(), &[1, 1, 48, 48]);
        assert!(input.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!((input[[0, 0, 0, 0]] - 128.0 / 255.0).abs() < 1e-3);
    }
}
