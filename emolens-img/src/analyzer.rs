use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use image::RgbImage;
use serde::Serialize;
use tracing::{debug, warn};

use crate::shapes::rect::Rect;
use backend::OnnxEmotionBackend;
pub use backend::EMOTION_LABELS;

mod backend;
mod model;

/// One face as reported by a backend, before shaping.
#[derive(Debug, Clone)]
pub struct RawFace {
    pub region: Rect,
    pub dominant_emotion: String,
    pub emotion_scores: BTreeMap<String, f32>,
}

/// Backends historically handed back either a bare record (exactly one
/// face) or a list. Both shapes are flattened in [`Analyzer::analyze`] and
/// never escape this module's callers.
#[derive(Debug, Clone)]
pub enum RawDetections {
    Single(RawFace),
    Many(Vec<RawFace>),
}

/// The external emotion-analysis capability. Implementations own facial
/// region detection and emotion scoring end to end; this crate only adapts
/// their output.
///
/// With `enforce_detection` unset, an image without any confidently
/// detected face must produce an empty `Many`, not an error.
pub trait AnalysisBackend: Send {
    fn analyze(&mut self, img: &RgbImage, enforce_detection: bool) -> Result<RawDetections>;
}

/// One detected face with its shaped emotion distribution.
#[derive(Debug, Clone, Serialize)]
pub struct FaceResult {
    pub dominant_emotion: String,
    pub emotion_scores: BTreeMap<String, f32>,
    pub region: Rect,
    pub confidence: f32,
}

/// Outcome of one analysis pass. `Detected` with an empty list means the
/// backend ran and found no faces; `Failed` means it could not run at all.
#[derive(Debug, Clone)]
pub enum Analysis {
    Detected(Vec<FaceResult>),
    Failed(String),
}

impl Analysis {
    /// Collapse to a plain list, treating a failed pass as zero faces.
    pub fn into_faces(self) -> Vec<FaceResult> {
        match self {
            Analysis::Detected(faces) => faces,
            Analysis::Failed(_) => Vec::new(),
        }
    }
}

pub struct Analyzer {
    backend: Box<dyn AnalysisBackend>,
}

impl Analyzer {
    /// Analyzer over the SeetaFace + ONNX backend, loading its model files
    /// from `model_dir`.
    pub fn new(model_dir: &Path) -> Result<Analyzer> {
        Ok(Analyzer {
            backend: Box::new(OnnxEmotionBackend::new(model_dir)?),
        })
    }

    pub fn with_backend(backend: Box<dyn AnalysisBackend>) -> Analyzer {
        Analyzer { backend }
    }

    /// Run the backend with detection enforcement disabled and shape its
    /// output into an ordered face list. Backend errors never propagate
    /// past this boundary.
    pub fn analyze(&mut self, img: &RgbImage) -> Analysis {
        match self.backend.analyze(img, false) {
            Ok(raw) => {
                let faces = shape_results(raw);
                debug!("analyzed frame: {} face(s)", faces.len());
                Analysis::Detected(faces)
            }
            Err(e) => {
                warn!("emotion analysis failed: {e:?}");
                Analysis::Failed(e.to_string())
            }
        }
    }
}

fn shape_results(raw: RawDetections) -> Vec<FaceResult> {
    let records = match raw {
        RawDetections::Single(face) => vec![face],
        RawDetections::Many(faces) => faces,
    };

    records.into_iter().map(shape_face).collect()
}

fn shape_face(raw: RawFace) -> FaceResult {
    let confidence = raw.emotion_scores.values().copied().fold(0.0f32, f32::max);

    FaceResult {
        dominant_emotion: raw.dominant_emotion,
        emotion_scores: raw.emotion_scores,
        region: raw.region,
        confidence,
    }
}
