//! Face landmark detection.
//!
//! [`LandmarkDetector`] is the seam between the measurement code and whatever
//! produces landmarks. [`FaceLandmarker`] is the bundled implementation: a
//! SeetaFace cascade from `rustface` finds face rectangles, then the
//! regression-tree [`ShapePredictor`] places 68 points in each of them.

use std::path::Path;

use image::DynamicImage;
use rustface::{Detector, ImageData};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::landmarks::LandmarkSet;
use crate::model::ShapePredictor;
use crate::types::BoundingBox;

/// Produces landmarks for every face found in an image.
pub trait LandmarkDetector {
    /// Faces in order of preference; callers that need one face take the first.
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<LandmarkSet>>;
}

impl<D: LandmarkDetector + ?Sized> LandmarkDetector for Box<D> {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<LandmarkSet>> {
        (**self).detect(image)
    }
}

/// SeetaFace detector tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Smallest face edge in pixels; rustface requires at least 20.
    pub min_face_size: u32,
    pub score_threshold: f64,
    pub pyramid_scale_factor: f32,
    pub slide_window_step: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            min_face_size: 20,
            score_threshold: 2.0,
            pyramid_scale_factor: 0.8,
            slide_window_step: 4,
        }
    }
}

pub struct FaceLandmarker {
    faces: Box<dyn Detector>,
    predictor: ShapePredictor,
}

impl FaceLandmarker {
    pub fn new(mut faces: Box<dyn Detector>, predictor: ShapePredictor, settings: &DetectorSettings) -> Self {
        faces.set_min_face_size(settings.min_face_size);
        faces.set_score_thresh(settings.score_threshold);
        faces.set_pyramid_scale_factor(settings.pyramid_scale_factor);
        faces.set_slide_window_step(settings.slide_window_step, settings.slide_window_step);
        Self { faces, predictor }
    }

    /// Load the SeetaFace model and the landmark model from disk.
    pub fn from_files<P: AsRef<Path>, Q: AsRef<Path>>(
        face_model: P,
        landmark_model: Q,
        settings: &DetectorSettings,
    ) -> Result<Self> {
        let face_model = face_model.as_ref();
        let face_model_path = face_model.to_str().ok_or_else(|| {
            Error::Detector(format!("non UTF-8 model path {}", face_model.display()))
        })?;
        log::info!("loading face detector from {}", face_model.display());
        let faces = rustface::create_detector(face_model_path).map_err(|e| {
            Error::Detector(format!(
                "failed to load face detector {}: {}",
                face_model.display(),
                e
            ))
        })?;

        log::info!(
            "loading landmark model from {}",
            landmark_model.as_ref().display()
        );
        let predictor = ShapePredictor::open(landmark_model)?;
        if predictor.num_landmarks() != 68 {
            return Err(Error::InvalidModel(format!(
                "landmark model predicts {} points, a 68-point model is required",
                predictor.num_landmarks()
            )));
        }

        Ok(Self::new(faces, predictor, settings))
    }
}

impl LandmarkDetector for FaceLandmarker {
    fn detect(&mut self, image: &DynamicImage) -> Result<Vec<LandmarkSet>> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();

        let mut faces = self.faces.detect(&ImageData::new(gray.as_raw(), width, height));
        faces.sort_by(|a, b| b.score().total_cmp(&a.score()));
        log::debug!("detected {} face(s)", faces.len());

        faces
            .iter()
            .map(|face| {
                let rect = BoundingBox::from(face.bbox());
                LandmarkSet::from_shape(&self.predictor.predict(&gray, &rect))
            })
            .collect()
    }
}
