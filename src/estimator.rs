use image::DynamicImage;
use serde::Serialize;

use crate::detector::LandmarkDetector;
use crate::error::{Error, Result};
use crate::geometry::{BoxCorners, BoxOptions};
use crate::landmarks::LandmarkSet;
use crate::quality::{QualityGate, QualityReport};
use crate::ratio::measure;
use crate::source::ImageSource;

/// Result of measuring one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub landmarks: LandmarkSet,
    pub quality: QualityReport,
    /// Present only when the picture passed the quality gate.
    pub corners: Option<BoxCorners>,
    pub ratio: Option<f64>,
}

impl Estimate {
    pub fn is_suitable(&self) -> bool {
        self.quality.passed
    }
}

/// Single-image FWHR pipeline: detect, gate, box, ratio.
pub struct FwhrEstimator<D> {
    detector: D,
    gate: QualityGate,
}

impl<D: LandmarkDetector> FwhrEstimator<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            gate: QualityGate::default(),
        }
    }

    pub fn with_quality_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Measure the first face found in `image`. `label` names the image in errors.
    pub fn estimate_image(
        &mut self,
        image: &DynamicImage,
        label: &str,
        options: &BoxOptions,
    ) -> Result<Estimate> {
        let landmarks = self
            .detector
            .detect(image)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoFaceDetected {
                image: label.to_string(),
            })?;

        let measurement = measure(&landmarks, &self.gate, options);
        match measurement.ratio {
            Some(ratio) => log::debug!("{}: ratio {}", label, ratio),
            None => log::debug!("{}: rejected by quality gate", label),
        }

        Ok(Estimate {
            landmarks,
            quality: measurement.quality,
            corners: measurement.corners,
            ratio: measurement.ratio,
        })
    }

    /// Load `source` and measure it.
    pub fn estimate(&mut self, source: &ImageSource, options: &BoxOptions) -> Result<Estimate> {
        let image = source.load()?;
        self.estimate_image(&image, &source.to_string(), options)
    }
}
