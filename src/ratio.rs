use serde::{Deserialize, Serialize};

use crate::geometry::{face_box, BoxCorners, BoxOptions};
use crate::landmarks::LandmarkSet;
use crate::quality::{QualityGate, QualityReport};

/// Facial width-to-height ratio of a measurement box.
///
/// Not guarded: a zero-height box yields an infinite or NaN ratio and an
/// inverted box a negative one.
pub fn fwhr(corners: &BoxCorners) -> f64 {
    corners.width() as f64 / corners.height() as f64
}

/// Gate result plus, when the face passed, the box and its ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub quality: QualityReport,
    pub corners: Option<BoxCorners>,
    pub ratio: Option<f64>,
}

/// Run the gate and, if it passes, measure the face.
pub fn measure(landmarks: &LandmarkSet, gate: &QualityGate, options: &BoxOptions) -> Measurement {
    let quality = gate.evaluate(landmarks);
    if !quality.passed {
        return Measurement {
            quality,
            corners: None,
            ratio: None,
        };
    }

    let corners = face_box(landmarks, options);
    Measurement {
        quality,
        corners: Some(corners),
        ratio: Some(fwhr(&corners)),
    }
}
