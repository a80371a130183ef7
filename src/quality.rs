//! Rejects photographs where the subject is not facing the camera.
//!
//! Three heuristics are computed from the landmarks and compared against
//! thresholds found by inspecting bad pictures:
//!
//! 1. **Eye tilt**: how much lower the right eye sits than the left one.
//! 2. **Nose tilt**: horizontal offset of the nose tip from the bridge.
//! 3. **Space ratio**: jaw-to-eye-corner distance on the left over the right.
//!
//! The first two are expressed in hundredths of the face width, so the gate
//! behaves the same on small and large pictures.

use serde::{Deserialize, Serialize};

use crate::landmarks::{Landmark, LandmarkSet};

pub const DEFAULT_MAX_EYE_TILT: f64 = 5.0;
pub const DEFAULT_MAX_NOSE_TILT: f64 = 3.5;
pub const DEFAULT_MAX_SPACE_RATIO: f64 = 3.0;

/// Upper bounds for the three gate metrics. A picture is rejected when any
/// metric is strictly greater than its bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub max_eye_tilt: f64,
    pub max_nose_tilt: f64,
    pub max_space_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_eye_tilt: DEFAULT_MAX_EYE_TILT,
            max_nose_tilt: DEFAULT_MAX_NOSE_TILT,
            max_space_ratio: DEFAULT_MAX_SPACE_RATIO,
        }
    }
}

/// Raw gate measurements for one face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Right eye height minus left eye height, per hundredth of face width.
    pub eye_tilt: f64,
    /// Nose tip x minus nose bridge x, per hundredth of face width.
    pub nose_tilt: f64,
    /// Left jaw-to-eye space over right jaw-to-eye space.
    pub space_ratio: f64,
}

impl QualityMetrics {
    pub fn from_landmarks(p: &LandmarkSet) -> Self {
        let x = |lm: Landmark| f64::from(p.get(lm).x);
        let y = |lm: Landmark| f64::from(p.get(lm).y);

        let unit = (x(Landmark::JawRight) - x(Landmark::JawLeft)) / 100.0;

        let eye_left = (y(Landmark::EyeLeftUpper) + y(Landmark::EyeLeftLower)) / 2.0;
        let eye_right = (y(Landmark::EyeRightUpperOuter) + y(Landmark::EyeRightLower)) / 2.0;

        let left_space = x(Landmark::EyeLeftOuter) - x(Landmark::JawLeft);
        let right_space = x(Landmark::JawRight) - x(Landmark::EyeRightOuter);

        Self {
            eye_tilt: (eye_right - eye_left) / unit,
            nose_tilt: (x(Landmark::NoseTip) - x(Landmark::NoseBridge)) / unit,
            space_ratio: left_space / right_space,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.eye_tilt.is_finite() && self.nose_tilt.is_finite() && self.space_ratio.is_finite()
    }
}

/// Outcome of running the gate on one face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub metrics: QualityMetrics,
    pub passed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    thresholds: QualityThresholds,
    debug: bool,
}

impl QualityGate {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self {
            thresholds,
            debug: false,
        }
    }

    /// Log the raw metrics of every evaluated face at `info` level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn evaluate(&self, landmarks: &LandmarkSet) -> QualityReport {
        let metrics = QualityMetrics::from_landmarks(landmarks);
        if self.debug {
            log::info!(
                "quality metrics: eye_tilt={} nose_tilt={} space_ratio={}",
                metrics.eye_tilt,
                metrics.nose_tilt,
                metrics.space_ratio
            );
        }
        QualityReport {
            metrics,
            passed: self.accepts(&metrics),
        }
    }

    pub fn check(&self, landmarks: &LandmarkSet) -> bool {
        self.evaluate(landmarks).passed
    }

    /// Degenerate faces (zero width, eye corner on the jaw line) yield
    /// non-finite metrics and are rejected.
    pub fn accepts(&self, metrics: &QualityMetrics) -> bool {
        let t = &self.thresholds;
        metrics.is_finite()
            && !(metrics.eye_tilt > t.max_eye_tilt
                || metrics.nose_tilt > t.max_nose_tilt
                || metrics.space_ratio > t.max_space_ratio)
    }
}
