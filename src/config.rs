//! Configuration file support.
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Command line flags take precedence over the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::batch::{FailurePolicy, SortKey};
use crate::detector::DetectorSettings;
use crate::error::{Error, Result};
use crate::geometry::BoxOptions;
use crate::quality::QualityThresholds;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub models: ModelConfig,
    pub detector: DetectorSettings,
    pub quality: QualityThresholds,
    pub measurement: MeasurementConfig,
    pub batch: BatchConfig,
    pub service: ServiceConfig,
}

/// Model file locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// SeetaFace frontal face detector.
    pub face_detector: PathBuf,
    /// dlib 68-point shape predictor (`.dat`, `.dat.bz2`) or a bincode cache.
    pub landmarks: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("seeta_fd_frontal_v1.0.bin"),
            landmarks: PathBuf::from("dlib-models/shape_predictor_68_face_landmarks.dat.bz2"),
        }
    }
}

/// Box options for single-image runs, as text so they are validated the
/// same way as command line arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementConfig {
    pub method: String,
    pub top: String,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            method: "average".to_string(),
            top: "eyelid".to_string(),
        }
    }
}

impl MeasurementConfig {
    pub fn box_options(&self) -> Result<BoxOptions> {
        BoxOptions::parse(&self.method, &self.top)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub sort_by: SortKey,
    pub on_error: FailurePolicy,
}

/// HTTP service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listen address, `host:port`.
    pub addr: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))
    }

    /// Save configuration as pretty-printed JSON.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let q = &self.quality;
        for (name, value) in [
            ("max_eye_tilt", q.max_eye_tilt),
            ("max_nose_tilt", q.max_nose_tilt),
            ("max_space_ratio", q.max_space_ratio),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!(
                    "quality.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        let d = &self.detector;
        if d.min_face_size < 20 {
            return Err(Error::Config(format!(
                "detector.min_face_size must be at least 20, got {}",
                d.min_face_size
            )));
        }
        if !(d.pyramid_scale_factor > 0.0 && d.pyramid_scale_factor < 1.0) {
            return Err(Error::Config(format!(
                "detector.pyramid_scale_factor must be between 0 and 1, got {}",
                d.pyramid_scale_factor
            )));
        }
        if d.slide_window_step == 0 {
            return Err(Error::Config(
                "detector.slide_window_step must be greater than 0".to_string(),
            ));
        }

        if self.service.addr.trim().is_empty() {
            return Err(Error::Config("service.addr must not be empty".to_string()));
        }

        self.measurement.box_options()?;
        Ok(())
    }
}

/// Example configuration file content.
pub const EXAMPLE_CONFIG: &str = r#"{
  "models": {
    "face_detector": "seeta_fd_frontal_v1.0.bin",
    "landmarks": "dlib-models/shape_predictor_68_face_landmarks.dat.bz2"
  },
  "detector": {
    "min_face_size": 20,
    "score_threshold": 2.0,
    "pyramid_scale_factor": 0.8,
    "slide_window_step": 4
  },
  "quality": {
    "max_eye_tilt": 5.0,
    "max_nose_tilt": 3.5,
    "max_space_ratio": 3.0
  },
  "measurement": {
    "method": "average",
    "top": "eyelid"
  },
  "batch": {
    "sort_by": "filename",
    "on_error": "abort"
  },
  "service": {
    "addr": "0.0.0.0:8080"
  }
}
"#;
