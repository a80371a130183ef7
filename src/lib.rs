//! # fwhr
//!
//! Facial width-to-height ratio (FWHR) estimation from 68-point facial
//! landmarks.
//!
//! The ratio is measured on a box whose width spans the jaw extremes and
//! whose height runs from the eyebrows (or just above the eyelids) down to
//! the upper lip. Pictures where the subject is not facing the camera are
//! filtered out by a [`QualityGate`] before measuring.
//!
//! This crate provides:
//! - **Measurement**: [`face_box`], [`fwhr`] and [`measure`] over a [`LandmarkSet`]
//! - **Quality gate**: eye tilt, nose tilt and jaw-to-eye space heuristics
//! - **Landmark detection**: a [`LandmarkDetector`] trait and [`FaceLandmarker`],
//!   which pairs the SeetaFace detector from `rustface` with a pure Rust
//!   regression-tree shape predictor that reads dlib's 68-point models
//! - **Batch runs**: [`BatchJob`] measures a folder and writes `fwhr_ratios.csv`
//! - **HTTP service**: [`FwhrService`] answers `GET /calculatefwhr?url=...`
//!
//! ## Quick Start
//!
//! ```rust
//! use fwhr::{fwhr, face_box, BoxOptions, LandmarkSet, PixelPoint};
//!
//! // Landmarks from any 68-point detector, in iBUG order.
//! let mut points = vec![PixelPoint::new(100, 100); 68];
//! points[0] = PixelPoint::new(0, 100);    // jaw, left
//! points[16] = PixelPoint::new(200, 100); // jaw, right
//! points[37] = PixelPoint::new(60, 74);   // upper eyelids
//! points[43] = PixelPoint::new(140, 74);
//! points[50] = PixelPoint::new(90, 170);  // upper lip
//! points[52] = PixelPoint::new(110, 170);
//! let landmarks = LandmarkSet::new(points).unwrap();
//!
//! let corners = face_box(&landmarks, &BoxOptions::default());
//! // Eyelid tops sit 4 pixels above the lids: 200 / (170 - 70).
//! assert_eq!(fwhr(&corners), 2.0);
//! ```
//!
//! ## From photographs
//!
//! ```no_run
//! use fwhr::{BoxOptions, DetectorSettings, FaceLandmarker, FwhrEstimator, ImageSource};
//!
//! let detector = FaceLandmarker::from_files(
//!     "seeta_fd_frontal_v1.0.bin",
//!     "dlib-models/shape_predictor_68_face_landmarks.dat.bz2",
//!     &DetectorSettings::default(),
//! )?;
//! let mut estimator = FwhrEstimator::new(detector);
//! let estimate = estimator.estimate(&ImageSource::parse("face.jpg")?, &BoxOptions::default())?;
//! match estimate.ratio {
//!     Some(ratio) => println!("FWHR: {ratio}"),
//!     None => println!("picture not suitable"),
//! }
//! # Ok::<(), fwhr::Error>(())
//! ```

pub mod annotate;
pub mod batch;
pub mod config;
pub mod detector;
pub mod dlib;
mod error;
mod estimator;
mod features;
mod geometry;
mod landmarks;
mod model;
mod quality;
mod ratio;
pub mod service;
mod source;
mod tree;
mod types;

pub use batch::{BatchJob, BatchRecord, BatchReport, FailurePolicy, SortKey};
pub use config::Config;
pub use detector::{DetectorSettings, FaceLandmarker, LandmarkDetector};
pub use error::{Error, Result};
pub use estimator::{Estimate, FwhrEstimator};
pub use features::{find_similarity_transform, ImageAccess, SimilarityTransform2D};
pub use geometry::{face_box, BoxCorners, BoxOptions, CombineMethod, TopReference, EYELID_OFFSET};
pub use landmarks::{Ibug68, Landmark, LandmarkLayout, LandmarkSet, PixelPoint};
pub use model::{CascadeStage, ShapePredictor};
pub use quality::{QualityGate, QualityMetrics, QualityReport, QualityThresholds};
pub use ratio::{fwhr, measure, Measurement};
pub use service::FwhrService;
pub use source::ImageSource;
pub use tree::{RegressionTree, Split};
pub use types::{BoundingBox, Point, Shape};
