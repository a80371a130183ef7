use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No face detected in {image}")]
    NoFaceDetected { image: String },

    #[error("Expected {expected} landmarks, got {found}")]
    InvalidLandmarks { expected: usize, found: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model deserialization error: {0}")]
    Deserialization(#[from] bincode::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Face detector error: {0}")]
    Detector(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service error: {0}")]
    Service(String),
}

pub type Result<T> = std::result::Result<T, Error>;
