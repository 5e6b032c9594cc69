use crate::models::{FieldLabel, Script};
use thiserror::Error;

/// Failures surfaced by the ID card reader.
///
/// Only [`IdCardError::NoDetection`] stops a pipeline run; the per-field
/// variants are logged and degrade to empty results by the caller.
#[derive(Debug, Error)]
pub enum IdCardError {
    #[error("No detections above threshold {threshold}")]
    NoDetection { threshold: f32 },

    #[error("Failed to initialize {script} OCR: {message}")]
    RecognizerInit { script: Script, message: String },

    #[error("OCR error for {label}: {message}")]
    Recognition { label: FieldLabel, message: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for IdCardError {
    fn from(err: image::ImageError) -> Self {
        IdCardError::ImageProcessing(err.to_string())
    }
}
