//! Concrete detection and recognition engines, each behind a cargo feature.

#[cfg(feature = "onnx")]
pub mod onnx;
#[cfg(feature = "tesseract")]
pub mod tess;

#[cfg(feature = "onnx")]
pub use onnx::OnnxRegionModel;
#[cfg(feature = "tesseract")]
pub use tess::TesseractEngine;
