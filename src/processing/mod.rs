pub mod annotate;
pub mod crop;
pub mod detection;
pub mod numerals;
pub mod ocr;

pub use crop::RegionCropper;
pub use detection::{RegionDetector, RegionModel};
pub use ocr::{TextModel, TextRecognizer};
