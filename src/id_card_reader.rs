use crate::config::ReaderConfig;
use crate::models::*;
use crate::processing::*;
use crate::utils::IdCardError;
use image::DynamicImage;
use std::path::Path;

/// Runs detection, cropping and recognition for one card image at a time.
pub struct IdCardReader<M> {
    detector: RegionDetector<M>,
    cropper: RegionCropper,
    recognizer: TextRecognizer,
}

impl<M: RegionModel> IdCardReader<M> {
    pub fn new(detector: RegionDetector<M>, cropper: RegionCropper, recognizer: TextRecognizer) -> Self {
        IdCardReader {
            detector,
            cropper,
            recognizer,
        }
    }

    /// Wire the stages from a region model, OCR engines and settings.
    pub fn from_config(
        model: M,
        recognizer: TextRecognizer,
        config: &ReaderConfig,
    ) -> Result<Self, IdCardError> {
        config.validate()?;
        let detector = RegionDetector::new(model, config.score_threshold);
        let cropper = RegionCropper::new(&config.crops_dir, config.crop_max_size)?;
        Ok(Self::new(detector, cropper, recognizer))
    }

    pub fn detector_mut(&mut self) -> &mut RegionDetector<M> {
        &mut self.detector
    }

    pub fn recognizer_mut(&mut self) -> &mut TextRecognizer {
        &mut self.recognizer
    }

    /// Main entry point: read every field of the card at `image_path`.
    ///
    /// Fails only when the image cannot be read or no region is detected;
    /// anything else leaves the affected field empty.
    pub fn process_image(&mut self, image_path: &Path) -> Result<IdCardReport, IdCardError> {
        let image = image::open(image_path).map_err(|e| {
            IdCardError::ImageProcessing(format!("Failed to open image {:?}: {}", image_path, e))
        })?;
        self.process(&image)
    }

    pub fn process(&mut self, image: &DynamicImage) -> Result<IdCardReport, IdCardError> {
        // Step 1: Locate the field regions
        let detections = self.detector.detect(image)?;

        // Step 2: Crop and normalize them
        let crop_map = self.cropper.crop_regions(image, &detections);

        // Step 3: Read the text and derive the birth date
        let ocr_result = self.recognizer.recognize(&crop_map);
        log::info!(
            "Text extraction completed for {} of {} fields",
            FieldLabel::RECOGNIZED
                .iter()
                .filter(|label| !ocr_result.get(**label).is_empty())
                .count(),
            FieldLabel::RECOGNIZED.len()
        );

        Ok(IdCardReport {
            detections,
            crop_map,
            ocr_result,
        })
    }
}
