use crate::models::rules::label_for_class;
use crate::models::{BoundingBox, DetectionSet, DuplicatePolicy, FieldLabel, RawDetection};
use crate::utils::IdCardError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use std::collections::HashMap;
use std::path::Path;

/// Side of the square frame the region model was trained on.
pub const FRAME_SIZE: u32 = 293;

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;

/// Object detection capability: boxes in frame coordinates, class ids and scores.
pub trait RegionModel: Send {
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>, IdCardError>;
}

impl<T: RegionModel + ?Sized> RegionModel for Box<T> {
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>, IdCardError> {
        (**self).infer(frame)
    }
}

/// Locates the card fields and maps them back to original image coordinates.
pub struct RegionDetector<M> {
    model: M,
    score_threshold: f32,
    duplicate_policy: DuplicatePolicy,
}

impl<M: RegionModel> RegionDetector<M> {
    pub fn new(model: M, score_threshold: f32) -> Self {
        Self {
            model,
            score_threshold,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn score_threshold(&self) -> f32 {
        self.score_threshold
    }

    pub fn detect_path(&mut self, image_path: &Path) -> Result<DetectionSet, IdCardError> {
        let img = image::open(image_path).map_err(|e| {
            IdCardError::ImageProcessing(format!("Failed to open image {:?}: {}", image_path, e))
        })?;
        self.detect(&img)
    }

    pub fn detect(&mut self, image: &DynamicImage) -> Result<DetectionSet, IdCardError> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(IdCardError::ImageProcessing("Image has zero area".to_string()));
        }

        let frame = imageops::resize(&rgb, FRAME_SIZE, FRAME_SIZE, FilterType::Lanczos3);
        let raw = self.model.infer(&frame)?;
        log::debug!("Region model returned {} raw detections", raw.len());

        self.collect(&raw, width, height)
    }

    /// Filter, label, rescale and pad raw detections for a `width x height` image.
    pub fn collect(
        &self,
        raw: &[RawDetection],
        width: u32,
        height: u32,
    ) -> Result<DetectionSet, IdCardError> {
        let scale_x = f64::from(width) / f64::from(FRAME_SIZE);
        let scale_y = f64::from(height) / f64::from(FRAME_SIZE);

        let mut result = DetectionSet::new();
        let mut best_scores: HashMap<FieldLabel, f32> = HashMap::new();

        for det in raw {
            if det.score < self.score_threshold {
                continue;
            }
            let Some(label) = label_for_class(det.class_id) else {
                log::debug!("Ignoring unknown class id {}", det.class_id);
                continue;
            };

            let [x1, y1, x2, y2] = det.bbox;
            let bbox = BoundingBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
                .scale(scale_x, scale_y)
                .pad()
                .clamp(width, height);

            if self.duplicate_policy == DuplicatePolicy::HighestScore {
                if let Some(best) = best_scores.get(&label) {
                    if *best >= det.score {
                        continue;
                    }
                }
                best_scores.insert(label, det.score);
            }

            log::debug!("{} at {} (score {:.3})", label, bbox, det.score);
            result.insert(label, bbox);
        }

        if result.is_empty() {
            return Err(IdCardError::NoDetection {
                threshold: self.score_threshold,
            });
        }

        log::info!("Detected {} regions", result.len());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    struct FixedModel {
        detections: Vec<RawDetection>,
        frames_seen: Vec<(u32, u32)>,
    }

    impl RegionModel for FixedModel {
        fn infer(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>, IdCardError> {
            self.frames_seen.push(frame.dimensions());
            Ok(self.detections.clone())
        }
    }

    fn detector(detections: Vec<RawDetection>) -> RegionDetector<FixedModel> {
        RegionDetector::new(
            FixedModel {
                detections,
                frames_seen: Vec::new(),
            },
            DEFAULT_SCORE_THRESHOLD,
        )
    }

    #[test]
    fn test_detect_resamples_to_frame_and_rescales_boxes() {
        let mut detector = detector(vec![RawDetection::new([10.0, 10.0, 50.0, 50.0], 4, 0.9)]);
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(586, 293, Rgb([255, 255, 255])));

        let detections = detector.detect(&image).unwrap();

        assert_eq!(detector.model.frames_seen, vec![(FRAME_SIZE, FRAME_SIZE)]);
        // (20, 10, 100, 50) before the 2 pixel padding.
        assert_eq!(detections[&FieldLabel::Name1], BoundingBox::new(18, 8, 102, 52));
    }

    #[test]
    fn test_filters_low_scores_and_unknown_classes() {
        let detector = detector(vec![
            RawDetection::new([10.0, 10.0, 50.0, 50.0], 1, 0.1),
            RawDetection::new([10.0, 10.0, 50.0, 50.0], 9, 0.9),
            RawDetection::new([10.0, 10.0, 50.0, 50.0], 7, 0.25),
        ]);

        let detections = detector.collect(&detector.model.detections, 293, 293).unwrap();

        assert_eq!(detections.len(), 1);
        assert!(detections.contains_key(&FieldLabel::Num2));
    }

    #[test]
    fn test_no_detection_error_when_nothing_survives() {
        let detector = detector(vec![RawDetection::new([10.0, 10.0, 50.0, 50.0], 1, 0.2)]);
        let err = detector.collect(&detector.model.detections, 293, 293).unwrap_err();
        assert!(matches!(err, IdCardError::NoDetection { .. }));

        let empty = detector.collect(&[], 293, 293).unwrap_err();
        assert!(matches!(empty, IdCardError::NoDetection { .. }));
    }

    #[test]
    fn test_boxes_are_clamped_to_image() {
        let detector = detector(vec![RawDetection::new([0.0, 0.0, 293.0, 293.0], 2, 0.8)]);
        let detections = detector.collect(&detector.model.detections, 600, 400).unwrap();
        assert_eq!(detections[&FieldLabel::Add2], BoundingBox::new(0, 0, 600, 400));
    }

    #[test]
    fn test_infinite_coordinates_saturate_and_clamp() {
        let detector = detector(vec![RawDetection::new(
            [f32::NEG_INFINITY, 0.0, f32::INFINITY, 50.0],
            2,
            0.8,
        )]);
        let detections = detector.collect(&detector.model.detections, 600, 400).unwrap();
        let bbox = detections[&FieldLabel::Add2];
        assert_eq!((bbox.x1, bbox.x2), (0, 600));
        assert!(!bbox.is_degenerate());
    }

    #[test]
    fn test_duplicate_labels_last_seen_wins_by_default() {
        let detector = detector(vec![
            RawDetection::new([10.0, 10.0, 50.0, 50.0], 6, 0.95),
            RawDetection::new([100.0, 100.0, 150.0, 120.0], 6, 0.40),
        ]);
        let detections = detector.collect(&detector.model.detections, 293, 293).unwrap();
        assert_eq!(detections[&FieldLabel::Num1], BoundingBox::new(98, 98, 152, 122));
    }

    #[test]
    fn test_duplicate_labels_highest_score_policy() {
        let detector = detector(vec![
            RawDetection::new([10.0, 10.0, 50.0, 50.0], 6, 0.95),
            RawDetection::new([100.0, 100.0, 150.0, 120.0], 6, 0.40),
        ])
        .with_duplicate_policy(DuplicatePolicy::HighestScore);
        let detections = detector.collect(&detector.model.detections, 293, 293).unwrap();
        assert_eq!(detections[&FieldLabel::Num1], BoundingBox::new(8, 8, 52, 52));
    }
}
