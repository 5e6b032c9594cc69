use crate::models::{BoundingBox, CropSet, DetectionSet, FieldLabel};
use crate::utils::{ensure_directories, IdCardError};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

pub const DEFAULT_CROP_MAX_SIZE: u32 = 800;

/// Below this on either side a crop is enlarged before OCR.
pub const MIN_CROP_SIDE: u32 = 32;

/// Smallest side a crop is enlarged to.
pub const UPSCALE_TARGET: u32 = 64;

/// Cuts detected regions out of the card and writes them as `<Label>.png`.
pub struct RegionCropper {
    crops_dir: PathBuf,
    max_size: u32,
}

impl RegionCropper {
    pub fn new(crops_dir: impl Into<PathBuf>, max_size: u32) -> Result<Self, IdCardError> {
        let crops_dir = crops_dir.into();
        ensure_directories([&crops_dir])?;
        Ok(Self { crops_dir, max_size })
    }

    pub fn crops_dir(&self) -> &Path {
        &self.crops_dir
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn crop_regions_from_path(
        &self,
        image_path: &Path,
        detections: &DetectionSet,
    ) -> Result<CropSet, IdCardError> {
        let img = image::open(image_path).map_err(|e| {
            IdCardError::ImageProcessing(format!("Failed to read image for cropping: {}", e))
        })?;
        Ok(self.crop_regions(&img, detections))
    }

    /// Crop and persist every detected field except `BD`.
    ///
    /// Invalid regions and failed writes drop only the affected label.
    pub fn crop_regions(&self, image: &DynamicImage, detections: &DetectionSet) -> CropSet {
        let rgb = image.to_rgb8();
        let mut crop_map = CropSet::new();

        for (label, bbox) in detections {
            if label.is_derived() {
                continue;
            }

            let Some(crop) = normalize_crop(&rgb, *label, bbox, self.max_size) else {
                log::warn!("Invalid crop dimensions for {}: {}, skipping", label, bbox);
                continue;
            };

            let out_path = self.crops_dir.join(format!("{}.png", label));
            if let Err(e) = crop.save_with_format(&out_path, ImageFormat::Png) {
                log::warn!("Failed to write crop for {} to {:?}: {}", label, out_path, e);
                continue;
            }
            crop_map.insert(*label, out_path);
        }

        log::info!("Cropped {} regions", crop_map.len());
        crop_map
    }
}

/// Cut `bbox` out of `image` and resize it for recognition.
///
/// Returns `None` when the clamped region is empty.
pub fn normalize_crop(
    image: &RgbImage,
    label: FieldLabel,
    bbox: &BoundingBox,
    max_size: u32,
) -> Option<RgbImage> {
    let crop = extract_region(image, bbox)?;
    let crop = if label == FieldLabel::Num1 {
        let (w, h) = crop.dimensions();
        imageops::resize(&crop, w * 2, h * 2, FilterType::CatmullRom)
    } else {
        crop
    };
    Some(fit_for_ocr(crop, max_size))
}

fn extract_region(image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let x1 = bbox.x1.max(0);
    let y1 = bbox.y1.max(0);
    let x2 = bbox.x2.max(x1.saturating_add(1));
    let y2 = bbox.y2.max(y1.saturating_add(1));

    let (img_w, img_h) = image.dimensions();
    let x1 = u32::try_from(x1).ok()?.min(img_w);
    let y1 = u32::try_from(y1).ok()?.min(img_h);
    let x2 = u32::try_from(x2).ok()?.min(img_w);
    let y2 = u32::try_from(y2).ok()?.min(img_h);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// Target size for a `width x height` crop under the resize rules.
///
/// Oversized crops shrink so the larger side equals `max_size`; crops with a
/// side under [`MIN_CROP_SIDE`] grow uniformly until both sides reach
/// [`UPSCALE_TARGET`].
pub fn target_size(width: u32, height: u32, max_size: u32) -> Option<(u32, u32, FilterType)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (w, h) = (f64::from(width), f64::from(height));

    if width > max_size || height > max_size {
        let scale = f64::from(max_size) / w.max(h);
        let new_w = if width >= height { max_size } else { ((w * scale).round() as u32).max(1) };
        let new_h = if height > width { max_size } else { ((h * scale).round() as u32).max(1) };
        Some((new_w, new_h, FilterType::Lanczos3))
    } else if width < MIN_CROP_SIDE || height < MIN_CROP_SIDE {
        let target = f64::from(UPSCALE_TARGET);
        let scale = (target / w).max(target / h);
        let new_w = ((w * scale).round() as u32).max(UPSCALE_TARGET);
        let new_h = ((h * scale).round() as u32).max(UPSCALE_TARGET);
        Some((new_w, new_h, FilterType::CatmullRom))
    } else {
        None
    }
}

fn fit_for_ocr(crop: RgbImage, max_size: u32) -> RgbImage {
    let (w, h) = crop.dimensions();
    match target_size(w, h, max_size) {
        Some((new_w, new_h, filter)) => imageops::resize(&crop, new_w, new_h, filter),
        None => crop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn card(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
    }

    #[test]
    fn test_downscale_keeps_aspect_ratio() {
        let (w, h, filter) = target_size(1000, 500, 800).unwrap();
        assert_eq!((w, h), (800, 400));
        assert_eq!(filter, FilterType::Lanczos3);

        let (w, h, _) = target_size(300, 1200, 800).unwrap();
        assert_eq!((w, h), (200, 800));
    }

    #[test]
    fn test_small_crops_are_upscaled() {
        let (w, h, filter) = target_size(20, 40, 800).unwrap();
        assert_eq!((w, h), (64, 128));
        assert_eq!(filter, FilterType::CatmullRom);

        let (w, h, _) = target_size(7, 30, 800).unwrap();
        assert!(w >= 64 && h >= 64);
    }

    #[test]
    fn test_mid_sized_crops_untouched() {
        assert!(target_size(400, 32, 800).is_none());
        assert!(target_size(800, 800, 800).is_none());
    }

    #[test]
    fn test_num1_doubled_before_resize() {
        let image = card(200, 100);
        let bbox = BoundingBox::new(10, 10, 60, 30);

        let num1 = normalize_crop(&image, FieldLabel::Num1, &bbox, 800).unwrap();
        assert_eq!(num1.dimensions(), (100, 40));

        let name = normalize_crop(&image, FieldLabel::Name1, &bbox, 800).unwrap();
        // 50x20 is under the minimum side, so it grows to 160x64.
        assert_eq!(name.dimensions(), (160, 64));
    }

    #[test]
    fn test_num1_doubling_can_trigger_downscale() {
        let image = card(1000, 300);
        let bbox = BoundingBox::new(0, 0, 500, 100);
        let num1 = normalize_crop(&image, FieldLabel::Num1, &bbox, 800).unwrap();
        assert_eq!(num1.dimensions(), (800, 160));
    }

    #[test]
    fn test_degenerate_boxes_yield_no_crop() {
        let image = card(100, 100);
        assert!(normalize_crop(&image, FieldLabel::Add1, &BoundingBox::new(100, 0, 120, 50), 800).is_none());
        assert!(normalize_crop(&image, FieldLabel::Add1, &BoundingBox::new(0, 100, 50, 100), 800).is_none());
        // Inverted box is widened to one pixel.
        let sliver = normalize_crop(&image, FieldLabel::Add1, &BoundingBox::new(40, 40, 10, 10), 800).unwrap();
        assert_eq!(sliver.dimensions(), (64, 64));
    }

    #[test]
    fn test_crop_regions_writes_pngs_and_skips_bd() {
        let dir = tempfile::tempdir().unwrap();
        let cropper = RegionCropper::new(dir.path().join("crops"), 800).unwrap();
        let image = DynamicImage::ImageRgb8(card(400, 250));

        let mut detections = DetectionSet::new();
        detections.insert(FieldLabel::Name1, BoundingBox::new(10, 10, 200, 60));
        detections.insert(FieldLabel::BD, BoundingBox::new(10, 70, 200, 100));
        detections.insert(FieldLabel::Add1, BoundingBox::new(500, 10, 600, 60));
        detections.insert(FieldLabel::Num1, BoundingBox::new(100, 200, 380, 240));

        let crops = cropper.crop_regions(&image, &detections);

        assert_eq!(crops.len(), 2);
        assert!(!crops.contains_key(&FieldLabel::BD));
        assert!(!crops.contains_key(&FieldLabel::Add1));
        assert_eq!(crops[&FieldLabel::Name1], cropper.crops_dir().join("Name1.png"));
        assert_eq!(image::image_dimensions(&crops[&FieldLabel::Name1]).unwrap(), (190, 50));
        assert_eq!(image::image_dimensions(&crops[&FieldLabel::Num1]).unwrap(), (560, 80));
    }

    #[test]
    fn test_write_failure_drops_only_that_label() {
        let dir = tempfile::tempdir().unwrap();
        let cropper = RegionCropper::new(dir.path(), 800).unwrap();
        // A directory squatting on the output path makes that one write fail.
        std::fs::create_dir(dir.path().join("Name2.png")).unwrap();
        let image = DynamicImage::ImageRgb8(card(300, 200));

        let mut detections = DetectionSet::new();
        detections.insert(FieldLabel::Name2, BoundingBox::new(0, 0, 100, 50));
        detections.insert(FieldLabel::Num2, BoundingBox::new(0, 100, 100, 150));

        let crops = cropper.crop_regions(&image, &detections);
        assert_eq!(crops.keys().copied().collect::<Vec<_>>(), vec![FieldLabel::Num2]);
    }
}
