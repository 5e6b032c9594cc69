use crate::models::{BoundingBox, DetectionSet};
use crate::utils::IdCardError;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::Path;

const BOX_COLOR: Rgb<u8> = Rgb([0, 200, 0]);

impl BoundingBox {
    pub fn to_rect(&self) -> Option<Rect> {
        if self.is_degenerate() {
            return None;
        }
        Some(Rect::at(self.x1, self.y1).of_size(self.width() as u32, self.height() as u32))
    }
}

/// Copy of `image` with every detected region outlined.
pub fn draw_detections(image: &DynamicImage, detections: &DetectionSet) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for (label, bbox) in detections {
        match bbox.to_rect() {
            // Two pixel wide outline.
            Some(rect) => {
                draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
                if rect.width() > 2 && rect.height() > 2 {
                    let inner = Rect::at(rect.left() + 1, rect.top() + 1)
                        .of_size(rect.width() - 2, rect.height() - 2);
                    draw_hollow_rect_mut(&mut canvas, inner, BOX_COLOR);
                }
            }
            None => log::debug!("Not drawing empty box for {}", label),
        }
    }
    canvas
}

pub fn save_annotated(
    image: &DynamicImage,
    detections: &DetectionSet,
    out_path: &Path,
) -> Result<(), IdCardError> {
    draw_detections(image, detections).save(out_path)?;
    Ok(())
}
