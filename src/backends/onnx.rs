//! Region detector exported from torchvision Faster R-CNN to ONNX.
//!
//! The graph takes one `3 x 293 x 293` float image scaled to `[0, 1]` and
//! returns `boxes [N, 4]` (frame pixels, `x1 y1 x2 y2`), `labels [N]` (int64
//! class ids) and `scores [N]`.

use crate::models::RawDetection;
use crate::processing::detection::RegionModel;
use crate::utils::IdCardError;
use image::RgbImage;
use ndarray::{Array, Ix3};
use ort::{session::Session, value::TensorRef};
use std::path::Path;

pub struct OnnxRegionModel {
    session: Session,
}

impl OnnxRegionModel {
    pub fn load(model_path: &Path) -> Result<Self, IdCardError> {
        log::info!("Loading region detector from {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| IdCardError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| IdCardError::ModelLoad(e.to_string()))?;

        log::info!("Region detector loaded");
        Ok(Self { session })
    }

    /// HWC bytes to CHW floats in `[0, 1]`.
    fn to_tensor(frame: &RgbImage) -> Array<f32, Ix3> {
        let (width, height) = frame.dimensions();
        let mut input = Array::zeros((3, height as usize, width as usize));
        for (x, y, pixel) in frame.enumerate_pixels() {
            for c in 0..3 {
                input[[c, y as usize, x as usize]] = f32::from(pixel[c]) / 255.0;
            }
        }
        input
    }
}

impl RegionModel for OnnxRegionModel {
    fn infer(&mut self, frame: &RgbImage) -> Result<Vec<RawDetection>, IdCardError> {
        let input = Self::to_tensor(frame);
        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| IdCardError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| IdCardError::Inference(e.to_string()))?;

        let (_, boxes) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| IdCardError::Inference(format!("Failed to extract boxes: {e}")))?;
        let (_, labels) = outputs[1]
            .try_extract_tensor::<i64>()
            .map_err(|e| IdCardError::Inference(format!("Failed to extract labels: {e}")))?;
        let (_, scores) = outputs[2]
            .try_extract_tensor::<f32>()
            .map_err(|e| IdCardError::Inference(format!("Failed to extract scores: {e}")))?;

        parse_outputs(boxes, labels, scores)
    }
}

/// Zip the three parallel output arrays into detections.
pub fn parse_outputs(
    boxes: &[f32],
    labels: &[i64],
    scores: &[f32],
) -> Result<Vec<RawDetection>, IdCardError> {
    if boxes.len() != labels.len() * 4 || labels.len() != scores.len() {
        return Err(IdCardError::Inference(format!(
            "Mismatched detector outputs: {} box values, {} labels, {} scores",
            boxes.len(),
            labels.len(),
            scores.len()
        )));
    }

    Ok(boxes
        .chunks_exact(4)
        .zip(labels.iter().zip(scores))
        .map(|(b, (label, score))| RawDetection::new([b[0], b[1], b[2], b[3]], *label, *score))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_parse_outputs() {
        let detections = parse_outputs(
            &[1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0],
            &[6, 7],
            &[0.9, 0.3],
        )
        .unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[1], RawDetection::new([10.0, 20.0, 30.0, 40.0], 7, 0.3));

        assert!(parse_outputs(&[1.0, 2.0, 3.0], &[1], &[0.5]).is_err());
        assert!(parse_outputs(&[], &[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_tensor_layout_is_chw() {
        let mut frame = RgbImage::from_pixel(4, 2, Rgb([0, 0, 0]));
        frame.put_pixel(3, 1, Rgb([255, 51, 0]));
        let tensor = OnnxRegionModel::to_tensor(&frame);
        assert_eq!(tensor.shape(), &[3, 2, 4]);
        assert_eq!(tensor[[0, 1, 3]], 1.0);
        assert_eq!(tensor[[1, 1, 3]], 0.2);
        assert_eq!(tensor[[2, 1, 3]], 0.0);
    }
}
