use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Semantic region on the front of an Egyptian national ID card.
///
/// Variant order follows the detector's class table, so ordered maps keyed by
/// label serialize in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldLabel {
    Add1,
    Add2,
    BD,
    Name1,
    Name2,
    Num1,
    Num2,
}

impl FieldLabel {
    pub const ALL: [FieldLabel; 7] = [
        FieldLabel::Add1,
        FieldLabel::Add2,
        FieldLabel::BD,
        FieldLabel::Name1,
        FieldLabel::Name2,
        FieldLabel::Num1,
        FieldLabel::Num2,
    ];

    /// The six labels that are cropped and sent to OCR, in batch order.
    pub const RECOGNIZED: [FieldLabel; 6] = [
        FieldLabel::Add1,
        FieldLabel::Add2,
        FieldLabel::Name1,
        FieldLabel::Name2,
        FieldLabel::Num1,
        FieldLabel::Num2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldLabel::Add1 => "Add1",
            FieldLabel::Add2 => "Add2",
            FieldLabel::BD => "BD",
            FieldLabel::Name1 => "Name1",
            FieldLabel::Name2 => "Name2",
            FieldLabel::Num1 => "Num1",
            FieldLabel::Num2 => "Num2",
        }
    }

    /// Human readable caption used in reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            FieldLabel::Add1 => "Address Line 1 (Arabic)",
            FieldLabel::Add2 => "Address Line 2 (Arabic)",
            FieldLabel::BD => "Birth Date",
            FieldLabel::Name1 => "Name Line 1 (Arabic)",
            FieldLabel::Name2 => "Name Line 2 (Arabic)",
            FieldLabel::Num1 => "National ID Number",
            FieldLabel::Num2 => "ID Card Number",
        }
    }

    /// `BD` is derived from `Num1`, never cropped or recognized.
    pub fn is_derived(&self) -> bool {
        matches!(self, FieldLabel::BD)
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognition profile an OCR engine is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    Arabic,
    English,
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Script::Arabic => write!(f, "Arabic"),
            Script::English => write!(f, "English"),
        }
    }
}

/// Axis-aligned box in original image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Map a box from detection frame space into image space, one factor per axis.
    pub fn scale(&self, scale_x: f64, scale_y: f64) -> Self {
        Self {
            x1: (f64::from(self.x1) * scale_x) as i32,
            y1: (f64::from(self.y1) * scale_y) as i32,
            x2: (f64::from(self.x2) * scale_x) as i32,
            y2: (f64::from(self.y2) * scale_y) as i32,
        }
    }

    /// Grow the box by 1% of its size on each side, at least 2 pixels per axis.
    pub fn pad(&self) -> Self {
        let pad_x = ((0.01 * f64::from(self.width())).round() as i32).max(2);
        let pad_y = ((0.01 * f64::from(self.height())).round() as i32).max(2);
        Self {
            x1: self.x1.saturating_sub(pad_x),
            y1: self.y1.saturating_sub(pad_y),
            x2: self.x2.saturating_add(pad_x),
            y2: self.y2.saturating_add(pad_y),
        }
    }

    /// Clamp to `[0, width] x [0, height]`.
    pub fn clamp(&self, width: u32, height: u32) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// One raw output row of the detection capability, in frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub bbox: [f32; 4],
    pub class_id: i64,
    pub score: f32,
}

impl RawDetection {
    pub fn new(bbox: [f32; 4], class_id: i64, score: f32) -> Self {
        Self { bbox, class_id, score }
    }
}

/// How to collapse several surviving detections for the same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Keep whichever detection the model emitted last.
    #[default]
    LastSeen,
    /// Keep the detection with the highest confidence score.
    HighestScore,
}

/// Label to box, at most one box per label, never containing `BD` after cropping.
pub type DetectionSet = BTreeMap<FieldLabel, BoundingBox>;

/// Label to the normalized crop written for it.
pub type CropSet = BTreeMap<FieldLabel, PathBuf>;

/// Recognized tokens per label; always carries all seven labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTextResult {
    fields: BTreeMap<FieldLabel, Vec<String>>,
}

impl FieldTextResult {
    pub fn new() -> Self {
        let fields = FieldLabel::ALL
            .iter()
            .map(|label| (*label, Vec::new()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, label: FieldLabel) -> &[String] {
        self.fields.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, label: FieldLabel, tokens: Vec<String>) {
        self.fields.insert(label, tokens);
    }

    /// Tokens joined with single spaces, skipping empty ones.
    pub fn joined(&self, label: FieldLabel) -> String {
        self.get(label)
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn birth_date(&self) -> Option<&str> {
        self.get(FieldLabel::BD).first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldLabel, &Vec<String>)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no field produced any text.
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(Vec::is_empty)
    }
}

impl Default for FieldTextResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize)]
pub struct IdCardReport {
    pub detections: DetectionSet,
    pub crop_map: CropSet,
    pub ocr_result: FieldTextResult,
}
