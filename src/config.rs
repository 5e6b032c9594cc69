use crate::processing::crop::DEFAULT_CROP_MAX_SIZE;
use crate::processing::detection::DEFAULT_SCORE_THRESHOLD;
use crate::utils::IdCardError;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const SCORE_THRESHOLD_RANGE: RangeInclusive<f32> = 0.1..=1.0;
pub const CROP_MAX_SIZE_RANGE: RangeInclusive<u32> = 400..=1200;

/// Detector weights looked up when no override is given.
pub const DEFAULT_MODEL_FILE: &str = "models/id_regions.onnx";
pub const DEFAULT_CROPS_DIR: &str = "static/crops";

/// Explicit settings that take precedence over the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub score_threshold: Option<f32>,
    pub crop_max_size: Option<u32>,
    pub crops_dir: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
    pub tessdata_prefix: Option<PathBuf>,
}

/// Runtime settings for the ID card reader.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    pub score_threshold: f32,
    pub crop_max_size: u32,
    pub crops_dir: PathBuf,
    pub model_path: Option<PathBuf>,
    pub tessdata_prefix: Option<PathBuf>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            crop_max_size: DEFAULT_CROP_MAX_SIZE,
            crops_dir: PathBuf::from(DEFAULT_CROPS_DIR),
            model_path: None,
            tessdata_prefix: None,
        }
    }
}

impl ReaderConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, IdCardError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IdCardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(value) = var("DETECTION_SCORE_THRESHOLD") {
            config.score_threshold = value.parse().map_err(|_| {
                IdCardError::Config(format!("DETECTION_SCORE_THRESHOLD is not a number: {}", value))
            })?;
        }
        if let Some(value) = var("CROP_MAX_SIZE") {
            config.crop_max_size = value.parse().map_err(|_| {
                IdCardError::Config(format!("CROP_MAX_SIZE is not a pixel count: {}", value))
            })?;
        }
        if let Some(value) = var("CROPS_DIR") {
            config.crops_dir = PathBuf::from(value);
        }
        config.model_path = var("MODEL_WEIGHTS_PATH").map(PathBuf::from);
        config.tessdata_prefix = var("TESSDATA_PREFIX").map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    /// Layer explicit settings over this config and validate the result.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Result<Self, IdCardError> {
        if let Some(threshold) = overrides.score_threshold {
            self.score_threshold = threshold;
        }
        if let Some(max_size) = overrides.crop_max_size {
            self.crop_max_size = max_size;
        }
        if let Some(dir) = overrides.crops_dir {
            self.crops_dir = dir;
        }
        if overrides.model_path.is_some() {
            self.model_path = overrides.model_path;
        }
        if overrides.tessdata_prefix.is_some() {
            self.tessdata_prefix = overrides.tessdata_prefix;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), IdCardError> {
        if !SCORE_THRESHOLD_RANGE.contains(&self.score_threshold) {
            return Err(IdCardError::Config(format!(
                "detection score threshold {} outside {:?}",
                self.score_threshold, SCORE_THRESHOLD_RANGE
            )));
        }
        if !CROP_MAX_SIZE_RANGE.contains(&self.crop_max_size) {
            return Err(IdCardError::Config(format!(
                "crop max size {} outside {:?}",
                self.crop_max_size, CROP_MAX_SIZE_RANGE
            )));
        }
        Ok(())
    }

    /// Detector weights: the explicit override if it exists, else the bundled default.
    pub fn resolve_model_path(&self) -> Result<PathBuf, IdCardError> {
        self.resolve_model_path_in(Path::new("."))
    }

    pub fn resolve_model_path_in(&self, base_dir: &Path) -> Result<PathBuf, IdCardError> {
        let mut tried = Vec::new();

        if let Some(path) = &self.model_path {
            if path.is_file() {
                return Ok(path.clone());
            }
            log::warn!("Model override {:?} does not exist, trying default", path);
            tried.push(path.clone());
        }

        let default = base_dir.join(DEFAULT_MODEL_FILE);
        if default.is_file() {
            return Ok(default);
        }
        tried.push(default);

        Err(IdCardError::ModelLoad(format!(
            "Detector weights file does not exist. Tried: {:?}",
            tried
        )))
    }
}
