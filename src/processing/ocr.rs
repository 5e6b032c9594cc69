use crate::models::rules::{reverses_tokens, script_for};
use crate::models::{CropSet, FieldLabel, FieldTextResult, Script};
use crate::processing::numerals::birth_date_from_text;
use crate::utils::IdCardError;
use image::{DynamicImage, ImageFormat};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Text recognition capability for one script profile.
pub trait TextModel: Send {
    /// Recognized tokens in the order the engine scanned them, left to right.
    fn recognize(&mut self, image_path: &Path) -> Result<Vec<String>, IdCardError>;
}

impl<T: TextModel + ?Sized> TextModel for Box<T> {
    fn recognize(&mut self, image_path: &Path) -> Result<Vec<String>, IdCardError> {
        (**self).recognize(image_path)
    }
}

pub type EngineFactory = Box<dyn FnOnce() -> Result<Box<dyn TextModel>, IdCardError> + Send>;

/// An engine built on first use and reused afterwards.
///
/// A failed construction is remembered, so the profile stays unavailable for
/// the lifetime of the slot instead of retrying on every field.
struct EngineSlot {
    script: Script,
    factory: Option<EngineFactory>,
    engine: Option<Box<dyn TextModel>>,
    init_error: Option<String>,
}

impl EngineSlot {
    fn ready(script: Script, engine: Box<dyn TextModel>) -> Self {
        Self {
            script,
            factory: None,
            engine: Some(engine),
            init_error: None,
        }
    }

    fn lazy(script: Script, factory: EngineFactory) -> Self {
        Self {
            script,
            factory: Some(factory),
            engine: None,
            init_error: None,
        }
    }

    fn get(&mut self) -> Result<&mut Box<dyn TextModel>, IdCardError> {
        let script = self.script;
        if self.engine.is_none() {
            if let Some(message) = &self.init_error {
                return Err(IdCardError::RecognizerInit {
                    script,
                    message: message.clone(),
                });
            }
            let factory = self.factory.take().ok_or_else(|| IdCardError::RecognizerInit {
                script,
                message: "no engine factory configured".to_string(),
            })?;
            match factory() {
                Ok(engine) => {
                    log::info!("{} OCR engine initialized", script);
                    self.engine = Some(engine);
                }
                Err(e) => {
                    let message = e.to_string();
                    log::error!("Failed to initialize {} OCR: {}", script, message);
                    self.init_error = Some(message.clone());
                    return Err(IdCardError::RecognizerInit { script, message });
                }
            }
        }
        match self.engine.as_mut() {
            Some(engine) => Ok(engine),
            None => Err(IdCardError::RecognizerInit {
                script,
                message: "engine unavailable".to_string(),
            }),
        }
    }
}

/// Reads the cropped fields with an Arabic and an English engine.
pub struct TextRecognizer {
    arabic: EngineSlot,
    english: EngineSlot,
}

impl TextRecognizer {
    /// Use engines that are already constructed.
    pub fn new(arabic: Box<dyn TextModel>, english: Box<dyn TextModel>) -> Self {
        Self {
            arabic: EngineSlot::ready(Script::Arabic, arabic),
            english: EngineSlot::ready(Script::English, english),
        }
    }

    /// Defer engine construction until a field for that script is read.
    pub fn lazy(arabic: EngineFactory, english: EngineFactory) -> Self {
        Self {
            arabic: EngineSlot::lazy(Script::Arabic, arabic),
            english: EngineSlot::lazy(Script::English, english),
        }
    }

    /// Construct both engines now, e.g. at service startup.
    pub fn warm_up(&mut self) -> Result<(), IdCardError> {
        self.arabic.get()?;
        self.english.get()?;
        Ok(())
    }

    fn engine(&mut self, script: Script) -> Result<&mut Box<dyn TextModel>, IdCardError> {
        match script {
            Script::Arabic => self.arabic.get(),
            Script::English => self.english.get(),
        }
    }

    /// Read the six recognized fields given in `[Add1, Add2, Name1, Name2, Num1, Num2]` order.
    pub fn run_ocr(&mut self, images: &[PathBuf; 6]) -> FieldTextResult {
        let crops: CropSet = FieldLabel::RECOGNIZED
            .iter()
            .copied()
            .zip(images.iter().cloned())
            .collect();
        self.recognize(&crops)
    }

    /// Read whichever fields are present and derive `BD` from `Num1`.
    ///
    /// Every label is present in the result; unreadable fields are empty.
    pub fn recognize(&mut self, crops: &CropSet) -> FieldTextResult {
        let mut result = FieldTextResult::new();
        for label in FieldLabel::RECOGNIZED {
            if let Some(path) = crops.get(&label) {
                let tokens = self.recognize_field(label, path);
                result.set(label, tokens);
            }
        }
        derive_birth_date_field(&mut result);
        result
    }

    /// Tokens for one field in reading order; empty on any failure.
    pub fn recognize_field(&mut self, label: FieldLabel, image_path: &Path) -> Vec<String> {
        let Some(script) = script_for(label) else {
            return Vec::new();
        };

        let engine = match self.engine(script) {
            Ok(engine) => engine,
            Err(e) => {
                log::warn!("OCR model initialization failed for {}: {}", label, e);
                return Vec::new();
            }
        };

        if !validate_image(image_path) {
            log::warn!("Image validation failed for {}: {:?}", label, image_path);
            return Vec::new();
        }

        match engine.recognize(image_path) {
            Ok(mut tokens) => {
                if reverses_tokens(label) && tokens.len() > 1 {
                    tokens.reverse();
                }
                tokens
            }
            Err(e) => {
                let failure = IdCardError::Recognition {
                    label,
                    message: format!("{:?}: {}", image_path, e),
                };
                log::warn!("{}", failure);
                Vec::new()
            }
        }
    }

    /// Read an in-memory crop by spilling it to a temporary PNG.
    pub fn recognize_image(&mut self, label: FieldLabel, image: &DynamicImage) -> Vec<String> {
        let temp_file = match tempfile::Builder::new().suffix(".png").tempfile() {
            Ok(file) => file,
            Err(e) => {
                log::warn!("Failed to create temp file for {}: {}", label, e);
                return Vec::new();
            }
        };
        if let Err(e) = image.save_with_format(temp_file.path(), ImageFormat::Png) {
            log::warn!("Failed to write temp image for {}: {}", label, e);
            return Vec::new();
        }
        self.recognize_field(label, temp_file.path())
    }

    /// All tokens of one image merged into a single line, in engine order.
    pub fn recognize_single(&mut self, image_path: &Path, script: Script) -> String {
        if !validate_image(image_path) {
            return String::new();
        }
        let tokens = match self.engine(script).and_then(|engine| engine.recognize(image_path)) {
            Ok(tokens) => tokens,
            Err(e) => {
                log::warn!("OCR error for {:?}: {}", image_path, e);
                return String::new();
            }
        };
        tokens
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One merged string per label, in engine order.
    ///
    /// Missing crops stay empty. `BD` comes from the whole `Num1` string, so
    /// an ID number split across tokens still yields a birth date.
    pub fn process_crops(&mut self, crops: &CropSet) -> BTreeMap<FieldLabel, String> {
        let mut out: BTreeMap<FieldLabel, String> = FieldLabel::ALL
            .iter()
            .map(|label| (*label, String::new()))
            .collect();

        for (label, path) in crops {
            let Some(script) = script_for(*label) else {
                continue;
            };
            if !path.exists() {
                continue;
            }
            out.insert(*label, self.recognize_single(path, script));
        }

        let birth_date = out
            .get(&FieldLabel::Num1)
            .and_then(|num1| birth_date_from_text(num1))
            .unwrap_or_default();
        out.insert(FieldLabel::BD, birth_date);
        out
    }
}

/// Crop file exists, is non-empty and decodes to a non-zero area image.
pub fn validate_image(image_path: &Path) -> bool {
    match std::fs::metadata(image_path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {}
        _ => return false,
    }
    match image::image_dimensions(image_path) {
        Ok((width, height)) => width > 0 && height > 0,
        Err(_) => false,
    }
}

/// Fill `BD` from the first `Num1` token, or leave it empty.
pub fn derive_birth_date_field(result: &mut FieldTextResult) {
    let birth_date = result
        .get(FieldLabel::Num1)
        .first()
        .and_then(|token| birth_date_from_text(token));
    result.set(FieldLabel::BD, birth_date.into_iter().collect());
}
