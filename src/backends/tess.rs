use crate::models::Script;
use crate::processing::ocr::{EngineFactory, TextModel};
use crate::utils::IdCardError;
use std::path::{Path, PathBuf};
use tesseract::Tesseract;

/// libtesseract engine for one script; one token per recognized text line.
pub struct TesseractEngine {
    api: Option<Tesseract>,
    datapath: Option<String>,
    script: Script,
}

impl TesseractEngine {
    pub fn new(script: Script, tessdata: Option<&Path>) -> Result<Self, IdCardError> {
        let datapath = tessdata.map(|p| p.to_string_lossy().into_owned());
        let api = Self::init(datapath.as_deref(), script)?;
        Ok(Self {
            api: Some(api),
            datapath,
            script,
        })
    }

    /// Deferred constructor for [`crate::processing::TextRecognizer::lazy`].
    pub fn factory(script: Script, tessdata: Option<PathBuf>) -> EngineFactory {
        Box::new(move || -> Result<Box<dyn TextModel>, IdCardError> {
            Ok(Box::new(Self::new(script, tessdata.as_deref())?))
        })
    }

    fn init(datapath: Option<&str>, script: Script) -> Result<Tesseract, IdCardError> {
        Tesseract::new(datapath, Some(language_for(script))).map_err(|e| {
            IdCardError::RecognizerInit {
                script,
                message: format!("Tesseract init error: {}", e),
            }
        })
    }
}

/// Tesseract language pack for a script profile.
pub fn language_for(script: Script) -> &'static str {
    match script {
        Script::Arabic => "ara",
        Script::English => "eng",
    }
}

impl TextModel for TesseractEngine {
    fn recognize(&mut self, image_path: &Path) -> Result<Vec<String>, IdCardError> {
        let path_str = image_path.to_str().ok_or_else(|| {
            IdCardError::ImageProcessing(format!("Non UTF-8 image path: {:?}", image_path))
        })?;

        // set_image consumes the handle; a failure leaves the slot empty and
        // the next call re-initializes.
        let api = match self.api.take() {
            Some(api) => api,
            None => Self::init(self.datapath.as_deref(), self.script)?,
        };
        let mut api = api
            .set_image(path_str)
            .map_err(|e| IdCardError::Inference(format!("Tesseract set image error: {}", e)))?;
        api.set_page_seg_mode(tesseract::PageSegMode::PsmSingleBlock);

        let text = api.get_text();
        self.api = Some(api);
        let text = text.map_err(|e| IdCardError::Inference(format!("Tesseract error: {}", e)))?;

        log::debug!("{} OCR result for {:?}: {:?}", self.script, image_path, text);
        Ok(text_to_tokens(&text))
    }
}

fn text_to_tokens(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
