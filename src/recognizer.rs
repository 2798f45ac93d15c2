// Text recognition module
// Runs Tesseract on a binarized image with a restricted character set

use crate::bootstrap::trained_data_file;
use image::{DynamicImage, RgbImage};
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Characters Tesseract may emit by default
pub const DIGITS: &str = "0123456789";

#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("trained data not found: {}", .0.display())]
    MissingTrainedData(PathBuf),
    #[error("failed to prepare image for tesseract: {0}")]
    Image(String),
    #[error("tesseract failed: {0}")]
    Engine(String),
}

/// Something that turns an image into text
pub trait Recognizer {
    fn recognize(&self, image: &RgbImage) -> Result<String, RecognizeError>;
}

/// Environment variable tesseract reads its model directory from
pub const TESSDATA_ENV: &str = "TESSDATA_PREFIX";

/// Point child tesseract processes at `dir`.
///
/// rusty-tesseract has no data-dir argument, so the directory goes through the
/// process environment. Call once at startup, before any other threads exist.
pub fn export_tessdata_dir(dir: &Path) {
    debug!("{}={}", TESSDATA_ENV, dir.display());
    std::env::set_var(TESSDATA_ENV, dir);
}

/// Recognizer backed by the system tesseract binary.
///
/// `tessdata_dir` is only used to check the model exists; tesseract itself
/// finds it through [`export_tessdata_dir`].
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    /// Directory holding `<lang>.traineddata`
    pub tessdata_dir: PathBuf,
    pub lang: String,
    /// Passed as `tessedit_char_whitelist`
    pub whitelist: String,
    /// Page segmentation mode, tesseract's default when `None`
    pub psm: Option<i32>,
}

impl TesseractRecognizer {
    pub fn new(tessdata_dir: PathBuf, lang: impl Into<String>) -> Self {
        Self {
            tessdata_dir,
            lang: lang.into(),
            whitelist: DIGITS.to_string(),
            psm: None,
        }
    }

    pub fn with_whitelist(mut self, whitelist: impl Into<String>) -> Self {
        self.whitelist = whitelist.into();
        self
    }

    pub fn with_psm(mut self, psm: Option<i32>) -> Self {
        self.psm = psm;
        self
    }

    fn args(&self) -> rusty_tesseract::Args {
        let mut config_variables = HashMap::new();
        if !self.whitelist.is_empty() {
            config_variables.insert(
                "tessedit_char_whitelist".to_string(),
                self.whitelist.clone(),
            );
        }

        rusty_tesseract::Args {
            lang: self.lang.clone(),
            config_variables,
            dpi: None,
            psm: self.psm,
            oem: None,
        }
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &RgbImage) -> Result<String, RecognizeError> {
        let model = self.tessdata_dir.join(trained_data_file(&self.lang));
        if !model.is_file() {
            return Err(RecognizeError::MissingTrainedData(model));
        }

        let dynamic = DynamicImage::ImageRgb8(image.clone());
        let tess_img = rusty_tesseract::Image::from_dynamic_image(&dynamic)
            .map_err(|e| RecognizeError::Image(e.to_string()))?;

        debug!(
            "Running tesseract on {}x{} image (lang: {}, whitelist: {:?})",
            image.width(),
            image.height(),
            self.lang,
            self.whitelist
        );

        let text = rusty_tesseract::image_to_string(&tess_img, &self.args())
            .map_err(|e| RecognizeError::Engine(e.to_string()))?;
        let text = text.trim_end().to_string();

        info!("Recognized {} characters", text.chars().count());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_digits() {
        let r = TesseractRecognizer::new(PathBuf::from("/tmp/tessdata"), "jpn");
        let args = r.args();
        assert_eq!(args.lang, "jpn");
        assert_eq!(
            args.config_variables.get("tessedit_char_whitelist").map(String::as_str),
            Some(DIGITS)
        );
        assert_eq!(args.psm, None);
    }

    #[test]
    fn test_empty_whitelist_is_not_passed() {
        let r = TesseractRecognizer::new(PathBuf::from("/tmp/tessdata"), "eng")
            .with_whitelist("")
            .with_psm(Some(7));
        let args = r.args();
        assert!(args.config_variables.is_empty());
        assert_eq!(args.psm, Some(7));
    }

    #[test]
    fn test_export_tessdata_dir() {
        let dir = tempfile::tempdir().unwrap();
        export_tessdata_dir(dir.path());
        assert_eq!(
            std::env::var_os(TESSDATA_ENV).map(PathBuf::from),
            Some(dir.path().to_path_buf())
        );
    }

    #[test]
    fn test_missing_model_is_reported_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let r = TesseractRecognizer::new(dir.path().to_path_buf(), "jpn");
        let img = RgbImage::new(4, 4);

        match r.recognize(&img) {
            Err(RecognizeError::MissingTrainedData(path)) => {
                assert_eq!(path, dir.path().join("jpn.traineddata"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
