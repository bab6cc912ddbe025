use crate::error::VerifyError;
use image::DynamicImage;

/// Text recognised on one page
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract", "ocrs")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognise text in an already preprocessed page image
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, VerifyError>;

    /// Get supported languages
    fn supported_languages(&self) -> Vec<String>;
}
