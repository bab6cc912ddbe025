//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. Neural network models are
//! downloaded into the user cache directory the first time a page is
//! recognised, so startup stays fast and QR-only traffic never needs them.

use crate::engine::{OcrEngine, OcrResult};
use crate::error::VerifyError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use once_cell::sync::OnceCell;
use rten::Model;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: OnceCell<OcrsOcrEngine>,
}

impl OcrsEngine {
    pub fn new() -> Self {
        Self {
            engine: OnceCell::new(),
        }
    }

    fn engine(&self) -> Result<&OcrsOcrEngine, VerifyError> {
        self.engine.get_or_try_init(load_engine)
    }
}

fn load_engine() -> Result<OcrsOcrEngine, VerifyError> {
    tracing::info!("Loading ocrs models...");

    let detection_model_path = ensure_model_downloaded(DETECTION_MODEL_URL, "text-detection.rten")?;
    let recognition_model_path =
        ensure_model_downloaded(RECOGNITION_MODEL_URL, "text-recognition.rten")?;

    let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
        VerifyError::InitializationError(format!("Failed to load detection model: {}", e))
    })?;
    let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
        VerifyError::InitializationError(format!("Failed to load recognition model: {}", e))
    })?;

    let engine = OcrsOcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        decode_method: DecodeMethod::Greedy,
        ..Default::default()
    })
    .map_err(|e| VerifyError::InitializationError(format!("Failed to create OCR engine: {}", e)))?;

    tracing::info!("ocrs engine ready");
    Ok(engine)
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - no system dependencies, models fetched on first use"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, VerifyError> {
        let engine = self.engine()?;

        // ocrs expects RGB8 in HWC layout
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            VerifyError::ProcessingError(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = engine
            .prepare_input(img_source)
            .map_err(|e| VerifyError::ProcessingError(format!("Failed to prepare input: {}", e)))?;

        let word_rects = engine
            .detect_words(&ocr_input)
            .map_err(|e| VerifyError::ProcessingError(format!("Failed to detect words: {}", e)))?;

        let line_rects = engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| VerifyError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        // Line structure matters: name extraction looks at the line after "DOB"
        let text = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(OcrResult { text })
    }

    fn supported_languages(&self) -> Vec<String> {
        // ocrs currently only supports English/Latin alphabet
        vec!["eng".to_string()]
    }
}

/// Ensure model is downloaded and return its path
fn ensure_model_downloaded(url: &str, filename: &str) -> Result<PathBuf, VerifyError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("aadhaar-verify");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        VerifyError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    let model_path = cache_dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::debug!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a file from URL to path using ureq.
///
/// The body lands in a sibling temp file first so an interrupted download
/// never leaves a truncated model behind.
fn download_file(url: &str, path: &Path) -> Result<(), VerifyError> {
    let response = ureq::get(url).call().map_err(|e| {
        VerifyError::InitializationError(format!("Failed to download model: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        VerifyError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut partial = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        VerifyError::InitializationError(format!("Failed to create model file: {}", e))
    })?;
    partial
        .write_all(&buffer)
        .map_err(|e| VerifyError::InitializationError(format!("Failed to write model file: {}", e)))?;
    partial.persist(path).map_err(|e| {
        VerifyError::InitializationError(format!("Failed to store model file: {}", e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_does_not_load_models() {
        let engine = OcrsEngine::new();
        assert!(engine.engine.get().is_none());
        assert_eq!(engine.name(), "ocrs");
        assert_eq!(engine.supported_languages(), vec!["eng".to_string()]);
    }
}
