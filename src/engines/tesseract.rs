//! Tesseract engine implementation
//!
//! Drives the `tesseract` executable installed alongside the server (the
//! container image ships `tesseract-ocr`). Each page is written to a temporary
//! PNG and recognised with `tesseract <file> stdout -l <lang>`.

use crate::config::Config;
use crate::engine::{OcrEngine, OcrResult};
use crate::error::VerifyError;
use image::DynamicImage;
use std::process::{Command, Stdio};

/// Tesseract CLI OCR Engine
pub struct TesseractEngine {
    executable: String,
    language: String,
}

impl TesseractEngine {
    /// Probe the executable and create the engine
    pub fn new(config: &Config) -> Result<Self, VerifyError> {
        let output = Command::new(&config.tesseract_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                VerifyError::InitializationError(format!(
                    "Failed to run {}: {}",
                    config.tesseract_path, e
                ))
            })?;

        if !output.status.success() {
            return Err(VerifyError::InitializationError(format!(
                "{} --version exited with {}",
                config.tesseract_path, output.status
            )));
        }

        // Older releases print the banner on stderr
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };

        tracing::info!(
            "Tesseract engine initialized ({}, language: {})",
            banner.lines().next().unwrap_or("unknown version").trim(),
            config.language
        );

        Ok(Self {
            executable: config.tesseract_path.clone(),
            language: config.language.clone(),
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR via the system executable - best accuracy on card photos"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, VerifyError> {
        let page = tempfile::Builder::new()
            .prefix("aadhaar-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| VerifyError::Internal(format!("Failed to create temp file: {}", e)))?;

        image
            .save_with_format(page.path(), image::ImageFormat::Png)
            .map_err(|e| VerifyError::ProcessingError(format!("Failed to write page: {}", e)))?;

        tracing::debug!(
            "Running tesseract on {}x{} page",
            image.width(),
            image.height()
        );

        let output = Command::new(&self.executable)
            .arg(page.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                VerifyError::ProcessingError(format!("Failed to run tesseract: {}", e))
            })?;

        if !output.status.success() {
            return Err(VerifyError::ProcessingError(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(OcrResult {
            text: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }

    fn supported_languages(&self) -> Vec<String> {
        vec![self.language.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_fails_initialization() {
        let mut config = Config::for_tests();
        config.tesseract_path = "/nonexistent/bin/tesseract".to_string();

        match TesseractEngine::new(&config) {
            Err(VerifyError::InitializationError(msg)) => {
                assert!(msg.contains("/nonexistent/bin/tesseract"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("engine should not initialize without an executable"),
        }
    }
}
