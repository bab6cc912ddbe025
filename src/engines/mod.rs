//! OCR engine implementations
//!
//! The tesseract engine is always compiled and becomes available when its
//! executable can be found. The ocrs engine is gated on `engine-ocrs`.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

pub mod tesseract;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::VerifyError;
use serde::Serialize;
use std::sync::Arc;

/// Information about an available engine
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub supported_languages: Vec<String>,
}

/// Registry of available OCR engines
pub struct EngineRegistry {
    engines: Vec<Arc<dyn OcrEngine>>,
    default_engine: String,
}

impl EngineRegistry {
    /// Create a new engine registry with every engine that can run here
    pub fn new(config: &Config) -> Result<Self, VerifyError> {
        let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

        match tesseract::TesseractEngine::new(config) {
            Ok(engine) => engines.push(Arc::new(engine)),
            Err(e) => tracing::warn!("Tesseract engine unavailable: {}", e),
        }

        #[cfg(feature = "engine-ocrs")]
        {
            tracing::info!("Registering ocrs engine (models load on first use)");
            engines.push(Arc::new(ocrs::OcrsEngine::new()));
        }

        Self::from_engines(engines, config.engine.as_deref())
    }

    /// Build a registry from already constructed engines
    pub fn from_engines(
        engines: Vec<Arc<dyn OcrEngine>>,
        preferred: Option<&str>,
    ) -> Result<Self, VerifyError> {
        let first = engines.first().map(|e| e.name().to_string()).ok_or_else(|| {
            VerifyError::InitializationError(
                "No OCR engines available. Install tesseract or build with --features engine-ocrs"
                    .to_string(),
            )
        })?;

        let default_engine = match preferred {
            Some(name) if engines.iter().any(|e| e.name() == name) => name.to_string(),
            Some(name) => return Err(VerifyError::UnknownEngine(name.to_string())),
            None => first,
        };

        Ok(Self {
            engines,
            default_engine,
        })
    }

    /// Get an engine by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn OcrEngine>> {
        self.engines.iter().find(|e| e.name() == name).cloned()
    }

    /// Resolve the engine for a request, falling back to the default
    pub fn resolve(&self, requested: Option<&str>) -> Result<Arc<dyn OcrEngine>, VerifyError> {
        let name = requested.unwrap_or(&self.default_engine);
        self.get(name)
            .ok_or_else(|| VerifyError::UnknownEngine(name.to_string()))
    }

    /// Get the default engine name
    pub fn default_name(&self) -> &str {
        &self.default_engine
    }

    /// Get info about all available engines
    pub fn info(&self) -> Vec<EngineInfo> {
        self.engines
            .iter()
            .map(|e| EngineInfo {
                name: e.name(),
                description: e.description(),
                supported_languages: e.supported_languages(),
            })
            .collect()
    }
}
