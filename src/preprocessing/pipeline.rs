use crate::error::VerifyError;
use image::DynamicImage;
use std::time::Instant;

use super::steps;

/// Contrast factor of the card enhancement chain
const CONTRAST_FACTOR: f32 = 2.0;
/// Brightness factor of the card enhancement chain
const BRIGHTNESS_FACTOR: f32 = 1.2;

/// Preprocessing preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Hand the decoded image over untouched
    None,
    /// Card enhancement: grayscale, contrast x2, sharpen, brightness x1.2
    #[default]
    Standard,
    /// Standard chain plus upscaling and adaptive binarization, for blurry
    /// phone photos and low resolution scans
    Aggressive,
}

impl Preset {
    /// Parse from a config value or query parameter
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(Self::None),
            "standard" | "default" => Some(Self::Standard),
            "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Standard => "standard",
            Self::Aggressive => "aggressive",
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: &'static str,
    pub time_ms: u64,
}

/// Preprocessed image plus per-step timings
#[derive(Debug, Clone)]
pub struct PreprocessingResult {
    pub image: DynamicImage,
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline that applies steps based on preset
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    preset: Preset,
}

impl Pipeline {
    pub fn new(preset: Preset) -> Self {
        Self { preset }
    }

    pub fn preset(&self) -> Preset {
        self.preset
    }

    /// Process an image according to the configured preset
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, VerifyError> {
        let start = Instant::now();
        let mut timings = Vec::new();

        if self.preset == Preset::None {
            return Ok(PreprocessingResult {
                image,
                steps: timings,
            });
        }

        let mut img = run_step("grayscale", image, &mut timings, steps::grayscale::apply)?;

        if self.preset == Preset::Aggressive {
            img = run_step("resize", img, &mut timings, steps::resize::apply)?;
        }

        img = run_step("contrast", img, &mut timings, |i| {
            steps::contrast::apply(i, CONTRAST_FACTOR)
        })?;
        img = run_step("sharpen", img, &mut timings, steps::sharpen::apply)?;
        img = run_step("brightness", img, &mut timings, |i| {
            steps::brightness::apply(i, BRIGHTNESS_FACTOR)
        })?;

        if self.preset == Preset::Aggressive {
            img = run_step("threshold", img, &mut timings, steps::threshold::apply)?;
        }

        tracing::debug!(
            preset = self.preset.as_str(),
            total_ms = start.elapsed().as_millis() as u64,
            steps = ?timings,
            "Preprocessing finished"
        );

        Ok(PreprocessingResult {
            image: img,
            steps: timings,
        })
    }
}

fn run_step<F>(
    name: &'static str,
    img: DynamicImage,
    timings: &mut Vec<StepTiming>,
    step_fn: F,
) -> Result<DynamicImage, VerifyError>
where
    F: FnOnce(DynamicImage) -> Result<DynamicImage, VerifyError>,
{
    let step_start = Instant::now();
    let result = step_fn(img)?;
    timings.push(StepTiming {
        name,
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    Ok(result)
}
