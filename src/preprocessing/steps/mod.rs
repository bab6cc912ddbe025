//! Individual preprocessing steps

pub mod brightness;
pub mod contrast;
pub mod grayscale;
pub mod resize;
pub mod sharpen;
pub mod threshold;
