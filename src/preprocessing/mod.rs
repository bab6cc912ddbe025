//! Image preprocessing applied before QR detection and OCR
//!
//! Card photos are usually low contrast and slightly soft; the presets here
//! push them towards crisp dark-on-light text before any decoding happens.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, Preset};
