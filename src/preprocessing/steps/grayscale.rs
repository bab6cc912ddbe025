use crate::error::VerifyError;
use image::DynamicImage;

/// Convert image to 8-bit luma; every later step works on grayscale
pub fn apply(image: DynamicImage) -> Result<DynamicImage, VerifyError> {
    Ok(DynamicImage::ImageLuma8(image.into_luma8()))
}
