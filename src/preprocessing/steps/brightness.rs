use crate::error::VerifyError;
use image::{DynamicImage, GrayImage, Luma};

/// Multiply every gray level by `factor`, saturating at white
pub fn apply(image: DynamicImage, factor: f32) -> Result<DynamicImage, VerifyError> {
    let gray = image.to_luma8();
    let brightened = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0] as f32 * factor;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    });
    Ok(DynamicImage::ImageLuma8(brightened))
}
