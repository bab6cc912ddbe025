use crate::error::VerifyError;
use image::{DynamicImage, GrayImage, Luma};

/// Scale every pixel's distance from the mean gray level by `factor`.
///
/// `factor` 1.0 is the identity, 0.0 flattens the image to its mean.
pub fn apply(image: DynamicImage, factor: f32) -> Result<DynamicImage, VerifyError> {
    let gray = image.to_luma8();
    if gray.width() == 0 || gray.height() == 0 {
        return Ok(DynamicImage::ImageLuma8(gray));
    }

    let mean = mean_level(&gray);
    let enhanced = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0] as f32;
        let out = mean + factor * (value - mean);
        Luma([out.round().clamp(0.0, 255.0) as u8])
    });

    Ok(DynamicImage::ImageLuma8(enhanced))
}

/// Mean gray level rounded to the nearest integer
fn mean_level(img: &GrayImage) -> f32 {
    let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    let count = img.width() as u64 * img.height() as u64;
    (sum as f64 / count as f64).round() as f32
}
