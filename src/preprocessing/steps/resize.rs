use crate::error::VerifyError;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

/// Short edge a card photo is scaled up to
const TARGET_SHORT_EDGE: u32 = 1000;
/// Long edge never exceeds this, whatever the input
const MAX_LONG_EDGE: u32 = 4000;

/// Bring the image to a resolution where card text is ~300 DPI.
///
/// Small photos are upscaled until the short edge reaches the target, large
/// scans are capped on the long edge. Near-identical sizes are left alone.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, VerifyError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Ok(image);
    }

    let scale = target_scale(width, height);
    if (0.95..=1.05).contains(&scale) {
        return Ok(image);
    }

    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);
    Ok(image.resize_exact(new_width, new_height, FilterType::Lanczos3))
}

fn target_scale(width: u32, height: u32) -> f32 {
    let short_edge = width.min(height) as f32;
    let long_edge = width.max(height) as f32;

    let up = (TARGET_SHORT_EDGE as f32 / short_edge).max(1.0);
    let cap = MAX_LONG_EDGE as f32 / long_edge;
    up.min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn test_resize_upscales_small_card() {
        let img = GrayImage::new(400, 250);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(result.height(), TARGET_SHORT_EDGE);
        assert_eq!(result.width(), 1600);
    }

    #[test]
    fn test_resize_caps_long_edge() {
        let img = GrayImage::new(5000, 1200);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(result.width(), MAX_LONG_EDGE);
        assert_eq!(result.height(), 960);
    }

    #[test]
    fn test_resize_keeps_adequate_image() {
        let img = GrayImage::new(1800, 1000);
        let result = apply(DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!(result.dimensions(), (1800, 1000));
    }
}
