use crate::error::VerifyError;
use image::DynamicImage;
use imageproc::filter::filter3x3;

/// Classic 3x3 sharpen: center 32, neighbours -2, normalised by 16
const KERNEL: [f32; 9] = [
    -0.125, -0.125, -0.125, //
    -0.125, 2.0, -0.125, //
    -0.125, -0.125, -0.125,
];

/// Sharpen glyph edges so thin strokes survive binarization
pub fn apply(image: DynamicImage) -> Result<DynamicImage, VerifyError> {
    let gray = image.to_luma8();
    let sharpened = filter3x3(&gray, &KERNEL);
    Ok(DynamicImage::ImageLuma8(sharpened))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_sharpen_steepens_step_edge() {
        let img = GrayImage::from_fn(20, 10, |x, _| if x < 10 { Luma([60]) } else { Luma([180]) });

        let out = apply(DynamicImage::ImageLuma8(img)).unwrap().to_luma8();

        let dark_side = out.get_pixel(9, 5).0[0] as i32;
        let light_side = out.get_pixel(10, 5).0[0] as i32;
        assert!(dark_side < 60, "dark side should darken, got {}", dark_side);
        assert!(light_side > 180, "light side should brighten, got {}", light_side);
    }

    #[test]
    fn test_sharpen_keeps_flat_regions() {
        let img = GrayImage::from_pixel(8, 8, Luma([128]));
        let out = apply(DynamicImage::ImageLuma8(img)).unwrap().to_luma8();
        assert_eq!(out.get_pixel(4, 4).0[0], 128);
    }
}
