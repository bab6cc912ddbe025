//! QR code detection on page images

use crate::preprocessing::Pipeline;
use image::{DynamicImage, GrayImage};

/// Find the first decodable QR code on a page.
///
/// The preprocessed page is tried first; card photos where contrast
/// stretching blows out the code get a second attempt on plain grayscale.
pub fn scan(page: &DynamicImage, pipeline: &Pipeline) -> Option<String> {
    match pipeline.process(page.clone()) {
        Ok(result) => {
            if let Some(payload) = detect(&result.image.to_luma8()) {
                return Some(payload);
            }
        }
        Err(e) => tracing::warn!("Preprocessing for QR detection failed: {}", e),
    }

    tracing::debug!("No QR code after preprocessing, retrying on plain grayscale");
    detect(&page.to_luma8())
}

/// Run the detector over a grayscale image and decode the first valid grid
pub fn detect(gray: &GrayImage) -> Option<String> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            gray.get_pixel(x as u32, y as u32).0[0]
        });

    let grids = prepared.detect_grids();
    tracing::debug!("Found {} QR candidate(s)", grids.len());

    grids.iter().find_map(|grid| match grid.decode() {
        Ok((_meta, content)) => Some(content),
        Err(e) => {
            tracing::debug!("QR candidate failed to decode: {:?}", e);
            None
        }
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use image::{GrayImage, Luma};
    use qrcode::{Color, QrCode};

    /// Render `payload` as a QR code with a quiet zone, `scale` pixels per module
    pub fn render_qr(payload: &[u8], scale: u32) -> GrayImage {
        let code = QrCode::new(payload).expect("payload fits in a QR code");
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let quiet = 4;
        let size = (modules + 2 * quiet) * scale;

        GrayImage::from_fn(size, size, |x, y| {
            let mx = (x / scale) as i64 - quiet as i64;
            let my = (y / scale) as i64 - quiet as i64;
            let inside = mx >= 0 && my >= 0 && mx < modules as i64 && my < modules as i64;
            if inside && colors[(my as u32 * modules + mx as u32) as usize] == Color::Dark {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::testing::render_qr;
    use super::*;
    use crate::preprocessing::Preset;
    use image::{GrayImage, Luma};

    #[test]
    fn test_detects_rendered_code() {
        let img = render_qr(b"<PrintLetterBarcodeData uid=\"234567890123\"/>", 6);
        assert_eq!(
            detect(&img).as_deref(),
            Some("<PrintLetterBarcodeData uid=\"234567890123\"/>")
        );
    }

    #[test]
    fn test_scan_with_standard_preset() {
        let img = DynamicImage::ImageLuma8(render_qr(b"hello aadhaar", 5));
        let pipeline = Pipeline::new(Preset::Standard);
        assert_eq!(scan(&img, &pipeline).as_deref(), Some("hello aadhaar"));
    }

    #[test]
    fn test_blank_page_has_no_code() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 200, Luma([255])));
        assert_eq!(scan(&img, &Pipeline::new(Preset::Standard)), None);
    }
}
