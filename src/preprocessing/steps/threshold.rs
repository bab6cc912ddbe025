use crate::error::VerifyError;
use image::{DynamicImage, GrayImage, Luma};

/// Sauvola parameters tuned for printed card text
const WINDOW_SIZE: u32 = 25;
const K: f64 = 0.2;
/// Dynamic range of the standard deviation for 8-bit images
const R: f64 = 128.0;

/// Binarize with Sauvola's local threshold.
///
/// Card photos have glare and shadows, so a global level would wipe out
/// whole regions of text.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, VerifyError> {
    let gray = image.to_luma8();
    Ok(DynamicImage::ImageLuma8(sauvola(&gray, WINDOW_SIZE, K)))
}

/// Summed-area tables of values and squared values, `(w + 1) * (h + 1)` each
struct Integrals {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Integrals {
    fn new(img: &GrayImage) -> Self {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let stride = width + 1;
        let mut sum = vec![0.0; stride * (height + 1)];
        let mut sum_sq = vec![0.0; stride * (height + 1)];

        for y in 0..height {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..width {
                let v = img.get_pixel(x as u32, y as u32).0[0] as f64;
                row += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// Mean and standard deviation over the inclusive box [x1, x2] x [y1, y2]
    fn stats(&self, x1: usize, y1: usize, x2: usize, y2: usize) -> (f64, f64) {
        let at = |table: &[f64], x: usize, y: usize| table[y * self.stride + x];
        let area = ((x2 + 1 - x1) * (y2 + 1 - y1)) as f64;
        let boxed = |table: &[f64]| {
            at(table, x2 + 1, y2 + 1) - at(table, x1, y2 + 1) - at(table, x2 + 1, y1)
                + at(table, x1, y1)
        };

        let mean = boxed(&self.sum) / area;
        let variance = boxed(&self.sum_sq) / area - mean * mean;
        (mean, variance.max(0.0).sqrt())
    }
}

fn sauvola(img: &GrayImage, window: u32, k: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    let half = (window / 2) as usize;
    let integrals = Integrals::new(img);

    GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let x1 = x.saturating_sub(half);
        let y1 = y.saturating_sub(half);
        let x2 = (x + half).min(width as usize - 1);
        let y2 = (y + half).min(height as usize - 1);

        let (mean, std_dev) = integrals.stats(x1, y1, x2, y2);
        let threshold = mean * (1.0 + k * (std_dev / R - 1.0));

        if img.get_pixel(x as u32, y as u32).0[0] as f64 > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
