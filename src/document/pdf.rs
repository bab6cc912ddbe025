//! PDF page rendering and content extraction
//!
//! Pages are rendered with poppler's `pdftoppm`. Without poppler, the image
//! XObjects embedded in the file are decoded directly, which covers scanned
//! e-Aadhaar printouts (one full-page image per page).

use crate::error::VerifyError;
use image::DynamicImage;
use lopdf::{Document, Object, Stream};
use std::panic::{self, AssertUnwindSafe};
use std::process::{Command, Stdio};

/// Render every page to PNG with `pdftoppm` and decode them in page order
pub fn rasterize(bytes: &[u8], pdftoppm: &str, dpi: u32) -> Result<Vec<DynamicImage>, VerifyError> {
    let workdir = tempfile::Builder::new()
        .prefix("aadhaar-pdf-")
        .tempdir()
        .map_err(|e| VerifyError::Internal(format!("Failed to create temp dir: {}", e)))?;

    let input = workdir.path().join("document.pdf");
    std::fs::write(&input, bytes)
        .map_err(|e| VerifyError::Internal(format!("Failed to write temp PDF: {}", e)))?;

    let output = Command::new(pdftoppm)
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-png")
        .arg(&input)
        .arg(workdir.path().join("page"))
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| VerifyError::DocumentError(format!("Failed to run {}: {}", pdftoppm, e)))?;

    if !output.status.success() {
        return Err(VerifyError::DocumentError(format!(
            "{} exited with {}: {}",
            pdftoppm,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let mut rendered: Vec<(u32, std::path::PathBuf)> = std::fs::read_dir(workdir.path())
        .map_err(|e| VerifyError::Internal(format!("Failed to list rendered pages: {}", e)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let number = stem.strip_prefix("page-")?.parse().ok()?;
            Some((number, path))
        })
        .collect();
    rendered.sort_by_key(|(number, _)| *number);

    rendered
        .into_iter()
        .map(|(number, path)| {
            image::open(&path).map_err(|e| {
                VerifyError::DocumentError(format!("Failed to load rendered page {}: {}", number, e))
            })
        })
        .collect()
}

/// Extract the text layer, if the PDF has one
pub fn extract_text(bytes: &[u8]) -> Option<String> {
    // pdf-extract panics on some malformed font tables
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Some(text),
        Ok(Err(e)) => {
            tracing::debug!("No usable PDF text layer: {}", e);
            None
        }
        Err(_) => {
            tracing::warn!("PDF text extraction panicked; ignoring text layer");
            None
        }
    }
}

/// Decode the image XObjects placed on each page, in page order
pub fn embedded_images(bytes: &[u8]) -> Result<Vec<DynamicImage>, VerifyError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| VerifyError::DocumentError(format!("Failed to load PDF: {}", e)))?;

    let mut images = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let page_images = match doc.get_page_images(page_id) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!("No images on page {}: {}", page_number, e);
                continue;
            }
        };

        for page_image in page_images {
            let decoded = doc
                .get_object(page_image.id)
                .and_then(Object::as_stream)
                .map_err(|e| VerifyError::DocumentError(e.to_string()))
                .and_then(|stream| decode_image_stream(&doc, stream));
            match decoded {
                Ok(img) => images.push(img),
                Err(e) => tracing::warn!(
                    "Skipping image {:?} on page {}: {}",
                    page_image.id,
                    page_number,
                    e
                ),
            }
        }
    }

    Ok(images)
}

fn decode_image_stream(doc: &Document, stream: &Stream) -> Result<DynamicImage, VerifyError> {
    // JPEG and JPEG2000 streams are complete image files already
    let filters = filter_names(stream);
    if filters.iter().any(|f| f == "DCTDecode" || f == "JPXDecode") {
        return image::load_from_memory(&stream.content)
            .map_err(|e| VerifyError::DocumentError(format!("Failed to decode JPEG: {}", e)));
    }

    let dimension = |key: &[u8]| {
        stream
            .dict
            .get(key)
            .and_then(Object::as_i64)
            .ok()
            .filter(|v| *v > 0)
            .map(|v| v as u32)
    };
    let width = dimension(b"Width")
        .ok_or_else(|| VerifyError::DocumentError("Missing image width".to_string()))?;
    let height = dimension(b"Height")
        .ok_or_else(|| VerifyError::DocumentError("Missing image height".to_string()))?;

    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    if bits != 8 {
        return Err(VerifyError::DocumentError(format!(
            "Unsupported bits per component: {}",
            bits
        )));
    }

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().map_err(|e| {
            VerifyError::DocumentError(format!("Failed to decompress image: {}", e))
        })?
    };

    let pixels = width as usize * height as usize;
    let color_space = color_space_name(doc, stream);

    let image = match color_space.as_str() {
        "DeviceGray" => image::GrayImage::from_raw(width, height, truncate(data, pixels))
            .map(DynamicImage::ImageLuma8),
        "DeviceRGB" | "ICCBased" => {
            image::RgbImage::from_raw(width, height, truncate(data, pixels * 3))
                .map(DynamicImage::ImageRgb8)
        }
        "DeviceCMYK" => {
            let rgb = cmyk_to_rgb(&truncate(data, pixels * 4));
            image::RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        other => {
            return Err(VerifyError::DocumentError(format!(
                "Unsupported color space: {}",
                other
            )))
        }
    };

    image.ok_or_else(|| {
        VerifyError::DocumentError(format!(
            "Image data too short for {}x{} {}",
            width, height, color_space
        ))
    })
}

/// Drop row padding past the expected length; `from_raw` rejects short buffers
fn truncate(mut data: Vec<u8>, len: usize) -> Vec<u8> {
    data.truncate(len);
    data
}

fn cmyk_to_rgb(data: &[u8]) -> Vec<u8> {
    data.chunks_exact(4)
        .flat_map(|px| {
            let k = 1.0 - px[3] as f32 / 255.0;
            [px[0], px[1], px[2]].map(|c| ((1.0 - c as f32 / 255.0) * k * 255.0) as u8)
        })
        .collect()
}

fn filter_names(stream: &Stream) -> Vec<String> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).to_string()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Resolve the color space family, following references and `[/ICCBased ..]` arrays
fn color_space_name(doc: &Document, stream: &Stream) -> String {
    let Ok(mut obj) = stream.dict.get(b"ColorSpace") else {
        return "DeviceRGB".to_string();
    };

    if let Ok(reference) = obj.as_reference() {
        match doc.get_object(reference) {
            Ok(resolved) => obj = resolved,
            Err(_) => return "DeviceRGB".to_string(),
        }
    }

    let name = match obj {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(items) => items.first().and_then(|first| first.as_name().ok()),
        _ => None,
    };

    name.map(|n| String::from_utf8_lossy(n).to_string())
        .unwrap_or_else(|| "DeviceRGB".to_string())
}
