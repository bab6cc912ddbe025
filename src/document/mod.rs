//! Uploaded document loading
//!
//! Turns the raw bytes of an accepted upload into page images (for QR
//! scanning and OCR) and, for PDFs, any text layer the file already carries.

pub mod pdf;

use crate::config::Config;
use crate::error::VerifyError;
use image::DynamicImage;

/// Minimum trimmed length before a PDF text layer is trusted over OCR
const MIN_EMBEDDED_TEXT_LEN: usize = 10;

/// Upload formats accepted by the verification endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
}

impl DocumentKind {
    /// Map a multipart content type onto an accepted kind
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Pdf, Self::Jpeg, Self::Png]
    }
}

/// A decoded upload
#[derive(Debug, Clone)]
pub struct Document {
    /// Page images in reading order
    pub pages: Vec<DynamicImage>,
    /// Text layer of a born-digital PDF, when it is substantial
    pub embedded_text: Option<String>,
}

/// Decodes uploads into [`Document`]s
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    pdftoppm_path: String,
    dpi: u32,
}

impl DocumentLoader {
    pub fn new(config: &Config) -> Self {
        Self {
            pdftoppm_path: config.pdftoppm_path.clone(),
            dpi: config.pdf_dpi,
        }
    }

    pub fn load(&self, bytes: &[u8], kind: DocumentKind) -> Result<Document, VerifyError> {
        match kind {
            DocumentKind::Pdf => self.load_pdf(bytes),
            DocumentKind::Jpeg | DocumentKind::Png => {
                // Trust the bytes over the declared type; phones mislabel often
                let image = image::load_from_memory(bytes).map_err(|e| {
                    VerifyError::DocumentError(format!("Failed to decode image: {}", e))
                })?;
                Ok(Document {
                    pages: vec![image],
                    embedded_text: None,
                })
            }
        }
    }

    fn load_pdf(&self, bytes: &[u8]) -> Result<Document, VerifyError> {
        if !bytes.starts_with(b"%PDF-") {
            return Err(VerifyError::DocumentError(
                "File is not a PDF document".to_string(),
            ));
        }

        let pages = match pdf::rasterize(bytes, &self.pdftoppm_path, self.dpi) {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => {
                tracing::warn!("pdftoppm produced no pages, falling back to embedded images");
                pdf::embedded_images(bytes)?
            }
            Err(e) => {
                tracing::warn!("PDF rasterization failed ({}), falling back to embedded images", e);
                pdf::embedded_images(bytes)?
            }
        };

        let embedded_text = pdf::extract_text(bytes)
            .map(|text| text.trim().to_string())
            .filter(|text| text.len() > MIN_EMBEDDED_TEXT_LEN);

        if pages.is_empty() && embedded_text.is_none() {
            return Err(VerifyError::DocumentError(
                "No text or images found in PDF".to_string(),
            ));
        }

        tracing::debug!(
            "Loaded PDF: {} page image(s), text layer: {}",
            pages.len(),
            embedded_text.is_some()
        );

        Ok(Document {
            pages,
            embedded_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::pdf::testing::{image_pdf, text_pdf};
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn loader() -> DocumentLoader {
        DocumentLoader::new(&Config::for_tests())
    }

    /// Loader that always takes the lopdf fallback
    fn loader_without_poppler() -> DocumentLoader {
        let mut config = Config::for_tests();
        config.pdftoppm_path = "/nonexistent/pdftoppm".to_string();
        DocumentLoader::new(&config)
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(
            DocumentKind::from_content_type("application/pdf"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_content_type("image/JPEG"),
            Some(DocumentKind::Jpeg)
        );
        assert_eq!(
            DocumentKind::from_content_type("image/png; charset=binary"),
            Some(DocumentKind::Png)
        );
        assert_eq!(DocumentKind::from_content_type("image/gif"), None);
        assert_eq!(DocumentKind::from_content_type("text/plain"), None);
    }

    #[test]
    fn test_loads_png_as_single_page() {
        let img = RgbImage::from_pixel(12, 8, Rgb([200, 10, 10]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let doc = loader().load(&bytes, DocumentKind::Png).unwrap();

        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].width(), 12);
        assert!(doc.embedded_text.is_none());
    }

    #[test]
    fn test_corrupt_image_is_a_document_error() {
        let result = loader().load(b"not an image at all", DocumentKind::Jpeg);
        assert!(matches!(result, Err(VerifyError::DocumentError(_))));
    }

    #[test]
    fn test_pdf_text_layer_is_kept() {
        let bytes = text_pdf(&["Rahul Kumar", "DOB: 14/08/1995"]);

        let doc = loader_without_poppler().load(&bytes, DocumentKind::Pdf).unwrap();

        let text = doc.embedded_text.unwrap();
        assert!(text.contains("Rahul Kumar"));
        assert!(text.contains("14/08/1995"));
    }

    #[test]
    fn test_short_text_layer_is_not_trusted() {
        // Exactly the minimum length is still too short
        let bytes = text_pdf(&["0123456789"]);
        let result = loader_without_poppler().load(&bytes, DocumentKind::Pdf);
        assert!(matches!(result, Err(VerifyError::DocumentError(_))));

        let bytes = text_pdf(&["01234567890"]);
        let doc = loader_without_poppler().load(&bytes, DocumentKind::Pdf).unwrap();
        assert_eq!(doc.embedded_text.as_deref(), Some("01234567890"));
    }

    #[test]
    fn test_scanned_pdf_falls_back_to_embedded_images() {
        let pages = [
            GrayImage::from_pixel(30, 20, Luma([255])),
            GrayImage::from_pixel(40, 10, Luma([0])),
        ];

        let doc = loader_without_poppler()
            .load(&image_pdf(&pages), DocumentKind::Pdf)
            .unwrap();

        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].width(), 30);
        assert_eq!(doc.pages[1].width(), 40);
        assert!(doc.embedded_text.is_none());
    }

    #[test]
    fn test_non_pdf_bytes_rejected() {
        let result = loader().load(b"\x89PNG....", DocumentKind::Pdf);
        assert!(matches!(result, Err(VerifyError::DocumentError(_))));
    }
}
