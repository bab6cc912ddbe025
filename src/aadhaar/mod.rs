//! Aadhaar card verification
//!
//! A card is read from its QR code when possible. When the QR code is
//! missing, unreadable or incomplete, the page text (PDF text layer or OCR)
//! is searched for the number, date of birth and name instead.

pub mod fields;
pub mod payload;
pub mod qr;

use crate::document::{Document, DocumentKind, DocumentLoader};
use crate::engine::OcrEngine;
use crate::error::VerifyError;
use crate::preprocessing::Pipeline;
use chrono::NaiveDate;
use payload::{AadhaarNumber, QrIdentity};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub const EXTRACTION_FAILED: &str = "Could not extract valid Aadhaar details";

/// Where the reported details came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Qr,
    Ocr,
    PdfText,
}

/// Verification response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// Masked as `XXXX XXXX 1234`
    pub aadhaar_number: Option<String>,
    pub dob: Option<String>,
    pub name: Option<String>,
    pub is_18_or_older: bool,
    pub valid: bool,
    pub error: Option<String>,
    pub source: Option<Source>,
    pub engine: Option<String>,
    pub processing_time_ms: u64,
}

impl Verification {
    /// Result for an upload that could not be analysed at all
    pub fn failed(error: impl Into<String>) -> Self {
        Findings::default().into_verification(Some(error.into()))
    }
}

/// Per-request verification settings
pub struct VerifyOptions {
    pub engine: Arc<dyn OcrEngine>,
    pub pipeline: Pipeline,
    pub today: NaiveDate,
}

/// Details gathered so far; the number stays unmasked only in here
#[derive(Debug, Default)]
struct Findings {
    number: Option<AadhaarNumber>,
    dob: Option<String>,
    name: Option<String>,
    is_adult: bool,
    source: Option<Source>,
    engine: Option<String>,
}

impl Findings {
    fn valid(&self) -> bool {
        self.number.is_some()
    }

    /// Record a printed date of birth; an unparseable one clears any earlier value
    fn apply_dob(&mut self, dob: &str, today: NaiveDate) {
        match fields::parse_dob(dob) {
            Some(date) => {
                self.dob = Some(dob.to_string());
                self.is_adult = fields::is_adult(date, today);
            }
            None => {
                tracing::debug!("Ignoring unparseable date of birth");
                self.dob = None;
                self.is_adult = false;
            }
        }
    }

    fn apply_qr(&mut self, identity: QrIdentity, today: NaiveDate) {
        if identity.number.is_some() {
            self.number = identity.number;
        }
        if let Some(dob) = identity.dob {
            self.apply_dob(&dob, today);
        }
        self.name = identity.name;
    }

    fn complete(&self) -> bool {
        self.valid() && self.dob.is_some() && self.name.is_some()
    }

    fn into_verification(self, error: Option<String>) -> Verification {
        let valid = error.is_none() && self.valid();
        let error = error.or_else(|| (!valid).then(|| EXTRACTION_FAILED.to_string()));

        Verification {
            aadhaar_number: self
                .number
                .as_ref()
                .map(|number| fields::mask(number.last_four())),
            dob: self.dob,
            name: self.name,
            is_18_or_older: self.is_adult,
            valid,
            error,
            source: self.source,
            engine: self.engine,
            processing_time_ms: 0,
        }
    }
}

/// Runs the QR-then-text verification over uploaded documents
#[derive(Debug, Clone)]
pub struct Verifier {
    loader: DocumentLoader,
}

impl Verifier {
    pub fn new(loader: DocumentLoader) -> Self {
        Self { loader }
    }

    /// Verify an upload. Failures are reported inside the result, never raised.
    pub fn verify(&self, bytes: &[u8], kind: DocumentKind, options: &VerifyOptions) -> Verification {
        let start = Instant::now();
        let mut findings = Findings::default();

        let outcome = self
            .loader
            .load(bytes, kind)
            .and_then(|document| self.analyse(&document, options, &mut findings));

        let mut verification = match outcome {
            Ok(()) => findings.into_verification(None),
            Err(e) => {
                tracing::warn!("Verification failed: {}", e);
                findings.into_verification(Some(e.to_string()))
            }
        };
        verification.processing_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            source = ?verification.source,
            engine = verification.engine.as_deref().unwrap_or("-"),
            valid = verification.valid,
            "Verification finished in {}ms",
            verification.processing_time_ms
        );

        verification
    }

    fn analyse(
        &self,
        document: &Document,
        options: &VerifyOptions,
        findings: &mut Findings,
    ) -> Result<(), VerifyError> {
        if let Some(identity) = read_qr(document, &options.pipeline) {
            findings.apply_qr(identity, options.today);
            if findings.complete() {
                findings.source = Some(Source::Qr);
                return Ok(());
            }
            tracing::debug!("QR data incomplete, falling back to text extraction");
        }

        let text = match &document.embedded_text {
            Some(text) => {
                findings.source = Some(Source::PdfText);
                text.clone()
            }
            None => {
                findings.source = Some(Source::Ocr);
                findings.engine = Some(options.engine.name().to_string());
                recognize_pages(document, options)?
            }
        };

        let found = fields::extract(&text);
        tracing::debug!(
            number = found.number.is_some(),
            dob = found.dob.is_some(),
            name = found.name.is_some(),
            "Extracted text fields"
        );

        if let Some(number) = found.number {
            findings.number = Some(AadhaarNumber::Full(number));
        }
        if let Some(dob) = found.dob {
            findings.apply_dob(&dob, options.today);
        }
        if found.name.is_some() {
            findings.name = found.name;
        }

        Ok(())
    }
}

/// Decode the first Aadhaar QR payload found on any page
fn read_qr(document: &Document, pipeline: &Pipeline) -> Option<QrIdentity> {
    for (index, page) in document.pages.iter().enumerate() {
        let Some(raw) = qr::scan(page, pipeline) else {
            continue;
        };
        tracing::debug!("QR code found on page {}", index + 1);

        // Only the first code found is considered, as on the card itself
        return match payload::decode(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!("QR decoding error: {}", e);
                None
            }
        };
    }
    tracing::debug!("No QR code detected in document");
    None
}

fn recognize_pages(document: &Document, options: &VerifyOptions) -> Result<String, VerifyError> {
    let mut texts = Vec::with_capacity(document.pages.len());

    for (index, page) in document.pages.iter().enumerate() {
        let prepared = options.pipeline.process(page.clone())?;
        let result = options.engine.recognize(&prepared.image)?;
        tracing::debug!(
            "Page {} of {}: {} chars recognised",
            index + 1,
            document.pages.len(),
            result.text.len()
        );
        texts.push(result.text);
    }

    Ok(texts.join("\n"))
}
