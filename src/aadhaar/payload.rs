//! Aadhaar QR payload decoding
//!
//! Two payload families are in circulation:
//!
//! * Secure QR (cards printed since 2019): a base-10 big integer whose
//!   big-endian bytes are a gzip stream. The decompressed record is a run of
//!   ISO-8859-1 text fields separated by `0xFF`, followed by the photo and
//!   the UIDAI signature.
//! * Legacy QR: a `<PrintLetterBarcodeData .../>` XML element with the
//!   holder's details as attributes.

use super::fields::is_aadhaar_number;
use crate::error::VerifyError;
use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;

const FIELD_DELIMITER: u8 = 0xFF;

/// Upper bound on the decompressed record; real cards stay well below it
const MAX_RECORD_LEN: u64 = 1 << 20;

static XML_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Text fields of a secure QR record, in payload order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureQrData {
    /// Present on V2+ payloads only
    pub version: Option<String>,
    /// 0 none, 1 email, 2 mobile, 3 both
    pub email_mobile_status: u8,
    /// Last four Aadhaar digits followed by the generation timestamp
    pub reference_id: String,
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub care_of: String,
    pub district: String,
    pub landmark: String,
    pub house: String,
    pub location: String,
    pub pincode: String,
    pub post_office: String,
    pub state: String,
    pub street: String,
    pub sub_district: String,
    pub vtc: String,
}

/// Number of text fields after the optional version
const SECURE_FIELDS: usize = 16;

impl SecureQrData {
    pub fn aadhaar_last_four(&self) -> Option<&str> {
        self.reference_id
            .get(..4)
            .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
    }
}

/// The Aadhaar number as far as a payload reveals it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AadhaarNumber {
    Full(String),
    /// Secure QR payloads only carry the tail of the number
    LastFour(String),
}

impl AadhaarNumber {
    pub fn last_four(&self) -> &str {
        match self {
            Self::Full(digits) => &digits[digits.len() - 4..],
            Self::LastFour(digits) => digits,
        }
    }
}

/// Identity details decoded from any supported QR payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrIdentity {
    pub number: Option<AadhaarNumber>,
    pub name: Option<String>,
    pub dob: Option<String>,
}

/// Decode whichever payload family `payload` belongs to
pub fn decode(payload: &str) -> Result<QrIdentity, VerifyError> {
    let payload = payload.trim();

    if payload.contains("PrintLetterBarcodeData") {
        return decode_legacy(payload);
    }

    if !payload.is_empty() && payload.bytes().all(|b| b.is_ascii_digit()) {
        let data = decode_secure(payload)?;
        return Ok(QrIdentity {
            number: data
                .aadhaar_last_four()
                .map(|digits| AadhaarNumber::LastFour(digits.to_string())),
            name: non_empty(data.name),
            dob: non_empty(data.dob),
        });
    }

    Err(VerifyError::QrDecodeError(
        "QR code is not an Aadhaar payload".to_string(),
    ))
}

pub fn decode_secure(payload: &str) -> Result<SecureQrData, VerifyError> {
    let compressed = decimal_to_bytes(payload)?;

    let mut record = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .take(MAX_RECORD_LEN)
        .read_to_end(&mut record)
        .map_err(|e| VerifyError::QrDecodeError(format!("Failed to decompress payload: {}", e)))?;

    let versioned = record.len() >= 2 && record[0] == b'V' && record[1].is_ascii_digit();
    let wanted = SECURE_FIELDS + usize::from(versioned);

    // The photo after the text fields is binary and full of 0xFF bytes
    let fields: Vec<String> = record
        .splitn(wanted + 1, |b| *b == FIELD_DELIMITER)
        .take(wanted)
        .map(latin1)
        .collect();
    if fields.len() < wanted {
        return Err(VerifyError::QrDecodeError(format!(
            "Secure QR record has {} fields, expected {}",
            fields.len(),
            wanted
        )));
    }

    let mut fields = fields.into_iter();
    let mut next = || fields.next().unwrap_or_default();

    let version = versioned.then(&mut next);
    let email_mobile_status = next().trim().parse().unwrap_or(0);

    Ok(SecureQrData {
        version,
        email_mobile_status,
        reference_id: next(),
        name: next(),
        dob: next(),
        gender: next(),
        care_of: next(),
        district: next(),
        landmark: next(),
        house: next(),
        location: next(),
        pincode: next(),
        post_office: next(),
        state: next(),
        street: next(),
        sub_district: next(),
        vtc: next(),
    })
}

fn decode_legacy(payload: &str) -> Result<QrIdentity, VerifyError> {
    let mut uid = None;
    let mut name = None;
    let mut dob = None;

    for caps in XML_ATTRIBUTE.captures_iter(payload) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| unescape_xml(m.as_str()))
            .unwrap_or_default();
        match &caps[1] {
            "uid" => uid = Some(value),
            "name" => name = non_empty(value),
            "dob" => dob = non_empty(value),
            _ => {}
        }
    }

    let uid = uid.ok_or_else(|| {
        VerifyError::QrDecodeError("Legacy QR payload has no uid attribute".to_string())
    })?;

    Ok(QrIdentity {
        number: Some(uid)
            .filter(|digits| is_aadhaar_number(digits))
            .map(AadhaarNumber::Full),
        name,
        dob,
    })
}

/// Convert a base-10 digit string to big-endian bytes without leading zeros
fn decimal_to_bytes(digits: &str) -> Result<Vec<u8>, VerifyError> {
    // Little-endian base-256 limbs, multiplied by ten per digit
    let mut limbs: Vec<u8> = Vec::with_capacity(digits.len() / 2 + 1);

    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            return Err(VerifyError::QrDecodeError(
                "Secure QR payload must be decimal".to_string(),
            ));
        }
        let mut carry = u32::from(byte - b'0');
        for limb in limbs.iter_mut() {
            let value = u32::from(*limb) * 10 + carry;
            *limb = (value & 0xFF) as u8;
            carry = value >> 8;
        }
        while carry > 0 {
            limbs.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    limbs.reverse();
    Ok(limbs)
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
pub(crate) mod testing {
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    /// Big-endian bytes to their base-10 representation
    pub fn bytes_to_decimal(bytes: &[u8]) -> String {
        let mut number: Vec<u8> = bytes.to_vec();
        let mut digits = Vec::new();

        while number.iter().any(|&b| b != 0) {
            let mut remainder = 0u32;
            for byte in number.iter_mut() {
                let value = (remainder << 8) | u32::from(*byte);
                *byte = (value / 10) as u8;
                remainder = value % 10;
            }
            digits.push(b'0' + remainder as u8);
        }

        if digits.is_empty() {
            return "0".to_string();
        }
        digits.reverse();
        String::from_utf8(digits).expect("ascii digits")
    }

    /// Build a secure QR payload string from its text fields and a fake photo
    pub fn secure_payload(fields: &[&str], photo: &[u8]) -> String {
        let mut record = Vec::new();
        for field in fields {
            record.extend(field.bytes());
            record.push(0xFF);
        }
        record.extend_from_slice(photo);

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&record).expect("in-memory write");
        bytes_to_decimal(&encoder.finish().expect("in-memory gzip"))
    }

    pub const V2_FIELDS: [&str; 17] = [
        "V2",
        "3",
        "012320190315143025123",
        "Asha Devi",
        "12-03-1990",
        "F",
        "W/O Ravi Kumar",
        "Patna",
        "Near Temple",
        "12",
        "Gandhi Nagar",
        "800001",
        "Patna GPO",
        "Bihar",
        "MG Road",
        "Patna Sadar",
        "Patna",
    ];
}

#[cfg(test)]
mod tests {
    use super::testing::{bytes_to_decimal, secure_payload, V2_FIELDS};
    use super::*;

    #[test]
    fn test_decimal_conversion_matches_known_values() {
        assert_eq!(decimal_to_bytes("0").unwrap(), Vec::<u8>::new());
        assert_eq!(decimal_to_bytes("255").unwrap(), vec![0xFF]);
        assert_eq!(decimal_to_bytes("256").unwrap(), vec![0x01, 0x00]);
        assert_eq!(decimal_to_bytes("0065535").unwrap(), vec![0xFF, 0xFF]);
        assert_eq!(bytes_to_decimal(&[0x01, 0x00]), "256");
        assert!(decimal_to_bytes("12a4").is_err());
    }

    #[test]
    fn test_decodes_v2_secure_payload() {
        let payload = secure_payload(&V2_FIELDS, &[0xFF, 0xD8, 0xFF, 0x00, 0xFF]);

        let data = decode_secure(&payload).unwrap();

        assert_eq!(data.version.as_deref(), Some("V2"));
        assert_eq!(data.email_mobile_status, 3);
        assert_eq!(data.name, "Asha Devi");
        assert_eq!(data.dob, "12-03-1990");
        assert_eq!(data.pincode, "800001");
        assert_eq!(data.vtc, "Patna");
        assert_eq!(data.aadhaar_last_four(), Some("0123"));
    }

    #[test]
    fn test_decodes_unversioned_secure_payload() {
        let payload = secure_payload(&V2_FIELDS[1..], b"photo");

        let data = decode_secure(&payload).unwrap();

        assert_eq!(data.version, None);
        assert_eq!(data.reference_id, "012320190315143025123");
        assert_eq!(data.state, "Bihar");
    }

    #[test]
    fn test_fields_are_iso_8859_1() {
        use flate2::{write::GzEncoder, Compression};
        use std::io::Write;

        let mut record = Vec::new();
        for (i, field) in V2_FIELDS.iter().enumerate() {
            if i == 3 {
                record.extend_from_slice(&[b'J', b'o', b's', 0xE9]);
            } else {
                record.extend(field.bytes());
            }
            record.push(0xFF);
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&record).unwrap();
        let payload = bytes_to_decimal(&encoder.finish().unwrap());

        assert_eq!(decode_secure(&payload).unwrap().name, "Jos\u{e9}");
    }

    #[test]
    fn test_truncated_record_is_rejected() {
        let payload = secure_payload(&V2_FIELDS[..5], b"");
        assert!(matches!(
            decode_secure(&payload),
            Err(VerifyError::QrDecodeError(_))
        ));
    }

    #[test]
    fn test_non_gzip_number_is_rejected() {
        assert!(decode_secure("123456789").is_err());
    }

    #[test]
    fn test_secure_identity_exposes_last_four_only() {
        let identity = decode(&secure_payload(&V2_FIELDS, b"")).unwrap();
        assert_eq!(
            identity.number,
            Some(AadhaarNumber::LastFour("0123".to_string()))
        );
        assert_eq!(identity.name.as_deref(), Some("Asha Devi"));
        assert_eq!(identity.dob.as_deref(), Some("12-03-1990"));
    }

    #[test]
    fn test_decodes_legacy_xml() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <PrintLetterBarcodeData uid="234567890123" name="Rahul Kumar" gender="M"
             yob="1995" co="S/O Mohan Kumar" dob="14/08/1995"/>"#;

        let identity = decode(xml).unwrap();

        assert_eq!(
            identity.number,
            Some(AadhaarNumber::Full("234567890123".to_string()))
        );
        assert_eq!(identity.name.as_deref(), Some("Rahul Kumar"));
        assert_eq!(identity.dob.as_deref(), Some("14/08/1995"));
    }

    #[test]
    fn test_legacy_single_quotes_and_bad_uid() {
        let xml = "<PrintLetterBarcodeData uid='1234' name='A &amp; B' yob='1980'/>";

        let identity = decode(xml).unwrap();

        assert_eq!(identity.number, None);
        assert_eq!(identity.name.as_deref(), Some("A & B"));
        assert_eq!(identity.dob, None);
    }

    #[test]
    fn test_foreign_payload_is_rejected() {
        assert!(decode("https://example.com/promo").is_err());
        assert!(decode("").is_err());
    }

    #[test]
    fn test_last_four_of_full_number() {
        assert_eq!(
            AadhaarNumber::Full("234567890123".to_string()).last_four(),
            "0123"
        );
    }
}
