//! Identity fields pulled out of OCR text, plus date and number helpers
//! shared with the QR path.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Aadhaar numbers print as three groups of four digits on one line
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9]{4}[ \t][0-9]{4}[ \t][0-9]{4}\b").expect("valid regex")
});

/// A fourth group on the same line means a 16-digit Virtual ID
static TRAILING_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t][0-9]{4}\b").expect("valid regex"));

static VID_LABEL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bVID\b").expect("valid regex"));

static DOB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:[0-9]{2}[/-][0-9]{2}[/-][0-9]{4}|[0-9]{2}[ \t][0-9]{2}[ \t][0-9]{4}|[0-9]{4}-[0-9]{2}-[0-9]{2})\b",
    )
    .expect("valid regex")
});

/// Two or three alphabetic words of at least two letters
static NAME_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z]{2,}[ \t]+[A-Za-z]{2,}(?:[ \t]+[A-Za-z]{2,})?)\b").expect("valid regex")
});

static DOB_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:DOB|D\.O\.B|Date\s+of\s+Birth|Year\s+of\s+Birth|YOB)\b")
        .expect("valid regex")
});

static DOB_OR_GENDER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)DOB|Male").expect("valid regex"));

/// Words that appear on every card and never in a holder's name
const BOILERPLATE: &[&str] = &[
    "government", "india", "unique", "identification", "authority", "aadhaar", "aadhar",
    "male", "female", "transgender", "dob", "birth", "year", "date", "address", "enrolment",
    "enrollment", "father", "mother", "husband", "issue", "download", "help", "uidai", "www",
    "gov", "vid", "mera", "pehchaan", "identity",
];

/// Minimum age for `is_18_or_older`
pub const ADULT_AGE: u32 = 18;

/// Fields found in a block of OCR text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFields {
    /// Twelve digits, separators removed
    pub number: Option<String>,
    /// Date of birth exactly as printed
    pub dob: Option<String>,
    pub name: Option<String>,
}

pub fn extract(text: &str) -> TextFields {
    TextFields {
        number: find_number(text),
        dob: DOB.find(text).map(|m| m.as_str().to_string()),
        name: find_name(text),
    }
}

fn find_number(text: &str) -> Option<String> {
    NUMBER
        .find_iter(text)
        .find(|m| !is_virtual_id(text, m.start(), m.end()))
        .map(|m| m.as_str().split_whitespace().collect::<String>())
        .filter(|digits| is_aadhaar_number(digits))
}

/// Candidate labelled `VID` on its line, or followed by a fourth group
fn is_virtual_id(text: &str, start: usize, end: usize) -> bool {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    VID_LABEL.is_match(&text[line_start..start]) || TRAILING_GROUP.is_match(&text[end..])
}

fn find_name(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();

    // Cards print the holder's name directly above the DOB line
    if let Some(dob_line) = lines.iter().position(|line| DOB_MARKER.is_match(line)) {
        if let Some(name) = lines[..dob_line].iter().rev().find_map(|line| name_in(line)) {
            return Some(name);
        }
    }

    // Otherwise the line after a DOB/gender marker, then anywhere
    if let Some(marker) = lines.iter().position(|line| DOB_OR_GENDER_MARKER.is_match(line)) {
        if let Some(name) = lines.get(marker + 1).and_then(|line| name_in(line)) {
            return Some(name);
        }
    }

    lines.iter().find_map(|line| name_in(line))
}

fn name_in(line: &str) -> Option<String> {
    NAME_RUN
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|candidate| !is_boilerplate(candidate))
}

fn is_boilerplate(candidate: &str) -> bool {
    candidate
        .split_whitespace()
        .any(|word| BOILERPLATE.contains(&word.to_ascii_lowercase().as_str()))
}

pub fn is_aadhaar_number(digits: &str) -> bool {
    digits.len() == 12 && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a printed date of birth.
///
/// `/` means day/month/year; `-` is day-first when the first component has
/// two digits and ISO year-first otherwise; spaces mean day month year.
pub fn parse_dob(dob: &str) -> Option<NaiveDate> {
    let dob = dob.trim();
    let format = if dob.contains('/') {
        "%d/%m/%Y"
    } else if dob.contains('-') {
        if dob.split('-').next().map(str::len) == Some(2) {
            "%d-%m-%Y"
        } else {
            "%Y-%m-%d"
        }
    } else {
        "%d %m %Y"
    };
    NaiveDate::parse_from_str(dob, format).ok()
}

/// Completed years between `dob` and `today`; `None` for future dates
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> Option<u32> {
    if dob > today {
        return None;
    }
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

pub fn is_adult(dob: NaiveDate, today: NaiveDate) -> bool {
    age_on(dob, today).is_some_and(|age| age >= ADULT_AGE)
}

/// Only the last four digits ever leave the service
pub fn mask(last_four: &str) -> String {
    format!("XXXX XXXX {}", last_four)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const CARD: &str = "Government of India\n\
        Rahul Kumar Sharma\n\
        DOB: 14/08/1995\n\
        Male\n\
        2345 6789 0123\n\
        Mera Aadhaar, Meri Pehchaan";

    #[test]
    fn test_extracts_card_fields() {
        let fields = extract(CARD);
        assert_eq!(fields.number.as_deref(), Some("234567890123"));
        assert_eq!(fields.dob.as_deref(), Some("14/08/1995"));
        assert_eq!(fields.name.as_deref(), Some("Rahul Kumar Sharma"));
    }

    #[test]
    fn test_virtual_id_is_not_an_aadhaar_number() {
        let fields = extract("VID : 9134 5678 9012 3456");
        assert_eq!(fields.number, None);

        let fields = extract("VID : 9134 5678 9012 3456\n4321 8765 2109");
        assert_eq!(fields.number.as_deref(), Some("432187652109"));
    }

    #[test]
    fn test_number_directly_under_dob_line() {
        let fields = extract("Asha Verma\nDOB: 02/06/2006\n4567 8901 2345");
        assert_eq!(fields.number.as_deref(), Some("456789012345"));
        assert_eq!(fields.dob.as_deref(), Some("02/06/2006"));
    }

    #[test]
    fn test_helpline_after_number_is_ignored() {
        let fields = extract("Rahul Kumar\nDOB: 14/08/1995\n2345 6789 0123\n1947");
        assert_eq!(fields.number.as_deref(), Some("234567890123"));
    }

    #[test]
    fn test_labelled_vid_is_skipped() {
        let fields = extract("VID: 9134 5678 9012\n2345 6789 0123");
        assert_eq!(fields.number.as_deref(), Some("234567890123"));
    }

    #[test]
    fn test_number_needs_single_separators() {
        assert_eq!(extract("2345  6789  0123").number, None);
        assert_eq!(extract("234567890123").number, None);
    }

    #[test]
    fn test_dob_formats() {
        assert_eq!(extract("DOB 01-02-2000").dob.as_deref(), Some("01-02-2000"));
        assert_eq!(extract("born 2000-02-01 x").dob.as_deref(), Some("2000-02-01"));
        assert_eq!(extract("DOB 01 02 2000").dob.as_deref(), Some("01 02 2000"));
        assert_eq!(extract("Year of Birth : 1990").dob, None);
    }

    #[test]
    fn test_name_after_marker_when_nothing_above() {
        let text = "DOB: 01/01/1990\nPriya Nair\n";
        assert_eq!(extract(text).name.as_deref(), Some("Priya Nair"));
    }

    #[test]
    fn test_name_skips_boilerplate_only_text() {
        assert_eq!(extract("Government of India\nMale").name, None);
    }

    #[test]
    fn test_parse_dob_separator_rules() {
        assert_eq!(parse_dob("14/08/1995"), Some(date(1995, 8, 14)));
        assert_eq!(parse_dob("14-08-1995"), Some(date(1995, 8, 14)));
        assert_eq!(parse_dob("1995-08-14"), Some(date(1995, 8, 14)));
        assert_eq!(parse_dob("14 08 1995"), Some(date(1995, 8, 14)));
        assert_eq!(parse_dob("31/02/1995"), None);
        assert_eq!(parse_dob("1995/08/14"), None);
    }

    #[test]
    fn test_age_counts_completed_years() {
        let dob = date(2006, 10, 18);
        assert_eq!(age_on(dob, date(2024, 10, 17)), Some(17));
        assert_eq!(age_on(dob, date(2024, 10, 18)), Some(18));
        assert_eq!(age_on(dob, date(2005, 1, 1)), None);
    }

    #[test]
    fn test_adult_boundary() {
        let dob = date(2006, 10, 18);
        assert!(!is_adult(dob, date(2024, 10, 17)));
        assert!(is_adult(dob, date(2024, 10, 18)));
    }

    #[test]
    fn test_leap_day_birthday() {
        let dob = date(2004, 2, 29);
        assert!(!is_adult(dob, date(2022, 2, 28)));
        assert!(is_adult(dob, date(2022, 3, 1)));
    }

    #[test]
    fn test_mask_keeps_last_four() {
        assert_eq!(mask("0123"), "XXXX XXXX 0123");
    }
}
