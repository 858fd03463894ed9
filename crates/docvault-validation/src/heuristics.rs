//! Non-fatal content heuristics. Everything here produces review flags, never
//! rejections.

use chrono::NaiveDate;
use docvault_core::models::ReviewFlag;
use docvault_core::VaultError;
use regex::bytes::{Regex, RegexBuilder};

const ARCHIVE_SIGNATURES: &[(&str, &[u8])] = &[
    ("zip", b"PK\x03\x04"),
    ("rar", b"Rar!\x1A\x07"),
    ("7z", b"7z\xBC\xAF\x27\x1C"),
];

/// Phrases expected somewhere in a background-check certificate
const CERTIFICATE_PHRASES: &str = r"disclosure\s+and\s+barring|\bDBS\b|criminal\s+record|background\s+check|police\s+(check|certificate|clearance)|certificate\s+(number|no\.?)|enhanced\s+disclosure|basic\s+disclosure";

const NUMERIC_DMY: &str = r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})\b";
const ISO_DATE: &str = r"\b(\d{4})-(\d{2})-(\d{2})\b";
const LONG_DATE: &str = r"\b(\d{1,2})(?:st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b";

/// First embedded archive format found in `data`.
pub fn detect_embedded_archive(data: &[u8]) -> Option<&'static str> {
    ARCHIVE_SIGNATURES
        .iter()
        .find(|(_, magic)| data.windows(magic.len()).any(|w| w == *magic))
        .map(|(format, _)| *format)
}

pub struct CertificateHeuristics {
    phrases: Regex,
    numeric_dmy: Regex,
    iso: Regex,
    long: Regex,
    max_age_days: i64,
}

impl CertificateHeuristics {
    pub fn new(max_age_days: i64) -> Result<Self, VaultError> {
        Ok(Self {
            phrases: case_insensitive(CERTIFICATE_PHRASES)?,
            numeric_dmy: case_insensitive(NUMERIC_DMY)?,
            iso: case_insensitive(ISO_DATE)?,
            long: case_insensitive(LONG_DATE)?,
            max_age_days,
        })
    }

    /// Flags for a background-check certificate, judged relative to `today`.
    pub fn inspect(&self, data: &[u8], today: NaiveDate) -> Vec<ReviewFlag> {
        let mut flags = Vec::new();

        if !self.phrases.is_match(data) {
            flags.push(ReviewFlag::LowConfidenceDocumentType);
        }

        if let Some(latest) = self.latest_date(data, today) {
            if (today - latest).num_days() > self.max_age_days {
                flags.push(ReviewFlag::StaleDocument {
                    latest_date: latest,
                });
            }
        }

        flags
    }

    /// Most recent date in `data` that is not in the future.
    pub fn latest_date(&self, data: &[u8], today: NaiveDate) -> Option<NaiveDate> {
        self.dates(data).into_iter().filter(|d| *d <= today).max()
    }

    fn dates(&self, data: &[u8]) -> Vec<NaiveDate> {
        let mut dates = Vec::new();

        for caps in self.numeric_dmy.captures_iter(data) {
            if let (Some(d), Some(m), Some(y)) =
                (number(&caps[1]), number(&caps[2]), number(&caps[3]))
            {
                dates.extend(NaiveDate::from_ymd_opt(y as i32, m, d));
            }
        }

        for caps in self.iso.captures_iter(data) {
            if let (Some(y), Some(m), Some(d)) =
                (number(&caps[1]), number(&caps[2]), number(&caps[3]))
            {
                dates.extend(NaiveDate::from_ymd_opt(y as i32, m, d));
            }
        }

        for caps in self.long.captures_iter(data) {
            if let (Some(d), Some(m), Some(y)) =
                (number(&caps[1]), month(&caps[2]), number(&caps[3]))
            {
                dates.extend(NaiveDate::from_ymd_opt(y as i32, m, d));
            }
        }

        dates
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, VaultError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| VaultError::Internal(format!("Invalid heuristic pattern: {}", e)))
}

fn number(raw: &[u8]) -> Option<u32> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

fn month(raw: &[u8]) -> Option<u32> {
    let name = std::str::from_utf8(raw).ok()?.to_ascii_lowercase();
    let index = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ]
    .iter()
    .position(|m| *m == name)?;
    Some(index as u32 + 1)
}
