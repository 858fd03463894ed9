//! File signature (magic number) verification.

/// Known signatures keyed by normalized MIME type.
const SIGNATURES: &[(&str, &[u8])] = &[
    ("application/pdf", b"%PDF"),
    ("image/jpeg", &[0xFF, 0xD8, 0xFF]),
    ("image/jpg", &[0xFF, 0xD8, 0xFF]),
    ("image/png", &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
];

/// Result of comparing leading bytes with the declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Match,
    Mismatch,
    /// Declared type has no entry in the table
    Unknown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureTable;

impl SignatureTable {
    pub fn check(&self, data: &[u8], mime_type: &str) -> SignatureCheck {
        match self.expected(mime_type) {
            Some(magic) if data.starts_with(magic) => SignatureCheck::Match,
            Some(_) => SignatureCheck::Mismatch,
            None => SignatureCheck::Unknown,
        }
    }

    pub fn expected(&self, mime_type: &str) -> Option<&'static [u8]> {
        SIGNATURES
            .iter()
            .find(|(mime, _)| *mime == mime_type)
            .map(|(_, magic)| *magic)
    }

    pub fn is_pdf(mime_type: &str) -> bool {
        mime_type == "application/pdf"
    }
}

/// Lowercase a declared MIME type and drop any parameters.
pub fn normalize_mime_type(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase()
}
