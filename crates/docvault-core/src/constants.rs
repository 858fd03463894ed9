//! Shared constants and built-in defaults.

pub const MB: usize = 1024 * 1024;

pub const DEFAULT_MAX_SIZE_MB_BACKGROUND_CHECK: usize = 15;
pub const DEFAULT_MAX_SIZE_MB_IDENTITY: usize = 10;
pub const DEFAULT_MAX_SIZE_MB_ADDRESS_PROOF: usize = 10;

/// Access tokens live for 30 minutes unless configured otherwise.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 1800;

pub const DEFAULT_SCAN_PREFIX_BYTES: usize = 8 * 1024;
pub const DEFAULT_HEURISTIC_PREFIX_BYTES: usize = 64 * 1024;
pub const DEFAULT_CERTIFICATE_MAX_AGE_DAYS: i64 = 3 * 365;
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

/// Minimum accepted length of the path-hashing salt.
pub const MIN_PATH_SALT_BYTES: usize = 16;

/// Prefix marking a threat pattern as PDF-only in `DOCVAULT_THREAT_PATTERNS`.
pub const PDF_PATTERN_PREFIX: &str = "pdf:";

/// Separator between entries in `DOCVAULT_THREAT_PATTERNS`.
pub const THREAT_PATTERN_SEPARATOR: &str = ";;";

/// Built-in threat markers: (regex, pdf_only).
///
/// Patterns are matched case-insensitively against the scanned prefix.
pub const DEFAULT_THREAT_PATTERNS: &[(&str, bool)] = &[
    (r"<\s*script", false),
    (r"%3c\s*script", false),
    (r"&lt;\s*script", false),
    (r"\\u003c\s*script", false),
    (r"javascript\s*:", false),
    (r"\bon[a-z]+\s*=", false),
    (r"\beval\s*\(", false),
    (r"/JavaScript", true),
    (r"/JS\b", true),
    (r"/Launch", true),
    (r"/EmbeddedFile", true),
    (r"/URI\b", true),
];
