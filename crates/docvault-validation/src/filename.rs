//! Display-filename sanitizer. Sanitized names are metadata only; they never
//! contribute to storage keys.

const MAX_FILENAME_LENGTH: usize = 128;
const FALLBACK_FILENAME: &str = "document";

/// Reduce an arbitrary client filename to `[A-Za-z0-9._-]`, bounded in length,
/// with no leading or trailing dots.
pub fn sanitize_filename(filename: &str) -> String {
    // Drop any directory components, whichever separator the client used
    let filename_only = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let mapped: String = filename_only
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LENGTH)
        .collect();

    let trimmed = mapped.trim_matches('.');

    if trimmed.trim_matches('_').is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    trimmed.to_string()
}
