//! DocVault Validation Library
//!
//! Decides whether uploaded bytes are acceptable for their declared type:
//! size limits, file signatures, dangerous-content markers and document-type
//! heuristics. Also provides the display-filename sanitizer.

pub mod filename;
pub mod heuristics;
pub mod signature;
pub mod threat;
pub mod validator;

pub use filename::sanitize_filename;
pub use signature::{normalize_mime_type, SignatureCheck, SignatureTable};
pub use threat::{ThreatMatch, ThreatScanner};
pub use validator::{FileValidator, ValidationContext};
