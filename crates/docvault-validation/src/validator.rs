//! File validator: the gate every upload passes before any network I/O.

use std::sync::Arc;

use bytes::Bytes;
use docvault_core::constants::MB;
use docvault_core::models::{DocumentType, ReviewFlag, ValidationResult};
use docvault_core::{Clock, DocVaultConfig, SizeLimits, UnknownMimePolicy, VaultError};
use uuid::Uuid;

use crate::heuristics::{detect_embedded_archive, CertificateHeuristics};
use crate::signature::{normalize_mime_type, SignatureCheck, SignatureTable};
use crate::threat::ThreatScanner;

/// Per-call context used for log correlation only
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    pub request_id: Option<Uuid>,
}

impl ValidationContext {
    pub fn for_request(request_id: Uuid) -> Self {
        Self {
            request_id: Some(request_id),
        }
    }
}

pub struct FileValidator {
    size_limits: SizeLimits,
    signatures: SignatureTable,
    scanner: ThreatScanner,
    certificates: CertificateHeuristics,
    unknown_mime_policy: UnknownMimePolicy,
    heuristic_prefix_bytes: usize,
    clock: Arc<dyn Clock>,
}

impl FileValidator {
    pub fn from_config(config: &DocVaultConfig, clock: Arc<dyn Clock>) -> Result<Self, VaultError> {
        Ok(Self {
            size_limits: config.size_limits.clone(),
            signatures: SignatureTable,
            scanner: ThreatScanner::new(&config.threat_patterns, config.scan_prefix_bytes)?,
            certificates: CertificateHeuristics::new(config.certificate_max_age_days)?,
            unknown_mime_policy: config.unknown_mime_policy,
            heuristic_prefix_bytes: config.heuristic_prefix_bytes,
            clock,
        })
    }

    /// Validate `data` for its declared type.
    ///
    /// Ordinary problems come back as `errors` in the result. A threat-marker
    /// match is returned as `Err(VaultError::Security)` and ends validation.
    pub fn validate(
        &self,
        data: &Bytes,
        declared_mime_type: &str,
        document_type: DocumentType,
        context: &ValidationContext,
    ) -> Result<ValidationResult, VaultError> {
        let mime_type = normalize_mime_type(declared_mime_type);
        let mut result = ValidationResult {
            normalized_mime_type: mime_type.clone(),
            ..Default::default()
        };

        if data.is_empty() {
            result.errors.push("File is empty".to_string());
            return Ok(result);
        }

        let max_size = self.size_limits.max_for(document_type);
        if data.len() > max_size {
            tracing::debug!(
                request_id = ?context.request_id,
                size = data.len(),
                max_size,
                document_type = %document_type,
                "File exceeds size limit"
            );
            result.errors.push(format!(
                "File too large for this document type (maximum {} MB)",
                max_size / MB
            ));
            return Ok(result);
        }

        // PDF markers apply to PDF content whatever type was declared
        let is_pdf = SignatureTable::is_pdf(&mime_type) || data.starts_with(b"%PDF");
        if let Some(threat) = self.scanner.scan(data, is_pdf) {
            tracing::warn!(
                request_id = ?context.request_id,
                pattern_index = threat.pattern_index,
                document_type = %document_type,
                "Threat marker found in upload"
            );
            return Err(VaultError::Security);
        }

        match self.signatures.check(data, &mime_type) {
            SignatureCheck::Match => {}
            SignatureCheck::Mismatch => {
                result.errors.push(format!(
                    "File content does not match declared type {}",
                    mime_type
                ));
            }
            SignatureCheck::Unknown => match self.unknown_mime_policy {
                UnknownMimePolicy::Deny => {
                    result
                        .errors
                        .push(format!("Unsupported file type: {}", display_mime(&mime_type)));
                }
                UnknownMimePolicy::Allow => {
                    tracing::debug!(
                        request_id = ?context.request_id,
                        mime_type = %mime_type,
                        "No signature known for declared type, accepting unchecked"
                    );
                }
            },
        }

        if !result.errors.is_empty() {
            return Ok(result);
        }

        let head = &data[..data.len().min(self.heuristic_prefix_bytes)];

        if let Some(format) = detect_embedded_archive(head) {
            result.flags.push(ReviewFlag::EmbeddedArchive {
                format: format.to_string(),
            });
        }

        if document_type == DocumentType::BackgroundCheck {
            let today = self.clock.now().date_naive();
            result.flags.extend(self.certificates.inspect(head, today));
        }

        if !result.flags.is_empty() {
            tracing::info!(
                request_id = ?context.request_id,
                flags = ?result.flags.iter().map(ReviewFlag::label).collect::<Vec<_>>(),
                "Upload flagged for manual review"
            );
        }

        result.sanitized = Some(data.clone());
        Ok(result)
    }
}

fn display_mime(mime_type: &str) -> &str {
    if mime_type.is_empty() {
        "(none)"
    } else {
        mime_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use docvault_core::ManualClock;

    fn config() -> DocVaultConfig {
        DocVaultConfig::with_keys([1u8; 32], [2u8; 32], b"0123456789abcdef")
    }

    fn validator_with(config: &DocVaultConfig) -> FileValidator {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        FileValidator::from_config(config, clock).unwrap()
    }

    fn validator() -> FileValidator {
        validator_with(&config())
    }

    fn pdf(body: &str) -> Bytes {
        Bytes::from(format!("%PDF-1.4\n{}\n%%EOF", body))
    }

    fn validate(v: &FileValidator, data: &Bytes, mime: &str, doc: DocumentType) -> ValidationResult {
        v.validate(data, mime, doc, &ValidationContext::default())
            .unwrap()
    }

    #[test]
    fn accepts_valid_pdf() {
        let data = pdf("passport scan");
        let result = validate(&validator(), &data, "application/pdf", DocumentType::Identity);
        assert!(result.is_accepted());
        assert_eq!(result.sanitized.as_ref(), Some(&data));
        assert!(result.flags.is_empty());
    }

    #[test]
    fn rejects_oversized_file() {
        let data = Bytes::from(vec![0u8; 10 * MB + 1]);
        let result = validate(&validator(), &data, "application/pdf", DocumentType::Identity);
        assert!(!result.is_accepted());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("too large"));
    }

    #[test]
    fn background_check_limit_is_larger() {
        let mut body = b"%PDF-1.4\nDBS certificate\n".to_vec();
        body.resize(12 * MB, b' ');
        let result = validate(
            &validator(),
            &Bytes::from(body),
            "application/pdf",
            DocumentType::BackgroundCheck,
        );
        assert!(result.is_accepted(), "errors: {:?}", result.errors);
    }

    #[test]
    fn rejects_empty_file() {
        let result = validate(&validator(), &Bytes::new(), "application/pdf", DocumentType::Identity);
        assert_eq!(result.errors, vec!["File is empty".to_string()]);
    }

    #[test]
    fn rejects_signature_mismatch() {
        let data = Bytes::from_static(b"\x89PNG\r\n\x1a\nimage");
        let result = validate(&validator(), &data, "application/pdf", DocumentType::Identity);
        assert!(!result.is_accepted());
        assert!(result.errors[0].contains("does not match"));
    }

    #[test]
    fn script_marker_is_security_error() {
        let data = pdf("<script>alert(document.cookie)</script>");
        let err = validator()
            .validate(&data, "application/pdf", DocumentType::Identity, &ValidationContext::default())
            .unwrap_err();
        assert!(matches!(err, VaultError::Security));
        assert!(!err.to_string().contains("script"));
    }

    #[test]
    fn threat_takes_priority_over_signature() {
        let data = Bytes::from_static(b"GIF89a <script>");
        let err = validator()
            .validate(&data, "image/png", DocumentType::Identity, &ValidationContext::default())
            .unwrap_err();
        assert!(matches!(err, VaultError::Security));
    }

    #[test]
    fn pdf_markers_apply_to_mislabelled_pdf_content() {
        let data = pdf("<< /OpenAction << /S /JavaScript /JS (app.launchURL()) >> /Launch >>");

        let mut config = config();
        config.unknown_mime_policy = UnknownMimePolicy::Allow;
        let err = validator_with(&config)
            .validate(
                &data,
                "application/octet-stream",
                DocumentType::AddressProof,
                &ValidationContext::default(),
            )
            .unwrap_err();
        assert!(matches!(err, VaultError::Security));

        let err = validator()
            .validate(&data, "image/png", DocumentType::Identity, &ValidationContext::default())
            .unwrap_err();
        assert!(matches!(err, VaultError::Security));
    }

    #[test]
    fn unknown_type_follows_policy() {
        let data = Bytes::from_static(b"plain text document");
        let denied = validate(&validator(), &data, "text/plain", DocumentType::AddressProof);
        assert!(denied.errors[0].contains("Unsupported file type"));

        let mut config = config();
        config.unknown_mime_policy = UnknownMimePolicy::Allow;
        let allowed = validate(&validator_with(&config), &data, "text/plain", DocumentType::AddressProof);
        assert!(allowed.is_accepted());
    }

    #[test]
    fn declared_type_is_normalized() {
        let data = pdf("statement");
        let result = validate(
            &validator(),
            &data,
            "Application/PDF; charset=binary",
            DocumentType::AddressProof,
        );
        assert!(result.is_accepted());
        assert_eq!(result.normalized_mime_type, "application/pdf");
    }

    #[test]
    fn embedded_archive_is_flagged_not_rejected() {
        let mut body = b"%PDF-1.4\n".to_vec();
        body.extend_from_slice(b"PK\x03\x04 compressed stream");
        let result = validate(
            &validator(),
            &Bytes::from(body),
            "application/pdf",
            DocumentType::Identity,
        );
        assert!(result.is_accepted());
        assert_eq!(
            result.flags,
            vec![ReviewFlag::EmbeddedArchive {
                format: "zip".to_string()
            }]
        );
    }

    #[test]
    fn certificate_heuristics_only_for_background_checks() {
        let data = pdf("holiday photos 01/01/2015");
        let identity = validate(&validator(), &data, "application/pdf", DocumentType::Identity);
        assert!(identity.flags.is_empty());

        let certificate = validate(
            &validator(),
            &data,
            "application/pdf",
            DocumentType::BackgroundCheck,
        );
        assert!(certificate.is_accepted());
        assert!(certificate
            .flags
            .contains(&ReviewFlag::LowConfidenceDocumentType));
        assert!(certificate
            .flags
            .iter()
            .any(|f| matches!(f, ReviewFlag::StaleDocument { .. })));
    }
}
