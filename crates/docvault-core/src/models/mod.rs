//! Domain models for document uploads, stored references, tokens and audit records.

pub mod audit;
pub mod blob;
pub mod document;
pub mod reference;
pub mod token;
pub mod upload;
pub mod validation;

pub use audit::{AuditAction, AuditEvent, AuditOutcome};
pub use blob::EncryptedBlob;
pub use document::DocumentType;
pub use reference::SecureObjectReference;
pub use token::AccessTokenClaims;
pub use upload::{RequestContext, UploadReceipt, UploadRequest};
pub use validation::{ReviewFlag, ValidationResult};
