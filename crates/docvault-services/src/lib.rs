//! DocVault Services
//!
//! The upload orchestrator (the single entry point the surrounding product
//! calls to store a compliance document) and token-gated document access.

pub mod access;
pub mod upload;

pub use access::{DocumentAccessService, OpenedDocument};
pub use upload::{DocumentUploadService, UploadComponents, UploadState, METADATA_ENCRYPTED};
