//! Document upload orchestration
//!
//! Workflow: throttle → validate → name → store (bounded, one retry) → verify → issue token.

mod service;
mod state;

pub(crate) use service::sha256_hex;
pub use service::{DocumentUploadService, UploadComponents, METADATA_ENCRYPTED};
pub use state::UploadState;
