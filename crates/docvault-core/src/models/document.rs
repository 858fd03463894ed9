use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of compliance document being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BackgroundCheck,
    Identity,
    AddressProof,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [
        DocumentType::BackgroundCheck,
        DocumentType::Identity,
        DocumentType::AddressProof,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BackgroundCheck => "background_check",
            DocumentType::Identity => "identity",
            DocumentType::AddressProof => "address_proof",
        }
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "background_check" | "certificate" => Ok(DocumentType::BackgroundCheck),
            "identity" | "id" => Ok(DocumentType::Identity),
            "address_proof" => Ok(DocumentType::AddressProof),
            _ => Err(anyhow::anyhow!("Invalid document type: {}", s)),
        }
    }
}

impl Display for DocumentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
