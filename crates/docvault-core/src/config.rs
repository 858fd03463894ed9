//! Configuration module
//!
//! All configuration is read once at startup. Key material and the path salt
//! are required and validated eagerly; everything else has a documented default.

use std::env;
use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};

use crate::constants::*;
use crate::models::DocumentType;
use crate::storage_types::StorageBackend;

/// Secret bytes whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes([redacted; {}])", self.0.len())
    }
}

/// What to do with declared MIME types that have no known file signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownMimePolicy {
    Allow,
    Deny,
}

impl FromStr for UnknownMimePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "allow" => Ok(UnknownMimePolicy::Allow),
            "deny" => Ok(UnknownMimePolicy::Deny),
            _ => Err(anyhow::anyhow!(
                "Invalid unknown MIME policy '{}': expected 'allow' or 'deny'",
                s
            )),
        }
    }
}

/// Maximum accepted size per document type, in bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeLimits {
    pub background_check: usize,
    pub identity: usize,
    pub address_proof: usize,
}

impl SizeLimits {
    pub fn max_for(&self, document_type: DocumentType) -> usize {
        match document_type {
            DocumentType::BackgroundCheck => self.background_check,
            DocumentType::Identity => self.identity,
            DocumentType::AddressProof => self.address_proof,
        }
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            background_check: DEFAULT_MAX_SIZE_MB_BACKGROUND_CHECK * MB,
            identity: DEFAULT_MAX_SIZE_MB_IDENTITY * MB,
            address_proof: DEFAULT_MAX_SIZE_MB_ADDRESS_PROOF * MB,
        }
    }
}

/// One dangerous-content marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatPatternConfig {
    pub pattern: String,
    /// Only applied when the declared type is PDF
    pub pdf_only: bool,
}

impl ThreatPatternConfig {
    pub fn defaults() -> Vec<Self> {
        DEFAULT_THREAT_PATTERNS
            .iter()
            .map(|(pattern, pdf_only)| ThreatPatternConfig {
                pattern: pattern.to_string(),
                pdf_only: *pdf_only,
            })
            .collect()
    }

    /// Parse a `;;`-separated list; entries prefixed with `pdf:` are PDF-only.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(THREAT_PATTERN_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| match entry.strip_prefix(PDF_PATTERN_PREFIX) {
                Some(rest) => ThreatPatternConfig {
                    pattern: rest.to_string(),
                    pdf_only: true,
                },
                None => ThreatPatternConfig {
                    pattern: entry.to_string(),
                    pdf_only: false,
                },
            })
            .collect()
    }
}

/// Object store selection
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, ...)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            local_storage_path: None,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
        }
    }
}

/// Vault configuration
#[derive(Clone, Debug)]
pub struct DocVaultConfig {
    pub environment: String,
    pub encryption_key: SecretBytes,
    pub token_signing_key: SecretBytes,
    pub path_salt: SecretBytes,
    pub size_limits: SizeLimits,
    pub threat_patterns: Vec<ThreatPatternConfig>,
    pub token_ttl_secs: u64,
    pub unknown_mime_policy: UnknownMimePolicy,
    pub scan_prefix_bytes: usize,
    pub heuristic_prefix_bytes: usize,
    pub certificate_max_age_days: i64,
    pub store_timeout_secs: u64,
    pub storage: StorageConfig,
    pub log_format: String,
}

impl DocVaultConfig {
    /// Load from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup (e.g. a map in tests).
    pub fn from_source<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let encryption_key = required_key(&lookup, "DOCVAULT_ENCRYPTION_KEY")?;
        let token_signing_key = required_key(&lookup, "DOCVAULT_TOKEN_SIGNING_KEY")?;
        let path_salt = lookup("DOCVAULT_PATH_SALT")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("DOCVAULT_PATH_SALT must be set"))?;

        let size_limits = SizeLimits {
            background_check: size_limit_mb(
                &lookup,
                "DOCVAULT_MAX_SIZE_MB_BACKGROUND_CHECK",
                DEFAULT_MAX_SIZE_MB_BACKGROUND_CHECK,
            )?,
            identity: size_limit_mb(
                &lookup,
                "DOCVAULT_MAX_SIZE_MB_IDENTITY",
                DEFAULT_MAX_SIZE_MB_IDENTITY,
            )?,
            address_proof: size_limit_mb(
                &lookup,
                "DOCVAULT_MAX_SIZE_MB_ADDRESS_PROOF",
                DEFAULT_MAX_SIZE_MB_ADDRESS_PROOF,
            )?,
        };

        let threat_patterns = match lookup("DOCVAULT_THREAT_PATTERNS") {
            Some(raw) => ThreatPatternConfig::parse_list(&raw),
            None => ThreatPatternConfig::defaults(),
        };

        let unknown_mime_policy = match lookup("DOCVAULT_UNKNOWN_MIME_POLICY") {
            Some(raw) => raw.parse()?,
            None => UnknownMimePolicy::Deny,
        };

        let backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::Local,
        };

        let config = DocVaultConfig {
            environment,
            encryption_key,
            token_signing_key,
            path_salt: SecretBytes::new(path_salt.into_bytes()),
            size_limits,
            threat_patterns,
            token_ttl_secs: parse_or(&lookup, "DOCVAULT_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?,
            unknown_mime_policy,
            scan_prefix_bytes: parse_or(
                &lookup,
                "DOCVAULT_SCAN_PREFIX_BYTES",
                DEFAULT_SCAN_PREFIX_BYTES,
            )?,
            heuristic_prefix_bytes: parse_or(
                &lookup,
                "DOCVAULT_HEURISTIC_PREFIX_BYTES",
                DEFAULT_HEURISTIC_PREFIX_BYTES,
            )?,
            certificate_max_age_days: parse_or(
                &lookup,
                "DOCVAULT_CERTIFICATE_MAX_AGE_DAYS",
                DEFAULT_CERTIFICATE_MAX_AGE_DAYS,
            )?,
            store_timeout_secs: parse_or(
                &lookup,
                "DOCVAULT_STORE_TIMEOUT_SECS",
                DEFAULT_STORE_TIMEOUT_SECS,
            )?,
            storage: StorageConfig {
                backend,
                local_storage_path: lookup("LOCAL_STORAGE_PATH"),
                s3_bucket: lookup("S3_BUCKET"),
                s3_region: lookup("S3_REGION").or_else(|| lookup("AWS_REGION")),
                s3_endpoint: lookup("S3_ENDPOINT"),
            },
            log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Configuration built directly from key material, with defaults elsewhere.
    pub fn with_keys(encryption_key: [u8; 32], token_signing_key: [u8; 32], path_salt: &[u8]) -> Self {
        DocVaultConfig {
            environment: "development".to_string(),
            encryption_key: SecretBytes::new(encryption_key.to_vec()),
            token_signing_key: SecretBytes::new(token_signing_key.to_vec()),
            path_salt: SecretBytes::new(path_salt.to_vec()),
            size_limits: SizeLimits::default(),
            threat_patterns: ThreatPatternConfig::defaults(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            unknown_mime_policy: UnknownMimePolicy::Deny,
            scan_prefix_bytes: DEFAULT_SCAN_PREFIX_BYTES,
            heuristic_prefix_bytes: DEFAULT_HEURISTIC_PREFIX_BYTES,
            certificate_max_age_days: DEFAULT_CERTIFICATE_MAX_AGE_DAYS,
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            storage: StorageConfig::default(),
            log_format: "pretty".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.encryption_key.len() != 32 {
            anyhow::bail!("DOCVAULT_ENCRYPTION_KEY must decode to 32 bytes");
        }
        if self.token_signing_key.len() != 32 {
            anyhow::bail!("DOCVAULT_TOKEN_SIGNING_KEY must decode to 32 bytes");
        }
        if self.path_salt.len() < MIN_PATH_SALT_BYTES {
            anyhow::bail!(
                "DOCVAULT_PATH_SALT must be at least {} bytes",
                MIN_PATH_SALT_BYTES
            );
        }
        if self.token_ttl_secs == 0 {
            anyhow::bail!("DOCVAULT_TOKEN_TTL_SECS must be greater than zero");
        }
        if self.threat_patterns.is_empty() {
            anyhow::bail!("DOCVAULT_THREAT_PATTERNS must contain at least one pattern");
        }
        if DocumentType::ALL
            .iter()
            .any(|t| self.size_limits.max_for(*t) == 0)
        {
            anyhow::bail!("Maximum document sizes must be greater than zero");
        }
        if self.scan_prefix_bytes == 0 || self.heuristic_prefix_bytes == 0 {
            anyhow::bail!("Scan prefix sizes must be greater than zero");
        }
        match self.storage.backend {
            StorageBackend::S3 if self.storage.s3_bucket.is_none() => {
                anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3")
            }
            StorageBackend::Local if self.storage.local_storage_path.is_none() => {
                anyhow::bail!("LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local")
            }
            _ => {}
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }
}

fn required_key<F>(lookup: &F, name: &str) -> Result<SecretBytes, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name).ok_or_else(|| anyhow::anyhow!("{} must be set", name))?;
    let bytes = general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|e| anyhow::anyhow!("Failed to decode {}: {}", name, e))?;
    if bytes.len() != 32 {
        anyhow::bail!("{} must decode to 32 bytes (got {})", name, bytes.len());
    }
    Ok(SecretBytes::new(bytes))
}

/// Megabyte limit from `name`, converted to bytes without overflowing
fn size_limit_mb<F>(lookup: &F, name: &str, default: usize) -> Result<usize, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, name, default)?
        .checked_mul(MB)
        .ok_or_else(|| anyhow::anyhow!("{} is too large", name))
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        None => Ok(default),
    }
}
