//! docvault: operator CLI for the compliance document vault.
//!
//! Reads DOCVAULT_* variables (or a .env file) for keys, limits and storage.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use docvault_cli::{audit_logger, build_upload_service, generate_key, guess_mime_type};
use docvault_core::models::{DocumentType, UploadRequest};
use docvault_core::{CryptoEngine, DocVaultConfig, SystemClock, SystemRandom};
use docvault_infra::{init_telemetry, LogFormat};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "docvault", about = "Compliance document vault CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and store a document, printing the receipt
    Upload {
        /// Path to the document
        file: PathBuf,
        /// Owner the document belongs to
        #[arg(long)]
        owner: String,
        /// Document type: background-check, identity, address-proof
        #[arg(long = "type")]
        document_type: DocumentType,
        /// Declared MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
        /// Append audit events to this file as JSON lines
        #[arg(long)]
        audit_log: Option<PathBuf>,
    },
    /// Check an access token's signature and expiry
    VerifyToken {
        token: String,
    },
    /// Print a fresh base64 32-byte key
    GenerateKey,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::GenerateKey = cli.command {
        println!("{}", generate_key(&SystemRandom));
        return Ok(());
    }

    let config = DocVaultConfig::from_env().context(
        "Failed to load configuration. Set DOCVAULT_ENCRYPTION_KEY, DOCVAULT_TOKEN_SIGNING_KEY and DOCVAULT_PATH_SALT",
    )?;
    init_telemetry(LogFormat::parse(&config.log_format))
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;
    tracing::debug!(
        environment = %config.environment,
        storage_backend = %config.storage.backend,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Upload {
            file,
            owner,
            document_type,
            mime,
            audit_log,
        } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let declared = mime.unwrap_or_else(|| guess_mime_type(&file).to_string());
            let file_name = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let service =
                build_upload_service(&config, audit_logger(audit_log.as_deref())?).await?;
            let request =
                UploadRequest::new(Bytes::from(data), declared, file_name, document_type, owner);

            match service.upload_document(request).await {
                Ok(receipt) => print_json(&receipt)?,
                Err(err) => {
                    print_json(&err.to_response())?;
                    anyhow::bail!("Upload rejected: {}", err);
                }
            }
        }
        Commands::VerifyToken { token } => {
            let crypto = CryptoEngine::from_config(&config, Arc::new(SystemClock))?;
            let claims = crypto.verify_access_token(&token)?;
            print_json(&claims)?;
        }
        Commands::GenerateKey => {}
    }

    Ok(())
}
