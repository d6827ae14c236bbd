//! Input resolution: turn a user-supplied path or URL into PDF bytes.
//!
//! The rasterizer consumes raw bytes (the same thing an upload widget
//! hands over), so both local files and downloads are read fully into memory
//! and checked for the `%PDF` magic before any tool is started.

use crate::error::Pdf2CsvError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Default timeout for URL downloads, in seconds.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// A PDF ready for rasterization.
#[derive(Debug, Clone)]
pub struct PdfInput {
    /// Display name: the path or URL the bytes came from.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PdfInput {
    /// Wrap in-memory bytes, validating the PDF magic.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Pdf2CsvError> {
        let name = name.into();
        check_magic(&name, &bytes)?;
        Ok(Self { name, bytes })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to PDF bytes, downloading URLs.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<PdfInput, Pdf2CsvError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<PdfInput, Pdf2CsvError> {
    let path = PathBuf::from(path_str);
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Pdf2CsvError::FileNotFound { path: path.clone() },
        _ => Pdf2CsvError::io(&path, e),
    })?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    PdfInput::from_bytes(path_str, bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<PdfInput, Pdf2CsvError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2CsvError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    info!("Downloaded {} bytes", bytes.len());

    PdfInput::from_bytes(url, bytes.to_vec())
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), Pdf2CsvError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(Pdf2CsvError::NotAPdf {
            source_name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}
