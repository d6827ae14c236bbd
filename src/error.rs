//! Error types for the pdf2csv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2CsvError`]: **Fatal**, the run cannot proceed at all (missing
//!   settings, wrong password, OCR engine not installed). Returned as
//!   `Err(Pdf2CsvError)` from the top-level `convert*` functions.
//!
//! * [`PageError`]: **Non-fatal**, OCR failed on a single page but the
//!   other pages are fine. Stored inside [`crate::output::PageText`] so the
//!   caller can tell exactly which pages produced text and which did not.
//!
//! Analysis-step failures are fatal for the analysis only; the orchestrator
//! captures them in [`crate::output::AnalysisOutcome::Failed`] so the
//! rasterization, OCR and CSV artifacts of the run remain usable.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2csv library.
#[derive(Debug, Error)]
pub enum Pdf2CsvError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The settings file does not exist or cannot be read.
    #[error("Settings file not found: '{path}'\nCreate it with a [settings] section holding PopplerPath and TesseractPath.")]
    ConfigNotFound { path: PathBuf },

    /// The settings file was read but a required section or key is absent.
    #[error("Settings file '{path}' is missing '{key}' in the [{section}] section")]
    ConfigKeyMissing {
        path: PathBuf,
        section: String,
        key: String,
    },

    /// Builder or run-option validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// The input was read, but is not a PDF.
    #[error("Input is not a valid PDF: '{source_name}'\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    // ── Rasterization errors ──────────────────────────────────────────────
    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// The rasterizer binary could not be started.
    #[error("Rasterizer not found at '{path}'\nCheck PopplerPath in the settings file.")]
    RasterizerNotFound { path: PathBuf },

    /// The rasterizer ran but could not render the document.
    #[error("Rasterisation failed: {detail}")]
    Rasterisation { detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine binary is missing or misconfigured.
    #[error("OCR engine error: {detail}\nCheck TesseractPath in the settings file.")]
    OcrEngine { detail: String },

    /// The requested OCR language is not recognised or not installed.
    #[error("Unsupported OCR language '{code}'. {hint}")]
    UnsupportedLanguage { code: String, hint: String },

    /// OCR failed on every page; there is no text to reformat.
    #[error("OCR failed on all {total} pages.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading or writing a pipeline artifact failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Analysis errors ───────────────────────────────────────────────────
    /// No credential is configured for the language-model service.
    #[error("Language-model provider '{provider}' is not configured.\n{hint}")]
    ServiceAuth { provider: String, hint: String },

    /// The language-model call failed or returned nothing usable.
    #[error("Language-model service error: {message}")]
    ServiceResponse { message: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2CsvError {
    /// Wrap an I/O error with the artifact path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Pdf2CsvError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the password-related rasterization failures.
    pub fn is_decryption(&self) -> bool {
        matches!(
            self,
            Pdf2CsvError::PasswordRequired | Pdf2CsvError::WrongPassword
        )
    }
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageText`] when a page fails.
/// The run continues unless ALL pages fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The OCR engine exited unsuccessfully for this page.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// The OCR engine did not finish within the tool timeout.
    #[error("Page {page}: OCR timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

impl PageError {
    /// 1-based index of the page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::OcrFailed { page, .. } | PageError::Timeout { page, .. } => *page,
        }
    }
}
