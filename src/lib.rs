//! # pdf2csv
//!
//! Turn a scanned PDF into a crude comma-delimited text file by chaining
//! Poppler's rasterizer, the Tesseract OCR engine and a language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Settings   read config.ini for the Poppler and Tesseract locations
//!  ├─ 2. Rasterize  pdftoppm → page_<n>.jpg       (default 500 DPI)
//!  ├─ 3. OCR        tesseract → page_<n>.txt     (eng, fra, msa, deu, spa)
//!  ├─ 4. Reformat   drop commas, spaces → commas, drop quotes → output.csv
//!  └─ 5. Analyze    chat model cleanup → gemini_analysis_output.csv
//! ```
//!
//! Steps 1–4 are fatal on error. Step 5 never fails the run: its result is
//! reported as an [`AnalysisOutcome`] and `output.csv` stays in place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2csv::{convert, OcrLanguage, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ./config.ini; the analysis step needs GEMINI_API_KEY.
//!     let config = PipelineConfig::builder()
//!         .language(OcrLanguage::French)
//!         .build()?;
//!     let output = convert("scan.pdf", &config).await?;
//!     print!("{}", output.csv());
//!     if let Some(text) = output.analysis.text() {
//!         println!("{text}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Settings File
//!
//! ```ini
//! [settings]
//! PopplerPath = /usr/bin
//! TesseractPath = /usr/bin/tesseract
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2csv` binary (clap + anyhow + tracing-subscriber + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2csv = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod settings;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    AnalysisConfig, ImageEncoding, OcrLanguage, PageSelection, PipelineConfig,
    PipelineConfigBuilder, ProviderKind, MAX_ANALYSIS_RETRIES,
};
pub use convert::{convert, convert_from_bytes, convert_sync};
pub use error::{PageError, Pdf2CsvError};
pub use output::{
    AnalysisOutcome, PageImage, PageText, PipelineOutput, PipelineStats, ReformattedLine,
};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use settings::ToolSettings;
