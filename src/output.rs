//! Artifacts and results of a run.
//!
//! Every type here describes something already persisted in the working
//! directory; the in-memory values exist so callers can display or inspect
//! results without re-reading files.

use crate::config::ImageEncoding;
use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed name of the aggregated delimited file.
pub const CSV_FILE_NAME: &str = "output.csv";

/// Fixed name of the language-model output file.
pub const ANALYSIS_FILE_NAME: &str = "gemini_analysis_output.csv";

/// One rasterized page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-based sequential index within this run (`page_<index>.jpg`).
    pub index: usize,
    /// 1-based page number in the source PDF.
    pub source_page: usize,
    pub path: PathBuf,
    pub encoding: ImageEncoding,
    pub width: u32,
    pub height: u32,
}

/// OCR result for one page image, index-aligned with [`PageImage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageText {
    pub index: usize,
    /// Sibling `.txt` path. Only written when `error` is `None`.
    pub path: PathBuf,
    pub line_count: usize,
    pub error: Option<PageError>,
}

impl PageText {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// One source line after delimiter substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReformattedLine {
    /// Page index the line came from.
    pub page: usize,
    /// Transformed text, including the original line ending if it had one.
    pub text: String,
}

/// What happened in the language-model step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// The response was received and written to `path`.
    Completed { path: PathBuf, text: String },
    /// The step failed; earlier artifacts are unaffected.
    Failed { error: String },
    /// Analysis was disabled for this run.
    Skipped,
}

impl AnalysisOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Completed { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AnalysisOutcome::Failed { .. })
    }
}

/// Counters and timings for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStats {
    pub rendered_pages: usize,
    pub ocr_pages: usize,
    pub failed_pages: usize,
    pub csv_lines: usize,
    pub render_duration_ms: u64,
    pub ocr_duration_ms: u64,
    pub analysis_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub images: Vec<PageImage>,
    pub texts: Vec<PageText>,
    pub lines: Vec<ReformattedLine>,
    pub csv_path: PathBuf,
    pub analysis: AnalysisOutcome,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    /// The delimited text as written to `output.csv`.
    pub fn csv(&self) -> String {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }

    /// Pages whose OCR failed.
    pub fn page_errors(&self) -> impl Iterator<Item = &PageError> {
        self.texts.iter().filter_map(|t| t.error.as_ref())
    }
}
