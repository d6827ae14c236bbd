//! Progress-callback trait for stage and per-page pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the run moves through its stages. The CLI drives its spinner
//! from these events; library callers can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use pdf2csv::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for PageCounter {
//!     fn on_page_complete(&self, stage: Stage, page: usize, total: usize) {
//!         if stage == Stage::Ocr {
//!             self.pages.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("OCR {page}/{total}");
//!         }
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(PageCounter { pages: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One step of the fixed linear pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Configure,
    Rasterize,
    Ocr,
    Reformat,
    Analyze,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Configure => "Loading settings",
            Stage::Rasterize => "PDF to JPG",
            Stage::Ocr => "JPG to TXT",
            Stage::Reformat => "TXT to CSV",
            Stage::Analyze => "Analysis",
        })
    }
}

/// Called by the pipeline as it runs.
///
/// All methods have no-op defaults. With `ocr_concurrency > 1` the page
/// events of the OCR stage may arrive from several tasks at once, so
/// implementations must be `Send + Sync`.
pub trait PipelineProgressCallback: Send + Sync {
    /// A stage is about to start.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// A page finished within `stage` (1-indexed `page` of `total`).
    fn on_page_complete(&self, stage: Stage, page: usize, total: usize) {
        let _ = (stage, page, total);
    }

    /// A page failed within `stage`; the stage continues with the other pages.
    fn on_page_error(&self, stage: Stage, page: usize, total: usize, error: &str) {
        let _ = (stage, page, total, error);
    }

    /// A stage finished successfully.
    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }
}

/// Used when no callback is configured.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
