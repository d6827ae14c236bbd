//! Pipeline stages for PDF-to-CSV conversion.
//!
//! Each submodule implements exactly one step, so every step can be tested
//! on its own and the orchestration in [`crate::convert`] stays a plain
//! sequence of calls.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rasterize ──▶ ocr ──▶ reformat ──▶ analyze
//! (bytes)   (pdftoppm)   (tesseract) (CSV)     (LLM)
//! ```
//!
//! 1. [`input`]    : read a local file or download a URL, check `%PDF`
//! 2. [`rasterize`]: render pages to `page_<n>.jpg`
//! 3. [`ocr`]      : extract `page_<n>.txt` per image
//! 4. [`reformat`] : delimiter substitution into `output.csv`
//! 5. [`analyze`]  : optional model cleanup into `gemini_analysis_output.csv`
//!
//! [`tool`] holds the child-process helpers shared by steps 2 and 3.

pub mod analyze;
pub mod input;
pub mod ocr;
pub mod rasterize;
pub mod reformat;
pub mod tool;
