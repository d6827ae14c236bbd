//! Run entry points: the fixed Configuration → Rasterize → OCR → Reformat →
//! Analyze sequence.
//!
//! Failure policy per stage:
//!
//! | Stage | On error |
//! |-------|----------|
//! | settings, rasterize | `Err`, nothing usable was written |
//! | OCR, reformat | `Err`, artifacts already written stay on disk |
//! | analyze | `Ok`, with [`AnalysisOutcome::Failed`] |

use crate::config::PipelineConfig;
use crate::error::Pdf2CsvError;
use crate::output::{
    AnalysisOutcome, PipelineOutput, PipelineStats, ANALYSIS_FILE_NAME, CSV_FILE_NAME,
};
use crate::pipeline::input::{self, PdfInput, DOWNLOAD_TIMEOUT_SECS};
use crate::pipeline::{analyze, ocr, rasterize, reformat};
use crate::progress::Stage;
use crate::settings::ToolSettings;
use std::time::Instant;
use tracing::info;

/// Convert a PDF file or URL to CSV.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(PipelineOutput)` once `output.csv` is written, even if some pages
/// failed OCR (see `output.stats.failed_pages`) or the analysis step failed
/// (see `output.analysis`).
///
/// # Errors
/// Returns `Err(Pdf2CsvError)` for configuration, input, rasterization, OCR
/// and reformatting failures.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, Pdf2CsvError> {
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    let tools = load_tools(config)?;
    let pdf = input::resolve_input(input_str, DOWNLOAD_TIMEOUT_SECS).await?;
    run_pipeline(&pdf, &tools, config).await
}

/// Convert PDF bytes already in memory, e.g. an uploaded file.
///
/// # Example
/// ```rust,no_run
/// use pdf2csv::{convert_from_bytes, PipelineConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("scan.pdf")?;
/// let output = convert_from_bytes(&bytes, &PipelineConfig::default()).await?;
/// print!("{}", output.csv());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &PipelineConfig,
) -> Result<PipelineOutput, Pdf2CsvError> {
    let tools = load_tools(config)?;
    let pdf = PdfInput::from_bytes("<memory>", bytes.to_vec())?;
    run_pipeline(&pdf, &tools, config).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, Pdf2CsvError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2CsvError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Tool locations: injected settings win over the settings file.
fn load_tools(config: &PipelineConfig) -> Result<ToolSettings, Pdf2CsvError> {
    notify_start(config, Stage::Configure);
    let tools = match config.tools {
        Some(ref tools) => tools.clone(),
        None => ToolSettings::load(&config.settings_path)?,
    };
    notify_complete(config, Stage::Configure);
    Ok(tools)
}

async fn run_pipeline(
    pdf: &PdfInput,
    tools: &ToolSettings,
    config: &PipelineConfig,
) -> Result<PipelineOutput, Pdf2CsvError> {
    let total_start = Instant::now();

    // ── Step 1: PDF → page images ────────────────────────────────────────
    notify_start(config, Stage::Rasterize);
    let render_start = Instant::now();
    let images = rasterize::rasterize(&pdf.bytes, tools, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        for image in &images {
            cb.on_page_complete(Stage::Rasterize, image.index, images.len());
        }
    }
    notify_complete(config, Stage::Rasterize);

    // ── Step 2: page images → text ───────────────────────────────────────
    notify_start(config, Stage::Ocr);
    let ocr_start = Instant::now();
    let texts = ocr::ocr_pages(&images, &tools.tesseract_path, config.language, config).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;
    notify_complete(config, Stage::Ocr);

    // ── Step 3: text → CSV ───────────────────────────────────────────────
    notify_start(config, Stage::Reformat);
    let lines = reformat::reformat_pages(&texts).await?;
    let csv_path = config.workdir.join(CSV_FILE_NAME);
    reformat::write_delimited(&lines, &csv_path).await?;
    notify_complete(config, Stage::Reformat);

    // ── Step 4: CSV → analysis (never fails the run) ─────────────────────
    let analysis_start = Instant::now();
    let analysis = if config.analysis.enabled {
        notify_start(config, Stage::Analyze);
        let csv: String = lines.iter().map(|l| l.text.as_str()).collect();
        let outcome = analyze::run_analysis(
            &csv,
            &config.workdir.join(ANALYSIS_FILE_NAME),
            &config.analysis,
        )
        .await;
        if !outcome.is_failed() {
            notify_complete(config, Stage::Analyze);
        }
        outcome
    } else {
        AnalysisOutcome::Skipped
    };
    let analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;

    let failed_pages = texts.iter().filter(|t| !t.is_ok()).count();
    let stats = PipelineStats {
        rendered_pages: images.len(),
        ocr_pages: texts.len() - failed_pages,
        failed_pages,
        csv_lines: lines.len(),
        render_duration_ms,
        ocr_duration_ms,
        analysis_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages, {} CSV lines, {}ms total",
        stats.rendered_pages, stats.csv_lines, stats.total_duration_ms
    );

    Ok(PipelineOutput {
        images,
        texts,
        lines,
        csv_path,
        analysis,
        stats,
    })
}

fn notify_start(config: &PipelineConfig, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn notify_complete(config: &PipelineConfig, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage);
    }
}
