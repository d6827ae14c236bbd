//! OCR: run Tesseract on each page image and persist the text.
//!
//! The engine location and language are passed in explicitly on every call;
//! nothing is stored in process-wide state.
//!
//! Engine-level problems (binary missing, language not installed) are fatal
//! and reported before any page is processed. A failure on one page is
//! recorded on that page's [`PageText`] and logged, and the remaining pages
//! carry on.

use crate::config::{OcrLanguage, PipelineConfig};
use crate::error::{PageError, Pdf2CsvError};
use crate::output::{PageImage, PageText};
use crate::pipeline::tool::{resolve_binary, run_tool, stderr_text, ToolError};
use crate::progress::Stage;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const OCR_ENGINE: &str = "tesseract";

/// OCR every page image, writing `page_<n>.txt` next to each.
///
/// # Returns
/// One [`PageText`] per input image, in the same order.
///
/// # Errors
/// - [`Pdf2CsvError::OcrEngine`] if the engine cannot be started
/// - [`Pdf2CsvError::UnsupportedLanguage`] if the language is not installed
/// - [`Pdf2CsvError::AllPagesFailed`] if no page produced text
/// - [`Pdf2CsvError::Io`] if a text file cannot be written
pub async fn ocr_pages(
    images: &[PageImage],
    tesseract_path: &Path,
    language: OcrLanguage,
    config: &PipelineConfig,
) -> Result<Vec<PageText>, Pdf2CsvError> {
    let program = resolve_binary(tesseract_path, OCR_ENGINE);
    ensure_language_installed(&program, language, config.tool_timeout_secs).await?;

    let total = images.len();
    info!("Running OCR ({}) on {} pages", language, total);

    let texts: Vec<PageText> = stream::iter(images.iter().map(|image| {
        let program = program.clone();
        async move {
            let result = ocr_page(&program, image, language, config.tool_timeout_secs).await;
            if let (Ok(text), Some(cb)) = (&result, &config.progress_callback) {
                match &text.error {
                    None => cb.on_page_complete(Stage::Ocr, text.index, total),
                    Some(e) => cb.on_page_error(Stage::Ocr, text.index, total, &e.to_string()),
                }
            }
            result
        }
    }))
    // `buffered` (not `buffer_unordered`) keeps results index-aligned.
    .buffered(config.ocr_concurrency.max(1))
    .try_collect()
    .await?;

    let failed: Vec<&PageError> = texts.iter().filter_map(|t| t.error.as_ref()).collect();
    if !texts.is_empty() && failed.len() == texts.len() {
        return Err(Pdf2CsvError::AllPagesFailed {
            total,
            first_error: failed[0].to_string(),
        });
    }
    if !failed.is_empty() {
        warn!("OCR failed on {}/{} pages", failed.len(), total);
    }

    Ok(texts)
}

/// OCR one image. Engine start-up failures are fatal; anything else is a
/// page-level error.
async fn ocr_page(
    program: &Path,
    image: &PageImage,
    language: OcrLanguage,
    timeout_secs: Option<u64>,
) -> Result<PageText, Pdf2CsvError> {
    let text_path = text_path_for(&image.path);
    let failed = |error: PageError| {
        warn!("{}", error);
        PageText {
            index: image.index,
            path: text_path.clone(),
            line_count: 0,
            error: Some(error),
        }
    };

    let args: [&std::ffi::OsStr; 4] = [
        image.path.as_os_str(),
        "stdout".as_ref(),
        "-l".as_ref(),
        language.code().as_ref(),
    ];

    let output = match run_tool(program, args, timeout_secs).await {
        Ok(output) => output,
        Err(ToolError::Spawn { program, source }) => {
            return Err(Pdf2CsvError::OcrEngine {
                detail: format!("cannot run '{}': {}", program.display(), source),
            });
        }
        Err(ToolError::TimedOut { secs, .. }) => {
            return Ok(failed(PageError::Timeout {
                page: image.index,
                secs,
            }));
        }
        Err(e @ ToolError::Wait { .. }) => {
            return Ok(failed(PageError::OcrFailed {
                page: image.index,
                detail: e.to_string(),
            }));
        }
    };

    if !output.status.success() {
        let stderr = stderr_text(&output);
        return Ok(failed(PageError::OcrFailed {
            page: image.index,
            detail: if stderr.is_empty() {
                format!("{OCR_ENGINE} exited with {}", output.status)
            } else {
                stderr
            },
        }));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    tokio::fs::write(&text_path, text.as_bytes())
        .await
        .map_err(|e| Pdf2CsvError::io(&text_path, e))?;

    let line_count = text.split_inclusive('\n').count();
    debug!(
        "Page {}: {} lines → {}",
        image.index,
        line_count,
        text_path.display()
    );

    Ok(PageText {
        index: image.index,
        path: text_path,
        line_count,
        error: None,
    })
}

/// `page_3.jpg` → `page_3.txt`
pub fn text_path_for(image: &Path) -> PathBuf {
    image.with_extension("txt")
}

/// Fail fast when the engine is missing or lacks the language's traineddata.
pub async fn ensure_language_installed(
    program: &Path,
    language: OcrLanguage,
    timeout_secs: Option<u64>,
) -> Result<(), Pdf2CsvError> {
    let output = run_tool(program, ["--list-langs"], timeout_secs)
        .await
        .map_err(|e| Pdf2CsvError::OcrEngine {
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Pdf2CsvError::OcrEngine {
            detail: format!(
                "'{} --list-langs' failed: {}",
                program.display(),
                stderr_text(&output)
            ),
        });
    }

    // Tesseract 3 prints the list on stderr, later versions on stdout.
    let listing = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let installed = parse_installed_languages(&listing);

    if installed.iter().any(|l| l == language.code()) {
        Ok(())
    } else {
        Err(Pdf2CsvError::UnsupportedLanguage {
            code: language.code().to_string(),
            hint: format!(
                "The OCR engine has no '{}' language data installed (installed: {}).",
                language.code(),
                if installed.is_empty() {
                    "none".to_string()
                } else {
                    installed.join(", ")
                }
            ),
        })
    }
}

fn parse_installed_languages(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of available languages"))
        .filter(|l| !l.contains(char::is_whitespace))
        .map(str::to_string)
        .collect()
}
