//! PDF rasterisation: render selected pages to image files via Poppler.
//!
//! `pdftoppm` writes into a private temporary directory; images are copied
//! into the working directory as `page_<n>.<ext>` only after the tool exited
//! successfully. A wrong password or a corrupt file therefore never leaves
//! page images behind.
//!
//! pdftoppm zero-pads its output numbers to the width of the document's page
//! count (`page-01.jpg` for a 12-page file), so pages are ordered by the
//! parsed number rather than by file name.

use crate::config::{ImageEncoding, PipelineConfig};
use crate::error::Pdf2CsvError;
use crate::output::PageImage;
use crate::pipeline::tool::{resolve_binary, run_tool, stderr_text, ToolError};
use crate::settings::ToolSettings;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const RASTERIZER: &str = "pdftoppm";
const OUTPUT_PREFIX: &str = "page";

static OUTPUT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^page-(\d+)\.(jpg|png)$").expect("static regex"));

/// Rasterise the selected pages of `pdf_bytes` into the working directory.
///
/// # Returns
/// Page images in document order, indexed `1..=n`.
pub async fn rasterize(
    pdf_bytes: &[u8],
    tools: &ToolSettings,
    config: &PipelineConfig,
) -> Result<Vec<PageImage>, Pdf2CsvError> {
    config.pages.validate()?;

    let program = resolve_binary(&tools.poppler_path, RASTERIZER);
    let scratch = tempfile::Builder::new()
        .prefix("pdf2csv_render_")
        .tempdir()
        .map_err(|e| Pdf2CsvError::io(std::env::temp_dir(), e))?;

    let pdf_path = scratch.path().join("input.pdf");
    tokio::fs::write(&pdf_path, pdf_bytes)
        .await
        .map_err(|e| Pdf2CsvError::io(&pdf_path, e))?;

    let args = pdftoppm_args(config, &pdf_path, &scratch.path().join(OUTPUT_PREFIX));
    let output = run_tool(&program, &args, config.tool_timeout_secs)
        .await
        .map_err(|e| match e {
            ToolError::Spawn { program, .. } => Pdf2CsvError::RasterizerNotFound { path: program },
            other => Pdf2CsvError::Rasterisation {
                detail: other.to_string(),
            },
        })?;

    if !output.status.success() {
        return Err(classify_failure(
            &stderr_text(&output),
            config.effective_password().is_some(),
        ));
    }

    let rendered = collect_rendered(scratch.path(), config.image_encoding).await?;
    if rendered.is_empty() {
        return Err(Pdf2CsvError::Rasterisation {
            detail: format!(
                "{RASTERIZER} produced no pages for selection {:?}",
                config.pages
            ),
        });
    }
    if let Some(expected) = config.pages.len() {
        if rendered.len() != expected {
            warn!(
                "Requested {} pages but {} were rendered (document is shorter than the range)",
                expected,
                rendered.len()
            );
        }
    }

    tokio::fs::create_dir_all(&config.workdir)
        .await
        .map_err(|e| Pdf2CsvError::io(&config.workdir, e))?;

    let mut images = Vec::with_capacity(rendered.len());
    for (i, (source_page, src)) in rendered.into_iter().enumerate() {
        let index = i + 1;
        let dest = page_image_path(&config.workdir, index, config.image_encoding);
        tokio::fs::copy(&src, &dest)
            .await
            .map_err(|e| Pdf2CsvError::io(&dest, e))?;

        let (width, height) = image::image_dimensions(&dest).unwrap_or_else(|e| {
            debug!("Could not read dimensions of {}: {}", dest.display(), e);
            (0, 0)
        });
        debug!(
            "Page {} (PDF page {}) → {} ({}x{} px)",
            index,
            source_page,
            dest.display(),
            width,
            height
        );

        images.push(PageImage {
            index,
            source_page,
            path: dest,
            encoding: config.image_encoding,
            width,
            height,
        });
    }

    info!("Rasterised {} pages at {} DPI", images.len(), config.dpi);
    Ok(images)
}

/// `<workdir>/page_<index>.<ext>`
pub fn page_image_path(workdir: &Path, index: usize, encoding: ImageEncoding) -> PathBuf {
    workdir.join(format!("page_{index}.{}", encoding.extension()))
}

fn pdftoppm_args(config: &PipelineConfig, pdf: &Path, prefix: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        config.image_encoding.pdftoppm_flag().into(),
        "-r".into(),
        config.dpi.to_string().into(),
    ];
    if let Some(first) = config.pages.first() {
        args.push("-f".into());
        args.push(first.to_string().into());
    }
    if let Some(last) = config.pages.last() {
        args.push("-l".into());
        args.push(last.to_string().into());
    }
    if let Some(pw) = config.effective_password() {
        args.push("-upw".into());
        args.push(pw.into());
    }
    args.push(pdf.into());
    args.push(prefix.into());
    args
}

/// Map a non-zero pdftoppm exit to an error, using its stderr.
fn classify_failure(stderr: &str, password_given: bool) -> Pdf2CsvError {
    if stderr.to_ascii_lowercase().contains("password") {
        if password_given {
            Pdf2CsvError::WrongPassword
        } else {
            Pdf2CsvError::PasswordRequired
        }
    } else {
        Pdf2CsvError::Rasterisation {
            detail: if stderr.is_empty() {
                format!("{RASTERIZER} exited unsuccessfully")
            } else {
                stderr.to_string()
            },
        }
    }
}

/// Find `page-N.<ext>` files in `dir`, ordered by `N`.
async fn collect_rendered(
    dir: &Path,
    encoding: ImageEncoding,
) -> Result<Vec<(usize, PathBuf)>, Pdf2CsvError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Pdf2CsvError::io(dir, e))?;

    let mut found = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Pdf2CsvError::io(dir, e))?
    {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(page) = parse_output_name(name, encoding) {
            found.push((page, entry.path()));
        }
    }

    found.sort_by_key(|(page, _)| *page);
    Ok(found)
}

fn parse_output_name(name: &str, encoding: ImageEncoding) -> Option<usize> {
    let caps = OUTPUT_NAME.captures(name)?;
    if &caps[2] != encoding.extension() {
        return None;
    }
    caps[1].parse().ok()
}
