//! CLI binary for pdf2csv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2csv::{
    convert, AnalysisConfig, AnalysisOutcome, ImageEncoding, OcrLanguage, PageSelection,
    PipelineConfig, PipelineProgressCallback, ProgressCallback, ProviderKind, Stage,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Busy indicator shown while the pipeline runs: one spinner whose prefix is
/// the current stage, plus a log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Pages that failed OCR.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Please wait…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("Please wait…");
    }

    fn on_page_complete(&self, stage: Stage, page: usize, total: usize) {
        self.bar.set_message(format!("{stage}: page {page}/{total}"));
    }

    fn on_page_error(&self, stage: Stage, page: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {} page {:>3}/{:<3}  {}",
            red("✗"),
            stage,
            page,
            total,
            red(&msg)
        ));
    }

    fn on_stage_complete(&self, stage: Stage) {
        let failed = self.errors.load(Ordering::SeqCst);
        let note = if stage == Stage::Ocr && failed > 0 {
            format!("  ({} pages failed)", failed)
        } else {
            String::new()
        };
        self.bar
            .println(format!("{} {} completed!{}", green("✔"), bold(&stage.to_string()), note));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert with the defaults (English OCR, 500 DPI, ./config.ini)
  pdf2csv scan.pdf

  # French document, pages 2 to 4, artifacts in ./out
  pdf2csv --lang fra --first-page 2 --last-page 4 --workdir out scan.pdf

  # Encrypted PDF
  pdf2csv --password s3cret statement.pdf

  # Skip the language-model step
  pdf2csv --no-analysis scan.pdf

  # Machine-readable result
  pdf2csv --json scan.pdf > result.json

SETTINGS FILE (config.ini):
  [settings]
  PopplerPath = /usr/bin
  TesseractPath = /usr/bin/tesseract

OCR LANGUAGES:
  eng  English (default)
  fra  French
  msa  Malay
  deu  German
  spa  Spanish

OUTPUT FILES (in --workdir):
  page_<n>.jpg                 rendered pages
  page_<n>.txt                 OCR text per page
  output.csv                   reformatted text
  gemini_analysis_output.csv   language-model cleanup

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY     API key for --provider gemini (a .env file is read too)
  OPENAI_API_KEY     API key for --provider openai
  ANTHROPIC_API_KEY  API key for --provider anthropic
  OLLAMA_HOST        Ollama server (default http://localhost:11434; no key)
  PDF2CSV_CONFIG    Settings file path
  RUST_LOG          Override the log filter
"#;

/// Convert scanned PDFs to comma-delimited text with Poppler, Tesseract and a language model.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2csv",
    version,
    about = "Convert scanned PDFs to comma-delimited text via OCR",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Settings file holding PopplerPath and TesseractPath.
    #[arg(long, env = "PDF2CSV_CONFIG", default_value = "config.ini")]
    config: PathBuf,

    /// Directory for page images, text files and CSV output.
    #[arg(short, long, env = "PDF2CSV_WORKDIR", default_value = ".")]
    workdir: PathBuf,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2CSV_PASSWORD")]
    password: Option<String>,

    /// First page to convert (1-indexed).
    #[arg(long)]
    first_page: Option<usize>,

    /// Last page to convert (inclusive).
    #[arg(long)]
    last_page: Option<usize>,

    /// OCR language: eng, fra, msa, deu, spa.
    #[arg(short, long, env = "PDF2CSV_LANG", default_value = "eng")]
    lang: OcrLanguage,

    /// Rendering DPI (72–1200).
    #[arg(long, env = "PDF2CSV_DPI", default_value_t = 500,
          value_parser = clap::value_parser!(u32).range(72..=1200))]
    dpi: u32,

    /// Page image format.
    #[arg(long, value_enum, default_value = "jpeg")]
    image_format: ImageFormatArg,

    /// Number of pages OCR'd at once.
    #[arg(short, long, env = "PDF2CSV_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Kill pdftoppm/tesseract after this many seconds.
    #[arg(long, env = "PDF2CSV_TOOL_TIMEOUT")]
    tool_timeout: Option<u64>,

    /// Skip the language-model analysis step.
    #[arg(long, env = "PDF2CSV_NO_ANALYSIS")]
    no_analysis: bool,

    /// Language model for the analysis step [default: the provider's own].
    #[arg(long, env = "PDF2CSV_MODEL")]
    model: Option<String>,

    /// Language-model provider: gemini, openai, anthropic, ollama.
    #[arg(long, env = "PDF2CSV_PROVIDER", default_value = "gemini")]
    provider: ProviderKind,

    /// Read the API key from this variable instead of the provider's default.
    #[arg(long, env = "PDF2CSV_CREDENTIAL_ENV")]
    credential_env: Option<String>,

    /// Retries on analysis failure.
    #[arg(long, env = "PDF2CSV_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Analysis call timeout in seconds.
    #[arg(long, env = "PDF2CSV_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Output structured JSON (PipelineOutput) instead of text.
    #[arg(long, env = "PDF2CSV_JSON")]
    json: bool,

    /// Disable the busy indicator.
    #[arg(long, env = "PDF2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2CSV_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ImageFormatArg {
    Jpeg,
    Png,
}

impl From<ImageFormatArg> for ImageEncoding {
    fn from(v: ImageFormatArg) -> Self {
        match v {
            ImageFormatArg::Jpeg => ImageEncoding::Jpeg,
            ImageFormatArg::Png => ImageEncoding::Png,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO-level library logs while it is active.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|cb| cb as Arc<dyn PipelineProgressCallback>);

    let config = build_config(&cli, progress_cb)?;

    // ── Run pipeline ─────────────────────────────────────────────────────
    let result = convert(&cli.input, &config).await;
    if let Some(ref s) = spinner {
        s.finish();
    }
    let output = result.context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    if !cli.quiet {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", bold("CSV Content:")).context("Failed to write to stdout")?;
        handle
            .write_all(output.csv().as_bytes())
            .context("Failed to write to stdout")?;

        if let AnalysisOutcome::Completed { ref text, .. } = output.analysis {
            writeln!(handle, "\n{}", bold("Analysis:")).context("Failed to write to stdout")?;
            writeln!(handle, "{text}").context("Failed to write to stdout")?;
        }
    }

    // An analysis failure is reported but leaves the exit status at zero.
    if let AnalysisOutcome::Failed { ref error } = output.analysis {
        eprintln!("{} Analysis failed: {}", yellow("⚠"), error);
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {} lines  {}ms  →  {}",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                yellow("⚠")
            },
            stats.ocr_pages,
            stats.rendered_pages,
            stats.csv_lines,
            stats.total_duration_ms,
            bold(&output.csv_path.display().to_string()),
        );
        for err in output.page_errors() {
            eprintln!("   {}", dim(&err.to_string()));
        }
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let analysis = AnalysisConfig {
        enabled: !cli.no_analysis,
        provider_kind: cli.provider,
        model: cli
            .model
            .clone()
            .unwrap_or_else(|| cli.provider.default_model().to_string()),
        credential_env: cli.credential_env.clone(),
        max_retries: cli.max_retries,
        api_timeout_secs: cli.api_timeout,
        ..AnalysisConfig::default()
    };

    let mut builder = PipelineConfig::builder()
        .settings_path(&cli.config)
        .workdir(&cli.workdir)
        .pages(PageSelection::from_bounds(cli.first_page, cli.last_page))
        .dpi(cli.dpi)
        .image_encoding(cli.image_format.clone().into())
        .language(cli.lang)
        .ocr_concurrency(cli.concurrency)
        .analysis(analysis);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(secs) = cli.tool_timeout {
        builder = builder.tool_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
