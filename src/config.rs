//! Configuration types for a PDF-to-CSV run.
//!
//! Every option of a run (password, page selection, OCR language, analysis
//! settings) lives in one [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Tool locations are not part of it; they come
//! from the settings file (see [`crate::settings`]) unless a caller injects
//! pre-loaded [`ToolSettings`].

use crate::error::Pdf2CsvError;
use crate::progress::ProgressCallback;
use crate::settings::{ToolSettings, DEFAULT_SETTINGS_FILE};
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for a PDF-to-CSV run.
///
/// # Example
/// ```rust
/// use pdf2csv::{OcrLanguage, PageSelection, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .language(OcrLanguage::French)
///     .pages(PageSelection::Range(2, 4))
///     .workdir("out")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Path of the INI settings file. Default: `config.ini`.
    pub settings_path: PathBuf,

    /// Pre-loaded tool locations. Takes precedence over `settings_path`.
    pub tools: Option<ToolSettings>,

    /// Directory receiving every artifact of the run. Default: `.`.
    ///
    /// Artifact names are fixed (`page_1.jpg`, `output.csv`, …), so two runs
    /// sharing a directory overwrite each other. Give concurrent runs their
    /// own directory.
    pub workdir: PathBuf,

    /// PDF user password. Empty is treated the same as `None`.
    pub password: Option<String>,

    /// Pages to rasterize. Default: all pages.
    pub pages: PageSelection,

    /// Rasterization DPI. Range: 72–1200. Default: 500.
    pub dpi: u32,

    /// Encoding of the rasterized page images. Default: JPEG.
    pub image_encoding: ImageEncoding,

    /// OCR language. Default: English.
    pub language: OcrLanguage,

    /// Number of pages OCR'd at once. Default: 1 (strictly sequential).
    pub ocr_concurrency: usize,

    /// Per-invocation timeout for `pdftoppm` / `tesseract`, in seconds.
    /// `None` (default) waits indefinitely.
    pub tool_timeout_secs: Option<u64>,

    /// Language-model analysis settings.
    pub analysis: AnalysisConfig,

    /// Receives stage and page events while the run progresses.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from(DEFAULT_SETTINGS_FILE),
            tools: None,
            workdir: PathBuf::from("."),
            password: None,
            pages: PageSelection::default(),
            dpi: 500,
            image_encoding: ImageEncoding::default(),
            language: OcrLanguage::default(),
            ocr_concurrency: 1,
            tool_timeout_secs: None,
            analysis: AnalysisConfig::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("settings_path", &self.settings_path)
            .field("tools", &self.tools)
            .field("workdir", &self.workdir)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("dpi", &self.dpi)
            .field("image_encoding", &self.image_encoding)
            .field("language", &self.language)
            .field("ocr_concurrency", &self.ocr_concurrency)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("analysis", &self.analysis)
            .finish()
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// The password to hand to the rasterizer, if any.
    pub fn effective_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Builder for [`PipelineConfig`].
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.settings_path = path.into();
        self
    }

    pub fn tools(mut self, tools: ToolSettings) -> Self {
        self.config.tools = Some(tools);
        self
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workdir = dir.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn image_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.config.image_encoding = encoding;
        self
    }

    pub fn language(mut self, language: OcrLanguage) -> Self {
        self.config.language = language;
        self
    }

    pub fn ocr_concurrency(mut self, n: usize) -> Self {
        self.config.ocr_concurrency = n.max(1);
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = Some(secs);
        self
    }

    pub fn analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.config.analysis = analysis;
        self
    }

    /// Turn the language-model step on or off without touching its other settings.
    pub fn analysis_enabled(mut self, enabled: bool) -> Self {
        self.config.analysis.enabled = enabled;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Pdf2CsvError> {
        let c = &self.config;
        if !(72..=1200).contains(&c.dpi) {
            return Err(Pdf2CsvError::InvalidConfig(format!(
                "DPI must be 72–1200, got {}",
                c.dpi
            )));
        }
        if c.ocr_concurrency == 0 {
            return Err(Pdf2CsvError::InvalidConfig(
                "OCR concurrency must be ≥ 1".into(),
            ));
        }
        c.pages.validate()?;
        if c.analysis.model.trim().is_empty() {
            return Err(Pdf2CsvError::InvalidConfig(
                "Analysis model must not be empty".into(),
            ));
        }
        if c.analysis.max_retries > MAX_ANALYSIS_RETRIES {
            return Err(Pdf2CsvError::InvalidConfig(format!(
                "Analysis retries must be ≤ {MAX_ANALYSIS_RETRIES}, got {}",
                c.analysis.max_retries
            )));
        }
        if c.analysis.credential_env.is_some() && c.analysis.provider_kind.credential_env().is_none() {
            return Err(Pdf2CsvError::InvalidConfig(format!(
                "Provider '{}' takes no API key; remove the credential variable",
                c.analysis.provider_kind
            )));
        }
        Ok(self.config)
    }
}

// ── Analysis settings ────────────────────────────────────────────────────

/// Upper bound for [`AnalysisConfig::max_retries`].
pub const MAX_ANALYSIS_RETRIES: u32 = 10;

/// Settings for the optional language-model cleanup step.
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Run the analysis step at all. Default: true.
    pub enabled: bool,

    /// Chat service to call. Default: [`ProviderKind::Gemini`].
    pub provider_kind: ProviderKind,

    /// Model identifier. Default: `gemini-1.5-flash`.
    pub model: String,

    /// Environment variable holding the service key, overriding the
    /// provider's own (see [`ProviderKind::credential_env`]). Only valid for
    /// providers that take a key.
    pub credential_env: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_kind` and
    /// skips the credential check.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    pub max_tokens: usize,

    /// Retries on a failed call, with exponential backoff. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds. Default: 500.
    pub retry_backoff_ms: u64,

    /// Timeout for one call, in seconds. Default: 120.
    pub api_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider_kind: ProviderKind::Gemini,
            model: ProviderKind::Gemini.default_model().to_string(),
            credential_env: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 8192,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("enabled", &self.enabled)
            .field("provider_kind", &self.provider_kind)
            .field("model", &self.model)
            .field("credential_env", &self.credential_env)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Variable the key is read from: the override if set, else the
    /// provider's own. `None` for keyless providers.
    pub fn credential_var(&self) -> Option<&str> {
        match self.credential_env {
            Some(ref var) => Some(var.as_str()),
            None => self.provider_kind.credential_env(),
        }
    }
}

/// Chat services the analysis step can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    /// Local Ollama server; takes no key.
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Gemini,
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::Ollama,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Conventional key variable, or `None` when the service needs no key.
    pub fn credential_env(self) -> Option<&'static str> {
        match self {
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    /// Model used when none is given.
    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
            ProviderKind::Ollama => "llama3.2",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Pdf2CsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Pdf2CsvError::InvalidConfig(format!(
                    "Unknown analysis provider '{name}'. Supported: {}",
                    Self::ALL.map(ProviderKind::as_str).join(", ")
                ))
            })
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// OCR languages offered to the user, mapped to Tesseract language codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OcrLanguage {
    #[default]
    #[serde(rename = "eng")]
    English,
    #[serde(rename = "fra")]
    French,
    #[serde(rename = "msa")]
    Malay,
    #[serde(rename = "deu")]
    German,
    #[serde(rename = "spa")]
    Spanish,
}

impl OcrLanguage {
    pub const ALL: [OcrLanguage; 5] = [
        OcrLanguage::English,
        OcrLanguage::French,
        OcrLanguage::Malay,
        OcrLanguage::German,
        OcrLanguage::Spanish,
    ];

    /// Tesseract traineddata code passed to `-l`.
    pub fn code(self) -> &'static str {
        match self {
            OcrLanguage::English => "eng",
            OcrLanguage::French => "fra",
            OcrLanguage::Malay => "msa",
            OcrLanguage::German => "deu",
            OcrLanguage::Spanish => "spa",
        }
    }

    fn supported_codes() -> String {
        Self::ALL.map(OcrLanguage::code).join(", ")
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OcrLanguage {
    type Err = Pdf2CsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| Pdf2CsvError::UnsupportedLanguage {
                code: code.to_string(),
                hint: format!("Supported: {}", Self::supported_codes()),
            })
    }
}

/// Image format of the rasterized pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    #[default]
    Jpeg,
    Png,
}

impl ImageEncoding {
    /// File extension pdftoppm uses for this encoding.
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "jpg",
            ImageEncoding::Png => "png",
        }
    }

    /// pdftoppm output-format flag.
    pub fn pdftoppm_flag(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "-jpeg",
            ImageEncoding::Png => "-png",
        }
    }
}

/// Specifies which pages of the PDF to rasterize (1-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// From this page to the end of the document.
    From(usize),
    /// From the first page up to and including this page.
    Until(usize),
    /// A contiguous inclusive range `first..=last`.
    Range(usize, usize),
}

impl PageSelection {
    /// Combine optional first/last bounds as entered by the user.
    pub fn from_bounds(first: Option<usize>, last: Option<usize>) -> Self {
        match (first, last) {
            (None, None) => PageSelection::All,
            (Some(f), None) => PageSelection::From(f),
            (None, Some(l)) => PageSelection::Until(l),
            (Some(f), Some(l)) => PageSelection::Range(f, l),
        }
    }

    /// First page to render, if bounded.
    pub fn first(&self) -> Option<usize> {
        match *self {
            PageSelection::From(f) | PageSelection::Range(f, _) => Some(f),
            _ => None,
        }
    }

    /// Last page to render, if bounded.
    pub fn last(&self) -> Option<usize> {
        match *self {
            PageSelection::Until(l) | PageSelection::Range(_, l) => Some(l),
            _ => None,
        }
    }

    /// Number of pages the selection covers when both bounds are known.
    pub fn len(&self) -> Option<usize> {
        match *self {
            PageSelection::Range(f, l) if f <= l => Some(l - f + 1),
            _ => None,
        }
    }

    /// Reject zero page numbers and inverted ranges.
    pub fn validate(&self) -> Result<(), Pdf2CsvError> {
        for p in [self.first(), self.last()].into_iter().flatten() {
            if p < 1 {
                return Err(Pdf2CsvError::InvalidConfig(format!(
                    "Pages are 1-indexed, minimum is 1 (got {p})"
                )));
            }
        }
        if let PageSelection::Range(f, l) = *self {
            if f > l {
                return Err(Pdf2CsvError::InvalidConfig(format!(
                    "Invalid page range {f}-{l}: first must be <= last"
                )));
            }
        }
        Ok(())
    }
}
