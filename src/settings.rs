//! Tool-location settings loaded from a local INI file.
//!
//! The file is plain INI:
//!
//! ```ini
//! [settings]
//! PopplerPath = /usr/bin
//! TesseractPath = /usr/bin/tesseract
//! ```
//!
//! Section and key names match case-insensitively, `=` and `:` both separate
//! a key from its value, and lines starting with `#` or `;` are comments.
//! An empty value means "look the tool up on `PATH`".

use crate::error::Pdf2CsvError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Conventional name of the settings file, resolved against the current directory.
pub const DEFAULT_SETTINGS_FILE: &str = "config.ini";

const SECTION: &str = "settings";
const POPPLER_KEY: &str = "PopplerPath";
const TESSERACT_KEY: &str = "TesseractPath";

/// Locations of the external rasterizer and OCR engine.
///
/// Loaded once per run and passed explicitly to the adapters that need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Poppler location: the directory holding `pdftoppm`, or the binary itself.
    pub poppler_path: PathBuf,
    /// Tesseract location: the binary itself, or its directory.
    pub tesseract_path: PathBuf,
}

impl ToolSettings {
    pub fn new(poppler_path: impl Into<PathBuf>, tesseract_path: impl Into<PathBuf>) -> Self {
        Self {
            poppler_path: poppler_path.into(),
            tesseract_path: tesseract_path.into(),
        }
    }

    /// Read and parse the settings file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Pdf2CsvError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Pdf2CsvError::ConfigNotFound {
                path: path.to_path_buf(),
            },
            _ => Pdf2CsvError::io(path, e),
        })?;
        let settings = Self::parse(&contents, path)?;
        debug!(
            "Loaded tool settings from {}: poppler={}, tesseract={}",
            path.display(),
            settings.poppler_path.display(),
            settings.tesseract_path.display()
        );
        Ok(settings)
    }

    /// Parse settings from INI text. `origin` is only used in error messages.
    pub fn parse(contents: &str, origin: &Path) -> Result<Self, Pdf2CsvError> {
        let missing = |key: &str| Pdf2CsvError::ConfigKeyMissing {
            path: origin.to_path_buf(),
            section: SECTION.to_string(),
            key: key.to_string(),
        };

        let poppler = lookup(contents, SECTION, POPPLER_KEY).ok_or_else(|| missing(POPPLER_KEY))?;
        let tesseract =
            lookup(contents, SECTION, TESSERACT_KEY).ok_or_else(|| missing(TESSERACT_KEY))?;

        Ok(Self::new(poppler, tesseract))
    }
}

/// Find `key` inside `[section]`. Later duplicates win.
fn lookup(contents: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;
    let mut found = None;

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim().eq_ignore_ascii_case(section);
            continue;
        }

        if !in_section {
            continue;
        }

        let Some(split) = line.find(['=', ':']) else {
            continue;
        };
        // A Windows drive letter ("C:\...") only ever appears after the
        // delimiter, so the first '=' or ':' is always the key boundary.
        let (k, v) = line.split_at(split);
        if k.trim().eq_ignore_ascii_case(key) {
            found = Some(strip_quotes(v[1..].trim()).to_string());
        }
    }

    found
}

fn strip_quotes(v: &str) -> &str {
    v.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(v)
}
