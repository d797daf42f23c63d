//! Configuration types for document-to-text extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Engine discovery (where the Tesseract
//! executable and its language data live) is a separate, one-shot step:
//! [`OcrConfig::resolve`] turns an `ExtractionConfig` plus the process
//! environment into an immutable value that the OCR backend receives at
//! construction. Nothing on the per-document path probes the file system for
//! engines.

use crate::error::Doc2TextError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit Tesseract executable.
pub const TESSERACT_CMD_ENV: &str = "TESSERACT_CMD";

/// Environment variable Tesseract reads to locate `tessdata/`.
pub const TESSDATA_PREFIX_ENV: &str = "TESSDATA_PREFIX";

/// Environment variable naming an explicit PDFium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Install locations checked on Windows when nothing else is configured.
const WINDOWS_TESSERACT_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    r"D:\tesseract\tesseract.exe",
];

/// Configuration for a document-to-text extractor.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use doc2text::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .language("eng+deu")
///     .build()
///     .unwrap();
/// assert_eq!(config.language, "eng+deu");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Resolution used when rasterising the first PDF page. Range: 72–600. Default: 300.
    ///
    /// Tesseract is trained on glyphs around 300 DPI; lower values lose
    /// small print, higher values mostly cost memory.
    pub dpi: u32,

    /// Maximum rendered width or height in pixels. Default: 6000.
    ///
    /// 300 DPI on an A0 page would be ~10 000 × 14 000 px. The cap scales
    /// the longest edge down so the page always fits in memory.
    pub max_rendered_pixels: u32,

    /// Tesseract language code(s), e.g. `"eng"` or `"eng+fra"`. Default: `"eng"`.
    pub language: String,

    /// Tesseract page segmentation mode (`--psm`, 0–13). Default: engine default.
    pub page_segmentation_mode: Option<u8>,

    /// Explicit Tesseract executable. Skips discovery when set.
    pub tesseract_cmd: Option<PathBuf>,

    /// Explicit `TESSDATA_PREFIX` handed to the Tesseract process.
    pub tessdata_prefix: Option<PathBuf>,

    /// Explicit PDFium shared library. Falls back to `PDFIUM_LIB_PATH`, then
    /// the system library search path.
    pub pdfium_library: Option<PathBuf>,

    /// Directory where each normalised image is written for diagnostics.
    /// `None` disables the artifact entirely.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 6000,
            language: "eng".to_string(),
            page_segmentation_mode: None,
            tesseract_cmd: None,
            tessdata_prefix: None,
            pdfium_library: None,
            artifact_dir: None,
        }
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the ranges the builder enforces.
    ///
    /// Fields are public, so a config written as a struct literal skips the
    /// builder; engines call this before trusting it.
    pub fn validate(&self) -> Result<(), Doc2TextError> {
        if self.dpi < 72 || self.dpi > 600 {
            return Err(Doc2TextError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                self.dpi
            )));
        }
        if self.max_rendered_pixels < 100 {
            return Err(Doc2TextError::InvalidConfig(format!(
                "Maximum rendered size must be at least 100 px, got {}",
                self.max_rendered_pixels
            )));
        }
        let lang = &self.language;
        if lang.is_empty() || lang.chars().any(char::is_whitespace) {
            return Err(Doc2TextError::InvalidConfig(format!(
                "Language must be a non-empty tesseract code like 'eng' or 'eng+fra', got {:?}",
                self.language
            )));
        }
        if let Some(psm) = self.page_segmentation_mode {
            if psm > 13 {
                return Err(Doc2TextError::InvalidConfig(format!(
                    "Page segmentation mode must be 0–13, got {psm}"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn page_segmentation_mode(mut self, psm: u8) -> Self {
        self.config.page_segmentation_mode = Some(psm);
        self
    }

    pub fn tesseract_cmd(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_cmd = Some(path.into());
        self
    }

    pub fn tessdata_prefix(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tessdata_prefix = Some(path.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.artifact_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Doc2TextError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── OCR engine discovery ─────────────────────────────────────────────────

/// Where the Tesseract executable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    /// Set explicitly in [`ExtractionConfig::tesseract_cmd`].
    Explicit,
    /// Taken from the `TESSERACT_CMD` environment variable.
    Environment,
    /// Found in a well-known install directory.
    InstallDir,
    /// Bare `tesseract`, left to the `PATH` lookup of the OS.
    SearchPath,
}

/// Immutable Tesseract settings, resolved once before the pipeline is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Executable to spawn.
    pub command: PathBuf,
    /// How `command` was discovered.
    pub source: CommandSource,
    /// Value for `TESSDATA_PREFIX` in the child environment, if any.
    pub tessdata_prefix: Option<PathBuf>,
    /// Language code(s) passed via `-l`.
    pub language: String,
    /// `--psm` value, if any.
    pub page_segmentation_mode: Option<u8>,
}

impl OcrConfig {
    /// Resolve the Tesseract executable and data directory.
    ///
    /// Order for the executable: explicit config, `TESSERACT_CMD` (only when
    /// the file exists), well-known Windows install paths, then bare
    /// `tesseract` on `PATH`. `TESSDATA_PREFIX` is taken from config, then
    /// the environment, then derived from the executable's directory when it
    /// contains a `tessdata/` folder.
    pub fn resolve(config: &ExtractionConfig) -> Self {
        Self::resolve_with(config, |key| std::env::var_os(key), cfg!(windows))
    }

    fn resolve_with(
        config: &ExtractionConfig,
        env: impl Fn(&str) -> Option<OsString>,
        windows: bool,
    ) -> Self {
        let (command, source) = if let Some(ref explicit) = config.tesseract_cmd {
            (explicit.clone(), CommandSource::Explicit)
        } else if let Some(from_env) = env(TESSERACT_CMD_ENV)
            .map(PathBuf::from)
            .filter(|p| p.is_file())
        {
            (from_env, CommandSource::Environment)
        } else if let Some(installed) = windows
            .then(|| {
                WINDOWS_TESSERACT_PATHS
                    .iter()
                    .map(PathBuf::from)
                    .find(|p| p.is_file())
            })
            .flatten()
        {
            (installed, CommandSource::InstallDir)
        } else {
            (PathBuf::from("tesseract"), CommandSource::SearchPath)
        };

        let tessdata_prefix = config
            .tessdata_prefix
            .clone()
            .or_else(|| env(TESSDATA_PREFIX_ENV).map(PathBuf::from))
            .or_else(|| match source {
                CommandSource::SearchPath => None,
                _ => tessdata_beside(&command),
            });

        debug!(
            "Resolved tesseract: {} ({:?}), tessdata: {:?}",
            command.display(),
            source,
            tessdata_prefix
        );

        Self {
            command,
            source,
            tessdata_prefix,
            language: config.language.clone(),
            page_segmentation_mode: config.page_segmentation_mode,
        }
    }
}

/// The executable's directory, if it holds a `tessdata/` folder.
fn tessdata_beside(command: &Path) -> Option<PathBuf> {
    let base = command.parent()?;
    base.join("tessdata").is_dir().then(|| base.to_path_buf())
}
