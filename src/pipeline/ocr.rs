//! Text recognition: hand a [`BinaryImage`] to an OCR engine.
//!
//! The engine sits behind the [`OcrBackend`] trait so the pipeline can be
//! exercised without Tesseract installed. The production backend,
//! [`TesseractCli`], runs the `tesseract` executable resolved by
//! [`OcrConfig::resolve`]; it never searches for the binary itself.
//!
//! An empty string is a normal result (a blank page). Anything that stops
//! the engine from producing output is reported as
//! [`Doc2TextError::OcrCapabilityError`] and never flattened into `""`.

use crate::config::{OcrConfig, TESSDATA_PREFIX_ENV};
use crate::error::Doc2TextError;
use crate::raster::BinaryImage;
use std::io::Write;
use std::process::{Command, Output};
use tracing::debug;

/// Abstraction over an OCR engine.
pub trait OcrBackend: Send + Sync {
    /// Short engine name for logs, e.g. `"tesseract"`.
    fn name(&self) -> &'static str;

    /// Recognise the text in `image`.
    fn recognize(&self, image: &BinaryImage) -> Result<String, Doc2TextError>;
}

/// [`OcrBackend`] that runs the Tesseract command-line program.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    config: OcrConfig,
}

impl TesseractCli {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// First line of `tesseract --version`, e.g. `"tesseract 5.3.4"`.
    pub fn version(&self) -> Result<String, Doc2TextError> {
        let output = self.run(self.command().arg("--version"))?;
        // Older releases print the banner on stderr.
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&text)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.command);
        if let Some(ref prefix) = self.config.tessdata_prefix {
            cmd.env(TESSDATA_PREFIX_ENV, prefix);
        }
        cmd
    }

    fn run(&self, cmd: &mut Command) -> Result<Output, Doc2TextError> {
        let output = cmd.output().map_err(|e| {
            let detail = if e.kind() == std::io::ErrorKind::NotFound {
                format!("executable '{}' not found", self.config.command.display())
            } else {
                format!("could not start '{}': {}", self.config.command.display(), e)
            };
            Doc2TextError::OcrCapabilityError(detail)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Doc2TextError::OcrCapabilityError(format!(
                "'{}' exited with {}: {}",
                self.config.command.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

impl OcrBackend for TesseractCli {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &BinaryImage) -> Result<String, Doc2TextError> {
        let png = image.to_png()?;

        // Unique per call, removed when `input` drops.
        let mut input = tempfile::Builder::new()
            .prefix("doc2text-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| Doc2TextError::Internal(format!("tempfile: {e}")))?;
        input
            .write_all(&png)
            .and_then(|_| input.flush())
            .map_err(|e| Doc2TextError::Internal(format!("tempfile write: {e}")))?;

        let mut cmd = self.command();
        cmd.arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language);
        if let Some(psm) = self.config.page_segmentation_mode {
            cmd.arg("--psm").arg(psm.to_string());
        }

        let output = self.run(&mut cmd)?;
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "tesseract recognised {} chars from {}x{} image",
            text.chars().count(),
            image.width(),
            image.height()
        );
        Ok(text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::CommandSource;
    use image::{GrayImage, Luma};
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn white_page() -> BinaryImage {
        BinaryImage::try_from_luma(GrayImage::from_pixel(8, 8, Luma([255]))).unwrap()
    }

    fn fake_engine(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("tesseract");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn cli(command: PathBuf, tessdata: Option<PathBuf>, psm: Option<u8>) -> TesseractCli {
        TesseractCli::new(OcrConfig {
            command,
            source: CommandSource::Explicit,
            tessdata_prefix: tessdata,
            language: "eng".into(),
            page_segmentation_mode: psm,
        })
    }

    #[test]
    fn returns_engine_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(dir.path(), "echo 'HELLO WORLD'");
        let text = cli(exe, None, None).recognize(&white_page()).unwrap();
        assert_eq!(text.trim(), "HELLO WORLD");
    }

    #[test]
    fn empty_output_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(dir.path(), "exit 0");
        assert_eq!(cli(exe, None, None).recognize(&white_page()).unwrap(), "");
    }

    #[test]
    fn passes_image_language_and_psm() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(dir.path(), r#"echo "$@"; test -s "$1" && echo has-image"#);
        let text = cli(exe, None, Some(6)).recognize(&white_page()).unwrap();
        let first = text.lines().next().unwrap();
        assert!(first.ends_with(".png stdout -l eng --psm 6"), "got: {first}");
        assert!(text.contains("has-image"), "got: {text}");
    }

    #[test]
    fn forwards_tessdata_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(dir.path(), r#"echo "$TESSDATA_PREFIX""#);
        let text = cli(exe, Some(PathBuf::from("/opt/tessdata-root")), None)
            .recognize(&white_page())
            .unwrap();
        assert_eq!(text.trim(), "/opt/tessdata-root");
    }

    #[test]
    fn nonzero_exit_is_capability_error() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(
            dir.path(),
            "echo 'Failed loading language eng' >&2; exit 1",
        );
        let err = cli(exe, None, None).recognize(&white_page()).unwrap_err();
        match err {
            Doc2TextError::OcrCapabilityError(msg) => {
                assert!(msg.contains("Failed loading language"), "got: {msg}")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_executable_is_capability_error() {
        let err = cli(PathBuf::from("/definitely/not/tesseract"), None, None)
            .recognize(&white_page())
            .unwrap_err();
        assert!(
            matches!(err, Doc2TextError::OcrCapabilityError(ref m) if m.contains("not found")),
            "got: {err:?}"
        );
    }

    #[test]
    fn version_reads_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_engine(dir.path(), "echo 'tesseract 5.3.4'; echo ' leptonica-1.84.1'");
        assert_eq!(cli(exe, None, None).version().unwrap(), "tesseract 5.3.4");
    }
}
