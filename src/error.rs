//! Error types for the doc2text library.
//!
//! Every pipeline stage raises the most specific [`Doc2TextError`] variant it
//! can detect. Callers of the orchestrator never see these directly: the
//! [`crate::extract::Extractor`] translates each variant into one
//! human-readable sentence inside [`crate::ExtractionResult::Failure`]. The
//! variants stay public so stage functions can be used (and tested) on their
//! own.

use std::path::PathBuf;
use thiserror::Error;

/// An optional engine the pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// PDFium, used to rasterise PDF pages.
    Rasterizer,
    /// Tesseract, used to recognise text.
    Ocr,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Rasterizer => write!(f, "PDF rasteriser (pdfium)"),
            Capability::Ocr => write!(f, "OCR engine (tesseract)"),
        }
    }
}

/// All errors raised inside the extraction pipeline.
#[derive(Debug, Error)]
pub enum Doc2TextError {
    // ── Document errors ───────────────────────────────────────────────────
    /// The PDF parsed fine but contains no pages.
    #[error("Document '{name}' has no pages")]
    EmptyDocument { name: String },

    /// The bytes could not be parsed as a PDF (corrupt, truncated, encrypted).
    #[error("Document '{name}' could not be opened as a PDF: {detail}")]
    UnsupportedDocument { name: String, detail: String },

    /// An optional engine is missing or could not be bound.
    #[error("{capability} is not available: {detail}")]
    CapabilityUnavailable {
        capability: Capability,
        detail: String,
    },

    // ── Image errors ──────────────────────────────────────────────────────
    /// A pixel buffer does not describe a valid raster grid.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The bytes of a raster file do not decode as a supported image format.
    #[error("Could not decode '{name}' as an image: {detail}")]
    UnreadableImage { name: String, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR engine could not run or crashed.
    #[error("OCR engine failed: {0}")]
    OcrCapabilityError(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read the input file from disk.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not persist the normalised image artifact.
    #[error("Failed to write normalised image to '{path}': {detail}")]
    ArtifactWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Doc2TextError {
    /// `true` when the failure comes from a missing or broken engine rather
    /// than from the document itself.
    pub fn is_capability_failure(&self) -> bool {
        matches!(
            self,
            Doc2TextError::CapabilityUnavailable { .. } | Doc2TextError::OcrCapabilityError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_display() {
        let e = Doc2TextError::EmptyDocument {
            name: "scan.pdf".into(),
        };
        assert_eq!(e.to_string(), "Document 'scan.pdf' has no pages");
    }

    #[test]
    fn capability_display_names_engine() {
        let e = Doc2TextError::CapabilityUnavailable {
            capability: Capability::Rasterizer,
            detail: "libpdfium.so not found".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("pdfium"), "got: {msg}");
        assert!(msg.contains("libpdfium.so not found"), "got: {msg}");
    }

    #[test]
    fn capability_failures_are_classified() {
        assert!(Doc2TextError::OcrCapabilityError("exit 1".into()).is_capability_failure());
        assert!(Doc2TextError::CapabilityUnavailable {
            capability: Capability::Ocr,
            detail: String::new(),
        }
        .is_capability_failure());
        assert!(!Doc2TextError::InvalidImage("0x0".into()).is_capability_failure());
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error as _;
        let e = Doc2TextError::Io {
            path: PathBuf::from("/nope"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/nope"));
    }
}
