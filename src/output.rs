//! Result types returned by the extractor.

use crate::pipeline::input::DocumentKind;
use crate::progress::Stage;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of one extraction: recognised text or a reason it failed.
///
/// Only [`crate::Extractor`] constructs these; every internal failure has
/// already been turned into a readable sentence by the time a caller sees
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    /// Text recognised on the page. May be empty for a blank page.
    Success { text: String },
    /// Why no text was produced.
    Failure { reason: String },
}

impl ExtractionResult {
    pub(crate) fn success(text: String) -> Self {
        ExtractionResult::Success { text }
    }

    pub(crate) fn failure(reason: String) -> Self {
        ExtractionResult::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractionResult::Success { text } => Some(text),
            ExtractionResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ExtractionResult::Success { .. } => None,
            ExtractionResult::Failure { reason } => Some(reason),
        }
    }

    /// Split into `(text, error)`; exactly one side is `Some`.
    pub fn into_parts(self) -> (Option<String>, Option<String>) {
        match self {
            ExtractionResult::Success { text } => (Some(text), None),
            ExtractionResult::Failure { reason } => (None, Some(reason)),
        }
    }
}

/// An [`ExtractionResult`] plus what happened along the way.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    pub result: ExtractionResult,
    /// Kind detected from the declared filename.
    pub kind: DocumentKind,
    /// Last stage reached; `Done` on success, `Errored` otherwise.
    pub final_stage: Stage,
    /// Last stage reached before the failure.
    pub failed_at: Option<Stage>,
    /// Otsu threshold chosen for the page, once normalisation ran.
    pub threshold: Option<u8>,
    /// Where the normalised image was written, if an artifact dir is set.
    pub artifact_path: Option<PathBuf>,
    /// Wall-clock time for the whole request.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_parts() {
        let r = ExtractionResult::success("HELLO\n".into());
        assert!(r.is_success());
        assert_eq!(r.text(), Some("HELLO\n"));
        assert_eq!(r.error(), None);
        assert_eq!(r.into_parts(), (Some("HELLO\n".to_string()), None));
    }

    #[test]
    fn empty_text_is_still_success() {
        let r = ExtractionResult::success(String::new());
        assert!(r.is_success());
        assert_eq!(r.text(), Some(""));
    }

    #[test]
    fn failure_parts() {
        let r = ExtractionResult::failure("The uploaded PDF has no pages.".into());
        assert!(!r.is_success());
        assert_eq!(r.text(), None);
        let (text, err) = r.into_parts();
        assert!(text.is_none());
        assert_eq!(err.as_deref(), Some("The uploaded PDF has no pages."));
    }

    #[test]
    fn serialises_with_status_tag() {
        let json = serde_json::to_value(ExtractionResult::success("hi".into())).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["text"], "hi");
        let json = serde_json::to_value(ExtractionResult::failure("nope".into())).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["reason"], "nope");
    }
}
