//! The orchestrator: route a document through the pipeline and translate
//! failures into user-facing messages.
//!
//! [`Extractor`] owns the engines (resolved once, at construction) and runs
//! each request synchronously, stage by stage. It does no image math of its
//! own. Every error a stage raises is caught here and turned into a single
//! sentence by [`describe_failure`]; callers only ever see an
//! [`ExtractionResult`].

use crate::config::{ExtractionConfig, OcrConfig};
use crate::error::{Capability, Doc2TextError};
use crate::output::{ExtractionReport, ExtractionResult};
use crate::pipeline::artifact::ArtifactStore;
use crate::pipeline::input::{self, Document, DocumentKind};
use crate::pipeline::normalize;
use crate::pipeline::ocr::{OcrBackend, TesseractCli};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use crate::progress::{NoopObserver, SharedObserver, Stage};
use crate::raster::RasterImage;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs the document-to-text pipeline.
///
/// Cheap to share: wrap it in an [`Arc`] and call [`Extractor::extract`]
/// from as many threads as needed. Requests share no mutable state.
///
/// # Example
/// ```rust,no_run
/// use doc2text::{Document, ExtractionConfig, Extractor};
///
/// let extractor = Extractor::from_config(ExtractionConfig::default()).unwrap();
/// let doc = Document::new(std::fs::read("scan.png").unwrap(), "scan.png");
/// match extractor.extract(&doc).into_parts() {
///     (Some(text), None) => println!("{text}"),
///     (None, Some(error)) => eprintln!("{error}"),
///     _ => unreachable!(),
/// }
/// ```
pub struct Extractor {
    config: ExtractionConfig,
    rasterizer: Option<Arc<dyn Rasterizer>>,
    rasterizer_missing: Option<String>,
    ocr: Arc<dyn OcrBackend>,
    artifacts: Option<ArtifactStore>,
    observer: SharedObserver,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .field("supports_pdf", &self.supports_pdf())
            .field("ocr", &self.ocr.name())
            .field("artifacts", &self.artifacts)
            .finish()
    }
}

impl Extractor {
    /// Resolve the Tesseract executable and probe for PDFium, once.
    ///
    /// A missing PDFium is not an error here: the extractor still serves
    /// images, and PDF uploads fail with setup instructions.
    ///
    /// # Errors
    /// [`Doc2TextError::InvalidConfig`] when `config` is out of range, which
    /// can happen when it was written as a struct literal instead of going
    /// through [`ExtractionConfig::builder`].
    pub fn from_config(config: ExtractionConfig) -> Result<Self, Doc2TextError> {
        config.validate()?;
        let ocr = Arc::new(TesseractCli::new(OcrConfig::resolve(&config)));
        let (rasterizer, rasterizer_missing) = match PdfiumRasterizer::probe(&config) {
            Ok(r) => (Some(Arc::new(r) as Arc<dyn Rasterizer>), None),
            Err(e) => {
                warn!("PDF support disabled: {}", e);
                (None, Some(e.to_string()))
            }
        };
        Ok(Self::assemble(config, rasterizer, rasterizer_missing, ocr))
    }

    /// Build an extractor around caller-supplied engines.
    ///
    /// Pass `None` for `rasterizer` to run without PDF support.
    pub fn with_engines(
        config: ExtractionConfig,
        rasterizer: Option<Arc<dyn Rasterizer>>,
        ocr: Arc<dyn OcrBackend>,
    ) -> Self {
        let missing = rasterizer
            .is_none()
            .then(|| "no rasteriser configured".to_string());
        Self::assemble(config, rasterizer, missing, ocr)
    }

    fn assemble(
        config: ExtractionConfig,
        rasterizer: Option<Arc<dyn Rasterizer>>,
        rasterizer_missing: Option<String>,
        ocr: Arc<dyn OcrBackend>,
    ) -> Self {
        let artifacts = config.artifact_dir.as_ref().map(ArtifactStore::new);
        Self {
            config,
            rasterizer,
            rasterizer_missing,
            ocr,
            artifacts,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Receive stage transitions for every request.
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Whether PDF uploads can be rasterised.
    pub fn supports_pdf(&self) -> bool {
        self.rasterizer.is_some()
    }

    /// Why PDF support is off, when it is.
    pub fn pdf_unavailable_reason(&self) -> Option<&str> {
        self.rasterizer_missing.as_deref()
    }

    /// Extract text from one document.
    pub fn extract(&self, document: &Document) -> ExtractionResult {
        self.extract_detailed(document).result
    }

    /// Read `path` and extract text from it.
    ///
    /// `name` overrides the filename used for kind detection; by default the
    /// file's own name is used. Read failures come back as a `Failure`.
    pub fn extract_file(&self, path: &Path, name: Option<&str>) -> ExtractionResult {
        match Document::from_path(path, name) {
            Ok(doc) => self.extract(&doc),
            Err(e) => {
                warn!("{}", e);
                ExtractionResult::failure(describe_failure(&e))
            }
        }
    }

    /// Run [`Extractor::extract`] on tokio's blocking pool.
    pub async fn extract_async(self: Arc<Self>, document: Document) -> ExtractionResult {
        tokio::task::spawn_blocking(move || self.extract(&document))
            .await
            .unwrap_or_else(|e| {
                let err = Doc2TextError::Internal(format!("Extraction task panicked: {}", e));
                ExtractionResult::failure(describe_failure(&err))
            })
    }

    /// Extract text and report what each stage did.
    pub fn extract_detailed(&self, document: &Document) -> ExtractionReport {
        let started = Instant::now();
        info!(
            "Extracting text from '{}' ({} bytes)",
            document.name,
            document.content.len()
        );

        let mut run = Run {
            stage: Stage::Start,
            observer: &self.observer,
            threshold: None,
            artifact_path: None,
        };
        run.observer.on_stage(Stage::Start);

        let kind = input::detect_kind(&document.name);
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.run_stages(&mut run, document, kind)))
                .unwrap_or_else(|payload| Err(Doc2TextError::Internal(panic_message(payload))));

        let duration_ms = started.elapsed().as_millis() as u64;
        let (result, failed_at) = match outcome {
            Ok(text) => {
                let char_count = text.chars().count();
                run.advance(Stage::Done);
                self.observer.on_success(char_count);
                info!(
                    "Extracted {} chars from '{}' in {}ms",
                    char_count,
                    document.name,
                    duration_ms
                );
                (ExtractionResult::success(text), None)
            }
            Err(e) => {
                let failed_at = run.stage;
                let reason = describe_failure(&e);
                warn!(
                    "Extraction of '{}' failed after stage '{}': {}",
                    document.name, failed_at, e
                );
                run.advance(Stage::Errored);
                self.observer.on_failure(failed_at, &reason);
                (ExtractionResult::failure(reason), Some(failed_at))
            }
        };

        ExtractionReport {
            result,
            kind,
            final_stage: run.stage,
            failed_at,
            threshold: run.threshold,
            artifact_path: run.artifact_path,
            duration_ms,
        }
    }

    fn run_stages(
        &self,
        run: &mut Run<'_>,
        document: &Document,
        kind: DocumentKind,
    ) -> Result<String, Doc2TextError> {
        debug!("'{}' detected as {:?}", document.name, kind);
        run.advance(Stage::TypeDetected);

        let raster = self.load(run, document, kind)?;

        let binary = normalize::normalize(&raster)?;
        drop(raster);
        run.threshold = Some(binary.threshold());
        run.advance(Stage::Normalized);

        if let Some(ref store) = self.artifacts {
            run.artifact_path = Some(store.save(&binary)?);
        }

        let text = self.ocr.recognize(&binary)?;
        run.advance(Stage::Extracted);
        Ok(text)
    }

    fn load(
        &self,
        run: &mut Run<'_>,
        document: &Document,
        kind: DocumentKind,
    ) -> Result<RasterImage, Doc2TextError> {
        match kind {
            DocumentKind::PdfDocument => {
                let rasterizer =
                    self.rasterizer
                        .as_ref()
                        .ok_or_else(|| Doc2TextError::CapabilityUnavailable {
                            capability: Capability::Rasterizer,
                            detail: self
                                .rasterizer_missing
                                .clone()
                                .unwrap_or_else(|| "not configured".into()),
                        })?;
                let raster = rasterizer.rasterize_first_page(document)?;
                run.advance(Stage::Rasterized);
                Ok(raster)
            }
            // Unknown extensions get a decode attempt rather than a
            // rejection; see `pipeline::input`.
            DocumentKind::RasterFile | DocumentKind::Unrecognized => {
                let raster = input::decode_raster(document)?;
                run.advance(Stage::LoadedDirectly);
                Ok(raster)
            }
        }
    }
}

/// Per-request state; dropped when the request finishes.
struct Run<'a> {
    stage: Stage,
    observer: &'a SharedObserver,
    threshold: Option<u8>,
    artifact_path: Option<PathBuf>,
}

impl Run<'_> {
    fn advance(&mut self, stage: Stage) {
        debug!("stage: {} → {}", self.stage, stage);
        self.stage = stage;
        self.observer.on_stage(stage);
    }
}

/// Turn a pipeline error into the message shown to the uploader.
///
/// Engine problems get setup instructions, document problems get a hint
/// about what to upload instead, and anything unexpected is reported as
/// `"Processing failed: <cause>"`.
pub fn describe_failure(err: &Doc2TextError) -> String {
    match err {
        Doc2TextError::EmptyDocument { .. } => "The uploaded PDF has no pages.".to_string(),
        Doc2TextError::UnsupportedDocument { detail, .. } => format!(
            "The uploaded PDF could not be read ({detail}). \
             Please upload a valid, unencrypted PDF or an image (PNG/JPG)."
        ),
        Doc2TextError::CapabilityUnavailable {
            capability: Capability::Rasterizer,
            ..
        } => "PDF support requires the PDFium library. Install libpdfium on the system \
              library path or set PDFIUM_LIB_PATH to its location, then restart."
            .to_string(),
        Doc2TextError::CapabilityUnavailable {
            capability: Capability::Ocr,
            detail,
        }
        | Doc2TextError::OcrCapabilityError(detail) => format!(
            "Text recognition is unavailable: {detail}. Install Tesseract OCR, or set \
             TESSERACT_CMD (and TESSDATA_PREFIX if needed) to an existing installation."
        ),
        Doc2TextError::InvalidImage(_) | Doc2TextError::UnreadableImage { .. } => {
            "Failed to read the uploaded file. Please upload a valid image (PNG/JPG) or a PDF."
                .to_string()
        }
        other => format!("Processing failed: {other}"),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("pipeline panicked: {msg}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{BinaryImage, ChannelLayout};
    use image::{DynamicImage, GrayImage, Luma};
    use std::io::Cursor;
    use std::sync::Mutex;

    struct EchoOcr(&'static str);

    impl OcrBackend for EchoOcr {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn recognize(&self, _image: &BinaryImage) -> Result<String, Doc2TextError> {
            Ok(self.0.to_string())
        }
    }

    struct PanickingOcr;

    impl OcrBackend for PanickingOcr {
        fn name(&self) -> &'static str {
            "panic"
        }

        fn recognize(&self, _image: &BinaryImage) -> Result<String, Doc2TextError> {
            panic!("engine blew up")
        }
    }

    struct GrayPage;

    impl Rasterizer for GrayPage {
        fn rasterize_first_page(&self, _document: &Document) -> Result<RasterImage, Doc2TextError> {
            RasterImage::new(2, 1, ChannelLayout::Luma, vec![0, 255])
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Stage>>);

    impl crate::progress::StageObserver for Recorder {
        fn on_stage(&self, stage: Stage) {
            self.0.lock().unwrap().push(stage);
        }
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::from_fn(w, h, |x, _| Luma([(x * 40) as u8])))
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn image_path_visits_stages_in_order() {
        let recorder = Arc::new(Recorder::default());
        let ex = Extractor::with_engines(
            ExtractionConfig::default(),
            None,
            Arc::new(EchoOcr("ok")),
        )
        .with_observer(recorder.clone());

        let report = ex.extract_detailed(&Document::new(png(6, 2), "scan.png"));
        assert_eq!(report.result.text(), Some("ok"));
        assert_eq!(report.final_stage, Stage::Done);
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                Stage::Start,
                Stage::TypeDetected,
                Stage::LoadedDirectly,
                Stage::Normalized,
                Stage::Extracted,
                Stage::Done
            ]
        );
        assert!(report.threshold.is_some());
    }

    #[test]
    fn pdf_path_goes_through_rasterizer() {
        let recorder = Arc::new(Recorder::default());
        let ex = Extractor::with_engines(
            ExtractionConfig::default(),
            Some(Arc::new(GrayPage)),
            Arc::new(EchoOcr("from pdf")),
        )
        .with_observer(recorder.clone());

        let result = ex.extract(&Document::new(b"%PDF-1.7".to_vec(), "Form.PDF"));
        assert_eq!(result.text(), Some("from pdf"));
        assert!(recorder.0.lock().unwrap().contains(&Stage::Rasterized));
    }

    #[test]
    fn failure_records_the_stage_it_happened_in() {
        let ex = Extractor::with_engines(
            ExtractionConfig::default(),
            None,
            Arc::new(EchoOcr("unused")),
        );
        let report = ex.extract_detailed(&Document::new(b"garbage".to_vec(), "x.png"));
        assert_eq!(report.final_stage, Stage::Errored);
        assert_eq!(report.failed_at, Some(Stage::TypeDetected));
        assert!(report.threshold.is_none());
    }

    #[test]
    fn panicking_engine_becomes_failure() {
        let ex = Extractor::with_engines(ExtractionConfig::default(), None, Arc::new(PanickingOcr));
        let result = ex.extract(&Document::new(png(4, 4), "a.png"));
        let reason = result.error().unwrap();
        assert!(reason.starts_with("Processing failed:"), "got: {reason}");
        assert!(reason.contains("engine blew up"), "got: {reason}");
    }

    #[test]
    fn messages_for_each_failure_kind() {
        let empty = describe_failure(&Doc2TextError::EmptyDocument { name: "a.pdf".into() });
        assert_eq!(empty, "The uploaded PDF has no pages.");

        let pdf = describe_failure(&Doc2TextError::CapabilityUnavailable {
            capability: Capability::Rasterizer,
            detail: "dlopen failed".into(),
        });
        assert!(pdf.contains("PDFIUM_LIB_PATH"), "got: {pdf}");

        let ocr = describe_failure(&Doc2TextError::OcrCapabilityError("exit 1".into()));
        assert!(ocr.contains("TESSERACT_CMD") && ocr.contains("exit 1"), "got: {ocr}");

        let unreadable = describe_failure(&Doc2TextError::UnreadableImage {
            name: "x.png".into(),
            detail: "bad magic".into(),
        });
        assert!(unreadable.starts_with("Failed to read the uploaded file"));

        let other = describe_failure(&Doc2TextError::Internal("boom".into()));
        assert_eq!(other, "Processing failed: Internal error: boom");
    }

    #[derive(Default)]
    struct CharCount(Mutex<Option<usize>>);

    impl crate::progress::StageObserver for CharCount {
        fn on_success(&self, char_count: usize) {
            *self.0.lock().unwrap() = Some(char_count);
        }
    }

    #[test]
    fn success_reports_characters_not_bytes() {
        let counter = Arc::new(CharCount::default());
        let ex = Extractor::with_engines(
            ExtractionConfig::default(),
            None,
            Arc::new(EchoOcr("Grüße, café")),
        )
        .with_observer(counter.clone());

        ex.extract(&Document::new(png(4, 4), "note.png"));
        assert_eq!(*counter.0.lock().unwrap(), Some(11));
    }

    #[test]
    fn from_config_rejects_out_of_range_literal() {
        let config = ExtractionConfig {
            dpi: 0,
            ..ExtractionConfig::default()
        };
        let err = Extractor::from_config(config).unwrap_err();
        assert!(matches!(err, Doc2TextError::InvalidConfig(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn async_wrapper_matches_sync_result() {
        let ex = Arc::new(Extractor::with_engines(
            ExtractionConfig::default(),
            None,
            Arc::new(EchoOcr("async")),
        ));
        let doc = Document::new(png(3, 3), "page.png");
        let sync = ex.extract(&doc);
        let result = Arc::clone(&ex).extract_async(doc).await;
        assert_eq!(result, sync);
    }
}
