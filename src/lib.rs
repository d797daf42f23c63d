//! # doc2text
//!
//! Extract plain text from an uploaded document: a PDF or a raster image.
//!
//! The first page of a PDF is rendered at 300 DPI through pdfium; image files
//! are decoded directly. Either way the page is reduced to luminance,
//! binarised with an Otsu threshold, and handed to Tesseract. Every failure
//! comes back as a readable sentence instead of an error type, so the result
//! can be shown to whoever uploaded the file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (bytes + filename)
//!  │
//!  ├─ 1. Detect     kind from the filename extension
//!  ├─ 2. Load       .pdf → rasterise page 1 │ otherwise → decode image
//!  ├─ 3. Normalise  BT.601 luminance, Otsu threshold → 0/255 pixels
//!  ├─ 4. OCR        tesseract <png> stdout -l <lang>
//!  └─ 5. Result     Success { text } │ Failure { reason }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2text::{ExtractionConfig, Extractor};
//! use std::path::Path;
//!
//! let extractor = Extractor::from_config(ExtractionConfig::default())?;
//! let result = extractor.extract_file(Path::new("invoice.pdf"), None);
//! match result.text() {
//!     Some(text) => println!("{text}"),
//!     None => eprintln!("{}", result.error().unwrap_or_default()),
//! }
//! # Ok::<(), doc2text::Doc2TextError>(())
//! ```
//!
//! ## External Engines
//!
//! | Engine    | Needed for  | Located via |
//! |-----------|-------------|-------------|
//! | Tesseract | all inputs  | `TESSERACT_CMD`, install dirs, `PATH` |
//! | PDFium    | `.pdf` only | `PDFIUM_LIB_PATH`, system library path |
//!
//! Both are looked up once, when the [`Extractor`] is built. Without PDFium
//! images still work and PDF uploads fail with setup instructions.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2text` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod raster;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CommandSource, ExtractionConfig, ExtractionConfigBuilder, OcrConfig};
pub use error::{Capability, Doc2TextError};
pub use extract::{describe_failure, Extractor};
pub use output::{ExtractionReport, ExtractionResult};
pub use pipeline::artifact::ArtifactStore;
pub use pipeline::input::{detect_kind, Document, DocumentKind};
pub use pipeline::normalize::normalize;
pub use pipeline::ocr::{OcrBackend, TesseractCli};
pub use pipeline::render::{PdfiumRasterizer, PdfiumSource, Rasterizer};
pub use progress::{NoopObserver, SharedObserver, Stage, StageObserver};
pub use raster::{BinaryImage, ChannelLayout, RasterImage};
