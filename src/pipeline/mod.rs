//! Pipeline stages for document-to-text extraction.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own and an engine can be swapped (another rasteriser,
//! another OCR backend) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─ .pdf ──▶ render ─┐
//! input ─────┤                   ├──▶ normalize ──▶ ocr ──▶ text
//!            └─ other ─▶ decode ─┘        │
//!                                         └──▶ artifact (optional)
//! ```
//!
//! 1. [`input`]     — the uploaded [`input::Document`], kind detection, and
//!    direct image decoding
//! 2. [`render`]    — rasterise page 1 of a PDF through pdfium
//! 3. [`normalize`] — luminance + Otsu threshold → [`crate::BinaryImage`]
//! 4. [`ocr`]       — recognise text with Tesseract
//! 5. [`artifact`]  — optionally keep the normalised image on disk

pub mod artifact;
pub mod input;
pub mod normalize;
pub mod ocr;
pub mod render;
