//! Input handling: the uploaded document, its kind, and direct image decoding.
//!
//! Routing is decided from the declared filename alone, never from sniffing
//! the bytes. A `.pdf` always goes to the rasteriser; everything else is
//! handed to the image decoder, including names with unknown or missing
//! extensions. That last case is deliberate best-effort behaviour: a scan
//! uploaded as `receipt` or `page.scan` still decodes when its bytes are a
//! PNG or JPEG, and fails with [`Doc2TextError::UnreadableImage`] otherwise.

use crate::error::Doc2TextError;
use crate::raster::RasterImage;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Extensions the image decoder is built to handle.
pub const RASTER_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp", "gif",
];

/// An uploaded file: raw bytes plus the name the uploader gave it.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: Vec<u8>,
    pub name: String,
}

impl Document {
    pub fn new(content: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            name: name.into(),
        }
    }

    /// Read a file from disk. `name` defaults to the file's own name.
    pub fn from_path(path: &Path, name: Option<&str>) -> Result<Self, Doc2TextError> {
        let content = std::fs::read(path).map_err(|source| Doc2TextError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = match name {
            Some(n) => n.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        debug!("Read {} bytes from {}", content.len(), path.display());
        Ok(Self { content, name })
    }

    pub fn kind(&self) -> DocumentKind {
        detect_kind(&self.name)
    }
}

/// What the declared filename says the document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// `.pdf`
    PdfDocument,
    /// One of [`RASTER_EXTENSIONS`].
    RasterFile,
    /// Anything else, including no extension at all.
    Unrecognized,
}

/// Classify a filename by its extension, case-insensitively.
pub fn detect_kind(filename: &str) -> DocumentKind {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => DocumentKind::PdfDocument,
        Some(e) if RASTER_EXTENSIONS.contains(&e) => DocumentKind::RasterFile,
        _ => DocumentKind::Unrecognized,
    }
}

/// Decode the document's bytes as a raster image.
///
/// The format is detected from the content, not the name, so a PNG saved
/// as `scan.jpg` still decodes. An EXIF orientation tag is applied, so a
/// phone photo taken sideways reaches OCR upright.
pub fn decode_raster(document: &Document) -> Result<RasterImage, Doc2TextError> {
    if document.content.is_empty() {
        return Err(unreadable(document, "file is empty"));
    }

    let mut decoder = ImageReader::new(Cursor::new(&document.content))
        .with_guessed_format()
        .map_err(|e| unreadable(document, e))?
        .into_decoder()
        .map_err(|e| unreadable(document, e))?;
    // A malformed EXIF block is not worth rejecting the upload for.
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| unreadable(document, e))?;
    img.apply_orientation(orientation);

    debug!(
        "Decoded {} → {}x{} {:?}",
        document.name,
        img.width(),
        img.height(),
        img.color()
    );
    RasterImage::from_dynamic(img)
}

fn unreadable(document: &Document, detail: impl Display) -> Doc2TextError {
    Doc2TextError::UnreadableImage {
        name: document.name.clone(),
        detail: detail.to_string(),
    }
}
