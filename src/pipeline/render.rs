//! PDF rasterisation: render the first page to a [`RasterImage`] via pdfium.
//!
//! ## Why only the first page?
//!
//! Uploads are single scanned sheets that happen to arrive wrapped in a PDF.
//! Rendering more pages would multiply the OCR cost for content the caller
//! never sees, so the rasteriser opens page 1 and nothing else.
//!
//! ## Capability probing
//!
//! PDFium is an optional shared library. [`PdfiumRasterizer::probe`] locates
//! and binds it once when the extractor is built; a failure there becomes
//! [`Doc2TextError::CapabilityUnavailable`], which the orchestrator reports
//! with setup instructions instead of a parse error.

use crate::config::{ExtractionConfig, PDFIUM_LIB_PATH_ENV};
use crate::error::{Capability, Doc2TextError};
use crate::pipeline::input::Document;
use crate::raster::RasterImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Turns a paginated document into a single raster image.
///
/// Implementations must be `Send + Sync`: one rasteriser is shared by every
/// request an [`crate::Extractor`] serves.
pub trait Rasterizer: Send + Sync {
    /// Render page 1 of `document`.
    ///
    /// # Errors
    /// - [`Doc2TextError::EmptyDocument`] when the document has no pages
    /// - [`Doc2TextError::UnsupportedDocument`] when the bytes are not a
    ///   readable PDF
    /// - [`Doc2TextError::CapabilityUnavailable`] when the engine is gone
    fn rasterize_first_page(&self, document: &Document) -> Result<RasterImage, Doc2TextError>;
}

/// Where the PDFium shared library comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfiumSource {
    /// An explicit library file (from config or `PDFIUM_LIB_PATH`).
    Library(PathBuf),
    /// The platform's default library search path.
    System,
}

/// [`Rasterizer`] backed by the pdfium library.
#[derive(Debug)]
pub struct PdfiumRasterizer {
    source: PdfiumSource,
    dpi: u32,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    /// Locate PDFium and check that it binds.
    ///
    /// Lookup order: [`ExtractionConfig::pdfium_library`], then
    /// `PDFIUM_LIB_PATH`, then the system library path. A directory is
    /// accepted in place of a file and completed with the platform library
    /// name (`libpdfium.so`, `libpdfium.dylib`, `pdfium.dll`).
    ///
    /// An out-of-range DPI fails with [`Doc2TextError::InvalidConfig`]
    /// before any library is touched.
    pub fn probe(config: &ExtractionConfig) -> Result<Self, Doc2TextError> {
        config.validate()?;
        let explicit = config
            .pdfium_library
            .clone()
            .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

        let source = match explicit {
            Some(path) if path.is_dir() => {
                PdfiumSource::Library(Pdfium::pdfium_platform_library_name_at_path(&path))
            }
            Some(path) => PdfiumSource::Library(path),
            None => PdfiumSource::System,
        };

        let rasterizer = Self {
            source,
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
        };

        rasterizer.bind()?;
        info!("PDFium available ({:?})", rasterizer.source);
        Ok(rasterizer)
    }

    pub fn source(&self) -> &PdfiumSource {
        &self.source
    }

    fn bind(&self) -> Result<Pdfium, Doc2TextError> {
        let bindings = match &self.source {
            PdfiumSource::Library(path) => Pdfium::bind_to_library(path),
            PdfiumSource::System => Pdfium::bind_to_system_library(),
        };
        bindings
            .map(Pdfium::new)
            .map_err(|e| Doc2TextError::CapabilityUnavailable {
                capability: Capability::Rasterizer,
                detail: match &self.source {
                    PdfiumSource::Library(path) => format!("{} ({})", e, path.display()),
                    PdfiumSource::System => format!("{} (system library)", e),
                },
            })
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize_first_page(&self, document: &Document) -> Result<RasterImage, Doc2TextError> {
        let pdfium = self.bind()?;

        let pdf = pdfium
            .load_pdf_from_byte_slice(&document.content, None)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                let detail = if err_str.contains("Password") || err_str.contains("password") {
                    "document is encrypted and requires a password".to_string()
                } else {
                    err_str
                };
                Doc2TextError::UnsupportedDocument {
                    name: document.name.clone(),
                    detail,
                }
            })?;

        let pages = pdf.pages();
        let total_pages = pages.len();
        debug!("PDF '{}' loaded: {} pages", document.name, total_pages);
        if total_pages == 0 {
            return Err(Doc2TextError::EmptyDocument {
                name: document.name.clone(),
            });
        }

        let page = pages
            .get(0)
            .map_err(|e| Doc2TextError::UnsupportedDocument {
                name: document.name.clone(),
                detail: format!("page 1 could not be loaded: {:?}", e),
            })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32)
            .set_clear_color(PdfColor::WHITE);

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            Doc2TextError::UnsupportedDocument {
                name: document.name.clone(),
                detail: format!("page 1 could not be rendered: {:?}", e),
            }
        })?;

        // pdfium hands back BGRA; `as_image` reorders to RGBA and the
        // opaque white clear colour makes dropping alpha lossless.
        let image = bitmap.as_image();
        debug!(
            "Rendered page 1 at {} dpi → {}x{} px",
            self.dpi,
            image.width(),
            image.height()
        );
        RasterImage::from_dynamic(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_library_is_capability_failure() {
        let config = ExtractionConfig::builder()
            .pdfium_library("/definitely/not/libpdfium.so")
            .build()
            .unwrap();
        let err = PdfiumRasterizer::probe(&config).unwrap_err();
        assert!(
            matches!(
                err,
                Doc2TextError::CapabilityUnavailable {
                    capability: Capability::Rasterizer,
                    ..
                }
            ),
            "got: {err:?}"
        );
        assert!(err.to_string().contains("/definitely/not/libpdfium.so"));
    }

    #[test]
    fn zero_dpi_is_rejected_before_binding() {
        let config = ExtractionConfig {
            dpi: 0,
            pdfium_library: Some("/definitely/not/libpdfium.so".into()),
            ..ExtractionConfig::default()
        };
        let err = PdfiumRasterizer::probe(&config).unwrap_err();
        assert!(matches!(err, Doc2TextError::InvalidConfig(_)), "got: {err:?}");
    }
}
