//! Pixel containers passed between pipeline stages.
//!
//! [`RasterImage`] is what the rasteriser and the image decoder produce;
//! [`BinaryImage`] is what the normaliser produces and the OCR backend
//! consumes. Both validate their invariants at construction, so a stage that
//! receives one never has to re-check dimensions or pixel domain.

use crate::error::Doc2TextError;
use image::{DynamicImage, GrayImage};
use std::io::Cursor;

/// Channel layout of a [`RasterImage`] buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// One byte per pixel.
    Luma,
    /// Three bytes per pixel, red first.
    Rgb,
}

impl ChannelLayout {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Luma => 1,
            ChannelLayout::Rgb => 3,
        }
    }
}

/// A single page or frame as an interleaved 8-bit pixel grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    layout: ChannelLayout,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap a raw buffer, rejecting empty grids and buffers whose length
    /// does not match `width * height * channels`.
    pub fn new(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        pixels: Vec<u8>,
    ) -> Result<Self, Doc2TextError> {
        if width == 0 || height == 0 {
            return Err(Doc2TextError::InvalidImage(format!(
                "image has zero dimension ({width}x{height})"
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(layout.channels()))
            .ok_or_else(|| {
                Doc2TextError::InvalidImage(format!("image {width}x{height} is too large"))
            })?;
        if pixels.len() != expected {
            return Err(Doc2TextError::InvalidImage(format!(
                "buffer holds {} bytes, {width}x{height} {:?} needs {expected}",
                pixels.len(),
                layout
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            pixels,
        })
    }

    /// Convert a decoded image. Grayscale inputs stay single-channel, every
    /// other colour type becomes RGB; alpha is discarded.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self, Doc2TextError> {
        let (width, height) = (img.width(), img.height());
        if img.color().has_color() {
            Self::new(width, height, ChannelLayout::Rgb, img.into_rgb8().into_raw())
        } else {
            Self::new(width, height, ChannelLayout::Luma, img.into_luma8().into_raw())
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Interleaved pixel bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// A single-channel image whose pixels are all `0` or `255`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    pixels: GrayImage,
    threshold: u8,
}

impl BinaryImage {
    /// Built by the normaliser once every pixel has been mapped to 0/255.
    pub(crate) fn from_thresholded(pixels: GrayImage, threshold: u8) -> Self {
        debug_assert!(pixels.as_raw().iter().all(|&p| p == 0 || p == 255));
        Self { pixels, threshold }
    }

    /// Wrap an already-binary grayscale image.
    ///
    /// Fails with [`Doc2TextError::InvalidImage`] if the image is empty or
    /// any pixel is neither 0 nor 255. The recorded threshold is 0, which
    /// reproduces the input exactly.
    pub fn try_from_luma(pixels: GrayImage) -> Result<Self, Doc2TextError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(Doc2TextError::InvalidImage("binary image is empty".into()));
        }
        if let Some(bad) = pixels.as_raw().iter().find(|&&p| p != 0 && p != 255) {
            return Err(Doc2TextError::InvalidImage(format!(
                "binary image contains intermediate value {bad}"
            )));
        }
        Ok(Self {
            pixels,
            threshold: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Intensity cutoff that produced this image; pixels above it are white.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn as_luma(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn into_luma(self) -> GrayImage {
        self.pixels
    }

    /// Encode as PNG. Lossless, so the OCR engine sees exactly the 0/255
    /// pixels the threshold produced.
    pub fn to_png(&self) -> Result<Vec<u8>, Doc2TextError> {
        let mut buf = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .map_err(|e| Doc2TextError::Internal(format!("PNG encoding failed: {e}")))?;
        Ok(buf)
    }
}
