//! Image normalisation: colour → luminance → Otsu binarisation.
//!
//! Tesseract's own binariser copes poorly with uneven backgrounds and
//! coloured paper. Feeding it an image that is already two-level removes
//! that variable. The cutoff is chosen per image with Otsu's method: the
//! split of the 256-bin histogram that maximises between-class variance
//! (equivalently, minimises the combined variance inside each class).
//!
//! Everything here is pure and deterministic; the same [`RasterImage`]
//! always yields the same [`BinaryImage`].

use crate::error::Doc2TextError;
use crate::raster::{BinaryImage, ChannelLayout, RasterImage};
use image::GrayImage;
use tracing::debug;

/// Convert a raster image to a binary image suitable for OCR.
///
/// Pixels strictly above the Otsu threshold become 255 (background for a
/// typical dark-on-light scan), the rest become 0.
pub fn normalize(image: &RasterImage) -> Result<BinaryImage, Doc2TextError> {
    let gray = to_luminance(image)?;
    let threshold = otsu_threshold(&gray);
    debug!(
        "Normalised {}x{} image, otsu threshold = {}",
        gray.width(),
        gray.height(),
        threshold
    );
    Ok(binarize(gray, threshold))
}

/// Collapse a raster image to one 8-bit luminance channel.
///
/// Uses the ITU-R BT.601 weights in 14-bit fixed point with rounding, so the
/// result matches the usual `RGB → GRAY` conversion bit for bit.
pub fn to_luminance(image: &RasterImage) -> Result<GrayImage, Doc2TextError> {
    let (w, h) = (image.width(), image.height());
    let data = match image.layout() {
        ChannelLayout::Luma => image.pixels().to_vec(),
        ChannelLayout::Rgb => image
            .pixels()
            .chunks_exact(3)
            .map(|px| luma_bt601(px[0], px[1], px[2]))
            .collect(),
    };
    GrayImage::from_raw(w, h, data).ok_or_else(|| {
        Doc2TextError::InvalidImage(format!("pixel buffer does not fit {w}x{h}"))
    })
}

fn luma_bt601(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899; // 0.299 * 2^14
    const G: u32 = 9617; // 0.587 * 2^14
    const B: u32 = 1868; // 0.114 * 2^14
    ((r as u32 * R + g as u32 * G + b as u32 * B + (1 << 13)) >> 14) as u8
}

/// Pick the global threshold with Otsu's method.
///
/// Returns the first intensity `t` that maximises between-class variance
/// for the split `[0, t]` / `(t, 255]`. A histogram with a single occupied
/// bin has no valid split and yields 0.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for &p in gray.as_raw() {
        hist[p as usize] += 1;
    }

    let total: u64 = hist.iter().sum();
    let total_sum: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum();

    let mut w0 = 0u64;
    let mut sum0 = 0f64;
    let mut best_sigma = 0f64;
    let mut best_t = 0u8;

    for (t, &count) in hist.iter().enumerate() {
        w0 += count;
        sum0 += t as f64 * count as f64;
        let w1 = total - w0;
        if w0 == 0 || w1 == 0 {
            continue;
        }
        let m0 = sum0 / w0 as f64;
        let m1 = (total_sum - sum0) / w1 as f64;
        let sigma = w0 as f64 * w1 as f64 * (m0 - m1) * (m0 - m1);
        if sigma > best_sigma {
            best_sigma = sigma;
            best_t = t as u8;
        }
    }

    best_t
}

/// Map every pixel to 255 if it is above `threshold`, else 0.
pub fn binarize(mut gray: GrayImage, threshold: u8) -> BinaryImage {
    for p in gray.iter_mut() {
        *p = if *p > threshold { 255 } else { 0 };
    }
    BinaryImage::from_thresholded(gray, threshold)
}
