//! Resize path: aspect-linked dimension editing, rescaling and JPEG export

use crate::{
    config::OutputFormat,
    error::{PixkitError, Result},
    surface::EncodedImage,
    types::SourceImage,
};
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// File name prefix for resize downloads
pub const RESIZED_PREFIX: &str = "resized_image";

/// Which dimension the user edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

/// Recompute the other dimension so the original aspect ratio is kept
///
/// ```rust
/// use pixkit::resize::{linked_dimensions, Dimension};
///
/// assert_eq!(linked_dimensions((400, 300), Dimension::Width, 200), (200, 150));
/// assert_eq!(linked_dimensions((400, 300), Dimension::Height, 60), (80, 60));
/// ```
#[must_use]
pub fn linked_dimensions(original: (u32, u32), changed: Dimension, value: u32) -> (u32, u32) {
    let (width, height) = original;
    if width == 0 || height == 0 {
        return match changed {
            Dimension::Width => (value, height),
            Dimension::Height => (width, value),
        };
    }

    let aspect = f64::from(width) / f64::from(height);
    match changed {
        Dimension::Width => (value, (f64::from(value) / aspect).round() as u32),
        Dimension::Height => ((f64::from(value) * aspect).round() as u32, value),
    }
}

/// Target size and JPEG quality for a resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeRequest {
    /// Target width; `None` or zero keeps the original width
    pub width: Option<u32>,
    /// Target height; `None` or zero keeps the original height
    pub height: Option<u32>,
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl ResizeRequest {
    #[must_use]
    pub fn new(width: Option<u32>, height: Option<u32>, quality: u8) -> Self {
        Self {
            width,
            height,
            quality,
        }
    }

    /// Resolve the output size against the original image
    #[must_use]
    pub fn target_dimensions(&self, original: (u32, u32)) -> (u32, u32) {
        let pick = |requested: Option<u32>, fallback: u32| match requested {
            Some(value) if value > 0 => value,
            _ => fallback,
        };
        (pick(self.width, original.0), pick(self.height, original.1))
    }
}

/// Rescale the source to the requested size with bilinear filtering
///
/// # Errors
/// - Resolved width or height is zero
#[instrument(skip(source), fields(original = %format!("{}x{}", source.width(), source.height())))]
pub fn resize(source: &SourceImage, request: &ResizeRequest) -> Result<RgbaImage> {
    let (width, height) = request.target_dimensions(source.dimensions());
    if width == 0 || height == 0 {
        return Err(PixkitError::invalid_input(format!(
            "Cannot resize to {}x{}",
            width, height
        )));
    }

    if (width, height) == source.dimensions() {
        return Ok(source.pixels().clone());
    }
    Ok(imageops::resize(
        source.pixels(),
        width,
        height,
        imageops::FilterType::Triangle,
    ))
}

/// Resize and encode as JPEG at the request quality
///
/// # Errors
/// - Invalid target size
/// - Encoder failure
pub fn export_resized(source: &SourceImage, request: &ResizeRequest) -> Result<EncodedImage> {
    let resized = resize(source, request)?;
    EncodedImage::encode(&resized, OutputFormat::Jpeg, request.quality)
}

/// Rough JPEG size: half a byte per pixel scaled by quality
///
/// A heuristic for the preview label, not a bound on the encoded size.
///
/// ```rust
/// use pixkit::resize::estimate_file_size;
///
/// assert_eq!(estimate_file_size(100, 100, 100), 5_000);
/// assert_eq!(estimate_file_size(100, 100, 50), 2_500);
/// ```
#[must_use]
pub fn estimate_file_size(width: u32, height: u32, quality: u8) -> u64 {
    let pixels = u64::from(width) * u64::from(height);
    (pixels as f64 * 0.5 * f64::from(quality.min(100)) / 100.0).round() as u64
}

/// Human-readable byte count (`B`, `KB`, `MB`)
///
/// ```rust
/// use pixkit::resize::format_file_size;
///
/// assert_eq!(format_file_size(512), "512 B");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(3 * 1024 * 1024), "3.0 MB");
/// ```
#[must_use]
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
