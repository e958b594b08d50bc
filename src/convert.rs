//! Convert path: re-encode the source image as JPEG, PNG or WebP

use crate::{
    compositor::MaskCompositor,
    config::{OutputFormat, ToolConfig},
    error::Result,
    surface::EncodedImage,
    types::{RgbColor, SourceImage},
};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// File name prefix for conversion downloads
pub const CONVERTED_PREFIX: &str = "converted_image";

/// Target format and encoding options for a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub format: OutputFormat,
    /// Quality (1-100); ignored by lossless formats
    pub quality: u8,
    /// Fill behind transparent pixels when the format has no alpha channel
    pub background_color: RgbColor,
}

impl ConvertRequest {
    #[must_use]
    pub fn new(format: OutputFormat, quality: u8) -> Self {
        Self {
            format,
            quality,
            background_color: RgbColor::WHITE,
        }
    }

    /// Request using the configured quality and JPEG fill color
    #[must_use]
    pub fn from_config(format: OutputFormat, config: &ToolConfig) -> Self {
        Self {
            format,
            quality: config.jpeg_quality,
            background_color: config.convert_background,
        }
    }

    #[must_use]
    pub fn with_background_color(mut self, color: RgbColor) -> Self {
        self.background_color = color;
        self
    }
}

/// Draw the source at its original size onto the surface the format calls for
///
/// JPEG gets an opaque fill in the request color first; other formats start
/// from a transparent surface.
///
/// # Errors
/// - Surface and source dimensions differ
pub fn render(source: &SourceImage, request: &ConvertRequest) -> Result<RgbaImage> {
    let (width, height) = source.dimensions();
    let mut surface = match request.format {
        OutputFormat::Jpeg => {
            RgbaImage::from_pixel(width, height, request.background_color.to_rgba(255))
        },
        OutputFormat::Png | OutputFormat::WebP => RgbaImage::new(width, height),
    };
    MaskCompositor::overlay(&mut surface, source.pixels())?;
    Ok(surface)
}

/// Render and encode the source in the requested format
///
/// # Errors
/// - Encoder failure or unsupported format
#[instrument(skip(source), fields(dimensions = %format!("{}x{}", source.width(), source.height())))]
pub fn convert(source: &SourceImage, request: &ConvertRequest) -> Result<EncodedImage> {
    let surface = render(source, request)?;
    let encoded = EncodedImage::encode(&surface, request.format, request.quality)?;
    debug!(
        format = %request.format,
        bytes = encoded.size(),
        "Converted image"
    );
    Ok(encoded)
}
