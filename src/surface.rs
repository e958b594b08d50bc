//! Preview/export surface holding the most recent composite

use crate::{
    config::OutputFormat,
    error::{PixkitError, Result},
    services::OutputFormatHandler,
    types::CompositeResult,
};
use image::RgbaImage;
use tracing::instrument;

/// File name prefix for background-removal downloads
pub const BACKGROUND_REMOVED_PREFIX: &str = "background_removed";

/// Encoded bytes ready to be written or downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Encode `image` with the rules of `format`
    ///
    /// # Errors
    /// - Encoder failure
    pub fn encode(image: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Self> {
        Ok(Self {
            bytes: OutputFormatHandler::encode(image, format, quality)?,
            format,
            width: image.width(),
            height: image.height(),
        })
    }

    /// Download name of the form `{prefix}_{width}x{height}.{ext}`
    #[must_use]
    pub fn file_name(&self, prefix: &str) -> String {
        format!(
            "{}_{}x{}.{}",
            prefix,
            self.width,
            self.height,
            OutputFormatHandler::extension(self.format)
        )
    }

    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        OutputFormatHandler::mime_type(self.format)
    }

    /// Encoded size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Holds the composite currently shown to the user, or nothing
#[derive(Debug, Default)]
pub struct PreviewSurface {
    current: Option<CompositeResult>,
}

impl PreviewSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the displayed composite
    pub fn present(&mut self, result: CompositeResult) {
        self.current = Some(result);
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub fn current(&self) -> Option<&CompositeResult> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Encode the displayed composite
    ///
    /// # Errors
    /// - Nothing has been composited yet
    /// - Encoder failure
    #[instrument(skip(self))]
    pub fn to_encoded_image(&self, format: OutputFormat, quality: u8) -> Result<EncodedImage> {
        let result = self
            .current
            .as_ref()
            .ok_or_else(|| PixkitError::invalid_input("There is no processed image to export"))?;
        EncodedImage::encode(&result.image, format, quality)
    }

    /// PNG export used by the background-removal download
    ///
    /// # Errors
    /// - Nothing has been composited yet
    pub fn export_png(&self) -> Result<EncodedImage> {
        self.to_encoded_image(OutputFormat::Png, 100)
    }
}
