//! Image I/O operations service
//!
//! File and byte handling lives here so the session and the editing paths
//! only ever see decoded pixels.

use crate::{
    error::{PixkitError, Result},
    types::SourceImage,
};
use image::ImageFormat;
use std::path::Path;

/// Service for handling image input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Check that a declared MIME type names an image
    ///
    /// # Errors
    /// - MIME type does not start with `image/`
    pub fn validate_mime_type(mime_type: &str) -> Result<()> {
        if mime_type.trim().to_ascii_lowercase().starts_with("image/") {
            Ok(())
        } else {
            Err(PixkitError::invalid_input(format!(
                "Please select an image file (got '{}')",
                mime_type
            )))
        }
    }

    /// MIME type implied by a file's extension, if it is an image format we recognize
    #[must_use]
    pub fn mime_type_for_path<P: AsRef<Path>>(path: P) -> Option<&'static str> {
        ImageFormat::from_path(path.as_ref())
            .ok()
            .map(|format| format.to_mime_type())
    }

    /// Decode image bytes whose MIME type was declared by the caller
    ///
    /// # Errors
    /// - `InvalidInput` for a non-image MIME type or undecodable bytes
    ///
    /// # Examples
    /// ```rust,no_run
    /// use pixkit::services::ImageIOService;
    ///
    /// let bytes = std::fs::read("input.jpg")?;
    /// let image = ImageIOService::load_from_bytes(&bytes, "image/jpeg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_from_bytes(bytes: &[u8], mime_type: &str) -> Result<SourceImage> {
        Self::validate_mime_type(mime_type)?;

        if bytes.is_empty() {
            return Err(PixkitError::invalid_input("Image file is empty"));
        }

        let decoded = image::load_from_memory(bytes).map_err(|e| {
            PixkitError::invalid_input(format!("Failed to decode {} image: {}", mime_type, e))
        })?;

        log::debug!(
            "Decoded {} image: {}x{} ({} bytes)",
            mime_type,
            decoded.width(),
            decoded.height(),
            bytes.len()
        );
        Ok(SourceImage::new(&decoded).with_mime_type(mime_type))
    }

    /// Load an image file, deriving its MIME type from the extension
    ///
    /// # Errors
    /// - File does not exist or cannot be read
    /// - Extension does not name an image format
    /// - Content cannot be decoded
    pub async fn load_image<P: AsRef<Path>>(path: P) -> Result<SourceImage> {
        let path_ref = path.as_ref();

        let mime_type = Self::mime_type_for_path(path_ref).ok_or_else(|| {
            PixkitError::invalid_input(format!(
                "'{}' does not look like an image file",
                path_ref.display()
            ))
        })?;

        let bytes = tokio::fs::read(path_ref)
            .await
            .map_err(|e| PixkitError::file_io_error("read image file", path_ref, &e))?;

        Self::load_from_bytes(&bytes, mime_type)
    }

    /// Write encoded bytes, creating the parent directory when needed
    ///
    /// # Errors
    /// - Directory creation or file write failure
    pub async fn save_bytes<P: AsRef<Path>>(bytes: &[u8], path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PixkitError::file_io_error("create output directory", parent, &e))?;
        }

        tokio::fs::write(path_ref, bytes)
            .await
            .map_err(|e| PixkitError::file_io_error("write output file", path_ref, &e))?;

        log::info!("Wrote {} bytes to {}", bytes.len(), path_ref.display());
        Ok(())
    }
}
