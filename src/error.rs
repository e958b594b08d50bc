//! Error types for image editing operations

use thiserror::Error;

/// Result type alias for pixkit operations
pub type Result<T> = std::result::Result<T, PixkitError>;

/// Error types for loading, segmenting, compositing and exporting images
#[derive(Error, Debug)]
pub enum PixkitError {
    /// Input rejected before any state change (non-image file, undecodable data)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The segmentation capability never became ready within the wait budget
    #[error("Segmentation model unavailable: {0}")]
    ModelUnavailable(String),

    /// The segmentation capability ran but produced no usable mask
    #[error("Segmentation failed: {0}")]
    SegmentationFailed(String),

    /// A mask was present but could not be scaled or applied
    #[error("Mask application error: {0}")]
    MaskApplication(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unsupported file format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Processing errors outside the categories above
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PixkitError {
    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new model unavailable error
    pub fn model_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new segmentation failure
    pub fn segmentation_failed<S: Into<String>>(msg: S) -> Self {
        Self::SegmentationFailed(msg.into())
    }

    /// Create a new mask application error
    pub fn mask_application<S: Into<String>>(msg: S) -> Self {
        Self::MaskApplication(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error should be shown to the user as an alert rather than a warning.
    ///
    /// Mask application failures degrade to showing the source image, so they are the
    /// only category reported as a warning.
    #[must_use]
    pub fn is_user_alert(&self) -> bool {
        !matches!(self, Self::MaskApplication(_))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }
}
