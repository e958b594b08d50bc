//! Configuration types for pixkit operations

use crate::{
    error::{PixkitError, Result},
    types::{BackgroundSpec, RgbColor},
};
use instant::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG (no transparency, flattened over black or a fill color)
    Jpeg,
    /// PNG with alpha channel transparency, quality ignored
    Png,
    /// WebP with alpha channel transparency
    WebP,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::WebP => write!(f, "webp"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = PixkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            other => Err(PixkitError::unsupported_format(other)),
        }
    }
}

/// Model variant requested from the segmentation capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSelection {
    /// Square-input general model, most accurate for portraits
    General,
    /// Wide-input landscape model, faster on wide frames
    Landscape,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self::Landscape
    }
}

/// Options handed to the segmentation capability at initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Where the capability loads its model assets from (URL or path)
    pub asset_location: String,

    /// Model selection (accuracy/speed trade-off)
    pub selection: ModelSelection,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            asset_location: "models/selfie_segmentation".to_string(),
            selection: ModelSelection::default(),
        }
    }
}

/// Configuration for an editing session and its exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// JPEG quality (1-100) used when no explicit quality is given
    pub jpeg_quality: u8,

    /// Background treatment selected when a session starts
    pub default_background: BackgroundSpec,

    /// Fill color behind transparent pixels when converting to JPEG
    pub convert_background: RgbColor,

    /// Segmentation capability initialization options
    pub model: ModelOptions,

    /// Upper bound on the wait for the capability to become ready (milliseconds)
    pub ready_timeout_ms: u64,

    /// Enable debug mode (additional logging)
    pub debug: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 92,
            default_background: BackgroundSpec::Transparent,
            convert_background: RgbColor::WHITE,
            model: ModelOptions::default(),
            ready_timeout_ms: 5_000,
            debug: false,
        }
    }
}

impl ToolConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use pixkit::{BackgroundSpec, ToolConfig};
    ///
    /// let config = ToolConfig::builder()
    ///     .jpeg_quality(85)
    ///     .default_background(BackgroundSpec::Blur { radius: 8 })
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.jpeg_quality, 85);
    /// ```
    #[must_use]
    pub fn builder() -> ToolConfigBuilder {
        ToolConfigBuilder::default()
    }

    /// Readiness wait budget as a `Duration`
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Load a configuration from a JSON file; missing fields take their defaults
    ///
    /// # Errors
    /// - File cannot be read
    /// - JSON is malformed
    /// - Loaded values fail validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| PixkitError::file_io_error("read config file", path_ref, &e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            PixkitError::invalid_config(format!(
                "Failed to parse '{}': {}",
                path_ref.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - JPEG quality outside 1-100
    /// - Zero readiness timeout
    /// - Empty model asset location
    ///
    /// ```rust
    /// use pixkit::ToolConfig;
    ///
    /// let mut config = ToolConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.jpeg_quality = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PixkitError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "1-100",
                Some(92),
            ));
        }

        if self.ready_timeout_ms == 0 {
            return Err(PixkitError::config_value_error(
                "ready timeout (ms)",
                self.ready_timeout_ms,
                "1 or more",
                Some(5_000),
            ));
        }

        if self.model.asset_location.trim().is_empty() {
            return Err(PixkitError::invalid_config(
                "Model asset location must not be empty",
            ));
        }

        self.default_background.validate()?;

        Ok(())
    }
}

/// Builder for `ToolConfig`
#[derive(Debug, Default)]
pub struct ToolConfigBuilder {
    config: ToolConfig,
}

impl ToolConfigBuilder {
    /// Set JPEG quality, clamped to 1-100
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn default_background(mut self, background: BackgroundSpec) -> Self {
        self.config.default_background = background;
        self
    }

    #[must_use]
    pub fn convert_background(mut self, color: RgbColor) -> Self {
        self.config.convert_background = color;
        self
    }

    #[must_use]
    pub fn model_asset_location<S: Into<String>>(mut self, location: S) -> Self {
        self.config.model.asset_location = location.into();
        self
    }

    #[must_use]
    pub fn model_selection(mut self, selection: ModelSelection) -> Self {
        self.config.model.selection = selection;
        self
    }

    /// Set the readiness wait budget
    #[must_use]
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.config.ready_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any rule checked by [`ToolConfig::validate`]
    pub fn build(self) -> Result<ToolConfig> {
        let config = self.config;
        config.validate()?;
        Ok(config)
    }
}
