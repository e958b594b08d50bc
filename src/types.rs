//! Core types shared by the editing pipeline

use crate::error::{PixkitError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Largest blur radius accepted for a blurred background, in pixels
pub const MAX_BLUR_RADIUS: u32 = 100;

/// Decoded raster the session edits
///
/// Immutable once constructed; a new file replaces it wholesale.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    mime_type: Option<String>,
}

impl SourceImage {
    /// Wrap a decoded image, converting it to RGBA8
    #[must_use]
    pub fn new(image: &DynamicImage) -> Self {
        Self {
            pixels: image.to_rgba8(),
            mime_type: None,
        }
    }

    #[must_use]
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            mime_type: None,
        }
    }

    /// Record the MIME type of the file the image was decoded from
    #[must_use]
    pub fn with_mime_type<S: Into<String>>(mut self, mime_type: S) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Width divided by height; zero for degenerate images
    #[must_use]
    pub fn aspect_ratio(&self) -> f64 {
        if self.height() == 0 {
            0.0
        } else {
            f64::from(self.width()) / f64::from(self.height())
        }
    }
}

/// Per-pixel foreground confidence produced by a segmentation capability
///
/// Values are normalized opacity (0.0 = background, 1.0 = foreground). The
/// dimensions need not match the source image; the compositor scales the mask
/// before use. Construction does not validate: capability output may be
/// malformed, and that is reported when the mask is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    /// Row-major intensities
    pub data: Vec<f32>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    #[must_use]
    pub fn new(data: Vec<f32>, dimensions: (u32, u32)) -> Self {
        Self { data, dimensions }
    }

    /// Mask with the same intensity everywhere
    #[must_use]
    pub fn uniform(value: f32, dimensions: (u32, u32)) -> Self {
        let len = dimensions.0 as usize * dimensions.1 as usize;
        Self::new(vec![value; len], dimensions)
    }

    /// Build from 0-255 intensities
    #[must_use]
    pub fn from_u8(data: &[u8], dimensions: (u32, u32)) -> Self {
        Self::new(
            data.iter().map(|&v| f32::from(v) / 255.0).collect(),
            dimensions,
        )
    }

    /// Build from a grayscale image
    #[must_use]
    pub fn from_luma8(image: &GrayImage) -> Self {
        Self::from_u8(image.as_raw(), image.dimensions())
    }

    /// Build from the alpha channel of an RGBA image
    #[must_use]
    pub fn from_alpha(image: &RgbaImage) -> Self {
        let alpha: Vec<u8> = image.pixels().map(|p| p[3]).collect();
        Self::from_u8(&alpha, image.dimensions())
    }

    /// Build from a decoded mask image: its alpha channel when it has one, luma otherwise
    #[must_use]
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        if image.color().has_alpha() {
            Self::from_alpha(&image.to_rgba8())
        } else {
            Self::from_luma8(&image.to_luma8())
        }
    }

    /// Build from an NCHW model output tensor of shape `1×1×H×W`
    ///
    /// # Errors
    /// - Tensor is not single-batch, single-channel
    /// - Height or width does not fit in `u32`
    pub fn from_tensor(tensor: &Array4<f32>) -> Result<Self> {
        let shape = tensor.shape();
        match shape {
            &[1, 1, height, width] => Ok(Self::new(
                tensor.iter().copied().collect(),
                (tensor_dimension(width)?, tensor_dimension(height)?),
            )),
            _ => Err(PixkitError::segmentation_failed(format!(
                "Expected mask tensor of shape 1x1xHxW, got {:?}",
                shape
            ))),
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// Whether the mask covers no pixels at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.0 == 0 || self.dimensions.1 == 0 || self.data.is_empty()
    }

    /// Intensity at a pixel, if the coordinate is inside the mask
    #[must_use]
    pub fn intensity_at(&self, x: u32, y: u32) -> Option<f32> {
        let (width, height) = self.dimensions;
        if x >= width || y >= height {
            return None;
        }
        self.data
            .get(y as usize * width as usize + x as usize)
            .copied()
    }

    /// Check that the mask can be drawn
    ///
    /// # Errors
    /// - Zero width or height
    /// - Data length differs from width × height
    /// - Non-finite intensities
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.dimensions;
        if width == 0 || height == 0 {
            return Err(PixkitError::mask_application(format!(
                "Mask has zero area ({}x{})",
                width, height
            )));
        }

        let expected = width as usize * height as usize;
        if self.data.len() != expected {
            return Err(PixkitError::mask_application(format!(
                "Mask data length {} does not match {}x{} ({} expected)",
                self.data.len(),
                width,
                height,
                expected
            )));
        }

        if let Some(index) = self.data.iter().position(|v| !v.is_finite()) {
            return Err(PixkitError::mask_application(format!(
                "Mask contains a non-finite intensity at index {}",
                index
            )));
        }

        Ok(())
    }

    /// Scale the mask to new dimensions with bilinear filtering
    ///
    /// # Errors
    /// - The mask fails [`SegmentationMask::validate`]
    /// - Target dimensions have zero area
    pub fn resize(&self, new_width: u32, new_height: u32) -> Result<SegmentationMask> {
        self.validate()?;
        if new_width == 0 || new_height == 0 {
            return Err(PixkitError::mask_application(format!(
                "Cannot scale mask to {}x{}",
                new_width, new_height
            )));
        }

        let clamped: Vec<f32> = self.data.iter().map(|v| v.clamp(0.0, 1.0)).collect();
        if self.dimensions == (new_width, new_height) {
            return Ok(Self::new(clamped, self.dimensions));
        }

        let (width, height) = self.dimensions;
        let buffer: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_raw(width, height, clamped)
            .ok_or_else(|| PixkitError::mask_application("Failed to wrap mask data as an image"))?;
        let resized = image::imageops::resize(
            &buffer,
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );

        Ok(Self::new(
            resized
                .into_raw()
                .into_iter()
                .map(|v| v.clamp(0.0, 1.0))
                .collect(),
            (new_width, new_height),
        ))
    }

    /// Intensities as 0-255 alpha values
    #[must_use]
    pub fn to_alpha_u8(&self) -> Vec<u8> {
        self.data.iter().map(|&v| unit_to_u8(v)).collect()
    }

    /// Convert mask to a grayscale image
    ///
    /// # Errors
    /// - The mask fails [`SegmentationMask::validate`]
    pub fn to_luma8(&self) -> Result<GrayImage> {
        self.validate()?;
        let (width, height) = self.dimensions;
        ImageBuffer::from_raw(width, height, self.to_alpha_u8())
            .ok_or_else(|| PixkitError::processing("Failed to create image from mask data"))
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.data.iter().filter(|&&v| v > 0.5).count();
        let background_pixels = total_pixels - foreground_pixels;
        let ratio = |count: usize| {
            if total_pixels == 0 {
                0.0
            } else {
                count as f32 / total_pixels as f32
            }
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels,
            foreground_ratio: ratio(foreground_pixels),
            background_ratio: ratio(background_pixels),
        }
    }
}

fn tensor_dimension(size: usize) -> Result<u32> {
    u32::try_from(size).map_err(|_| {
        PixkitError::segmentation_failed(format!("Mask tensor dimension {} is too large", size))
    })
}

/// Statistics about a segmentation mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
    pub background_ratio: f32,
}

/// Opaque RGB color, serialized as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional)
    ///
    /// # Errors
    /// - Wrong length or non-hex digits
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || PixkitError::invalid_config(format!("Invalid color '{}'", hex));

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            digits
                .get(range)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(invalid)
        };

        match digits.len() {
            6 => Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            3 => {
                let (r, g, b) = (channel(0..1)?, channel(1..2)?, channel(2..3)?);
                Ok(Self::new(r * 17, g * 17, b * 17))
            },
            _ => Err(invalid()),
        }
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    #[must_use]
    pub fn to_rgba(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha])
    }
}

impl TryFrom<String> for RgbColor {
    type Error = PixkitError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_hex()
    }
}

impl std::fmt::Display for RgbColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Background treatment drawn behind the cut-out foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BackgroundSpec {
    /// Fully transparent background
    Transparent,
    /// Opaque solid fill
    SolidColor { color: RgbColor },
    /// The source image itself, blurred by `radius` pixels
    Blur { radius: u32 },
}

impl Default for BackgroundSpec {
    fn default() -> Self {
        Self::Transparent
    }
}

impl BackgroundSpec {
    /// # Errors
    /// - Blur radius above [`MAX_BLUR_RADIUS`]
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Blur { radius } if *radius > MAX_BLUR_RADIUS => {
                Err(PixkitError::config_value_error(
                    "blur radius",
                    *radius,
                    &format!("0-{}", MAX_BLUR_RADIUS),
                    Some(10),
                ))
            },
            _ => Ok(()),
        }
    }
}

impl std::str::FromStr for BackgroundSpec {
    type Err = PixkitError;

    /// Accepts `transparent`, `#rrggbb`, `color:#rrggbb` and `blur:<px>`
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        let lowered = value.to_ascii_lowercase();

        let spec = if lowered == "transparent" || lowered == "none" {
            Self::Transparent
        } else if lowered == "blur" {
            Self::Blur { radius: 10 }
        } else if let Some(radius) = lowered.strip_prefix("blur:") {
            let radius = radius.trim().parse::<u32>().map_err(|_| {
                PixkitError::invalid_config(format!("Invalid blur radius in '{}'", value))
            })?;
            Self::Blur { radius }
        } else if let Some(color) = lowered
            .strip_prefix("color:")
            .or_else(|| lowered.strip_prefix("solid:"))
        {
            Self::SolidColor {
                color: RgbColor::from_hex(color)?,
            }
        } else if lowered.starts_with('#') {
            Self::SolidColor {
                color: RgbColor::from_hex(&lowered)?,
            }
        } else {
            return Err(PixkitError::invalid_config(format!(
                "Unknown background '{}'. Use transparent, #rrggbb or blur:<px>",
                value
            )));
        };

        spec.validate()?;
        Ok(spec)
    }
}

impl std::fmt::Display for BackgroundSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transparent => write!(f, "transparent"),
            Self::SolidColor { color } => write!(f, "color:{}", color),
            Self::Blur { radius } => write!(f, "blur:{}", radius),
        }
    }
}

/// Timing breakdown for one composite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeTimings {
    /// Rendering the background layer
    pub background_ms: u64,

    /// Scaling the mask and cutting out the foreground
    pub cutout_ms: u64,

    /// Total composite time including the overlay
    pub total_ms: u64,
}

/// Final blended raster at the source image's dimensions
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// Blended pixels
    pub image: RgbaImage,

    /// Background treatment the result was rendered with
    pub background: BackgroundSpec,

    /// Whether this is the unmodified source shown after a mask failure
    pub fallback: bool,

    /// Timing breakdown
    pub timings: CompositeTimings,
}

impl CompositeResult {
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Map a normalized value to a rounded 0-255 channel
#[must_use]
pub(crate) fn unit_to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
