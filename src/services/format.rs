//! Output format handling service
//!
//! Encoding rules per format live here so the surface, resize and convert
//! paths all produce identical bytes for identical pixels.

use crate::{
    config::OutputFormat,
    error::{PixkitError, Result},
    types::RgbColor,
};
use image::{
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
    ImageEncoder, Rgb, RgbImage, RgbaImage,
};

/// Service for encoding composited pixels into downloadable files
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode an RGBA image in the given format
    ///
    /// PNG ignores `quality`. JPEG clamps it to 1-100 and flattens any
    /// transparency over black. WebP is lossless and keeps alpha.
    ///
    /// # Errors
    /// - Encoder failure
    /// - WebP requested while the `webp-support` feature is disabled
    ///
    /// # Examples
    /// ```rust
    /// use pixkit::{services::OutputFormatHandler, OutputFormat};
    /// use image::RgbaImage;
    ///
    /// let bytes = OutputFormatHandler::encode(&RgbaImage::new(4, 4), OutputFormat::Png, 50)?;
    /// assert_eq!(&bytes[1..4], b"PNG");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn encode(image: &RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        let mut buffer = Vec::new();

        match format {
            OutputFormat::Png => {
                PngEncoder::new(&mut buffer)
                    .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgba8)
                    .map_err(|e| encode_error("PNG", &e))?;
            },
            OutputFormat::Jpeg => {
                let flattened = Self::flatten_onto(image, RgbColor::BLACK);
                JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
                    .write_image(
                        flattened.as_raw(),
                        width,
                        height,
                        image::ExtendedColorType::Rgb8,
                    )
                    .map_err(|e| encode_error("JPEG", &e))?;
            },
            OutputFormat::WebP => Self::encode_webp(image, &mut buffer)?,
        }

        Ok(buffer)
    }

    #[cfg(feature = "webp-support")]
    fn encode_webp(image: &RgbaImage, buffer: &mut Vec<u8>) -> Result<()> {
        let (width, height) = image.dimensions();
        image::codecs::webp::WebPEncoder::new_lossless(buffer)
            .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgba8)
            .map_err(|e| encode_error("WebP", &e))
    }

    #[cfg(not(feature = "webp-support"))]
    fn encode_webp(_image: &RgbaImage, _buffer: &mut Vec<u8>) -> Result<()> {
        Err(PixkitError::unsupported_format(
            "webp (built without the webp-support feature)",
        ))
    }

    /// Composite an RGBA image over an opaque color, dropping the alpha channel
    #[must_use]
    pub fn flatten_onto(image: &RgbaImage, background: RgbColor) -> RgbImage {
        let (width, height) = image.dimensions();
        let mut flattened = RgbImage::new(width, height);

        for (dst, src) in flattened.pixels_mut().zip(image.pixels()) {
            let alpha = f32::from(src[3]) / 255.0;
            let mix = |s: u8, b: u8| {
                (f32::from(s) * alpha + f32::from(b) * (1.0 - alpha))
                    .round()
                    .clamp(0.0, 255.0) as u8
            };
            *dst = Rgb([
                mix(src[0], background.r),
                mix(src[1], background.g),
                mix(src[2], background.b),
            ]);
        }
        flattened
    }

    /// File extension (without the dot) for a format
    ///
    /// ```rust
    /// use pixkit::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    #[must_use]
    pub fn mime_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
        }
    }

    /// Check if a format keeps the alpha channel
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::WebP => true,
            OutputFormat::Jpeg => false,
        }
    }

    /// Whether the quality setting changes the encoded output
    #[must_use]
    pub fn uses_quality(format: OutputFormat) -> bool {
        matches!(format, OutputFormat::Jpeg)
    }
}

fn encode_error(format_name: &str, error: &image::ImageError) -> PixkitError {
    PixkitError::processing_stage_error(
        "encoding",
        &format!("Failed to encode {}: {}", format_name, error),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn half_transparent() -> RgbaImage {
        RgbaImage::from_pixel(6, 4, Rgba([200, 100, 50, 128]))
    }

    #[test]
    fn test_png_keeps_alpha_and_ignores_quality() {
        let image = half_transparent();
        let low = OutputFormatHandler::encode(&image, OutputFormat::Png, 1).unwrap();
        let high = OutputFormatHandler::encode(&image, OutputFormat::Png, 100).unwrap();
        assert_eq!(low, high);

        let decoded = image::load_from_memory(&low).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_jpeg_flattens_over_black() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 0]));
        let bytes = OutputFormatHandler::encode(&image, OutputFormat::Jpeg, 90).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert!(decoded.pixels().all(|p| p.0.iter().all(|&c| c < 8)));
    }

    #[test]
    fn test_jpeg_quality_affects_size() {
        let mut image = RgbaImage::new(64, 64);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8, 255]);
        }
        let small = OutputFormatHandler::encode(&image, OutputFormat::Jpeg, 10).unwrap();
        let large = OutputFormatHandler::encode(&image, OutputFormat::Jpeg, 100).unwrap();
        assert!(small.len() < large.len());
    }

    #[cfg(feature = "webp-support")]
    #[test]
    fn test_webp_is_lossless() {
        let image = half_transparent();
        let bytes = OutputFormatHandler::encode(&image, OutputFormat::WebP, 50).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_flatten_onto_color() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let flat = OutputFormatHandler::flatten_onto(&image, RgbColor::WHITE);
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(OutputFormatHandler::extension(OutputFormat::WebP), "webp");
        assert_eq!(OutputFormatHandler::mime_type(OutputFormat::Jpeg), "image/jpeg");
        assert!(OutputFormatHandler::supports_transparency(OutputFormat::Png));
        assert!(!OutputFormatHandler::supports_transparency(OutputFormat::Jpeg));
        assert!(!OutputFormatHandler::uses_quality(OutputFormat::Png));
    }
}
