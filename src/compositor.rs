//! Mask-driven compositing of a foreground cut-out over a background
//!
//! The compositor renders the background layer, cuts the source image out by
//! the (scaled) segmentation mask and draws the cut-out over the background
//! with non-premultiplied source-over blending. Mask intensities are used as
//! continuous opacity, so soft mask edges become feathered edges in the result.

use crate::{
    background::BackgroundRenderer,
    error::{PixkitError, Result},
    types::{unit_to_u8, BackgroundSpec, CompositeResult, CompositeTimings, SegmentationMask, SourceImage},
};
use chrono::{DateTime, Utc};
use image::{Rgba, RgbaImage};
use instant::Instant;
use serde::{Deserialize, Serialize};
use tracing::{instrument, span, warn, Level};

/// User-visible warning raised when compositing degraded to the unmodified source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeWarning {
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl CompositeWarning {
    #[must_use]
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Combines a source image, its mask and a background into a [`CompositeResult`]
pub struct MaskCompositor;

impl MaskCompositor {
    /// Composite the masked source over the requested background
    ///
    /// # Errors
    /// - `MaskApplication` when the mask is malformed or cannot be scaled
    /// - `InvalidConfig` when the background spec is out of range
    #[instrument(
        skip(source, mask),
        fields(
            dimensions = %format!("{}x{}", source.width(), source.height()),
            mask_dimensions = %format!("{}x{}", mask.width(), mask.height())
        )
    )]
    pub fn composite(
        source: &SourceImage,
        mask: &SegmentationMask,
        background: &BackgroundSpec,
    ) -> Result<CompositeResult> {
        let total_start = Instant::now();
        let (width, height) = source.dimensions();
        let mut timings = CompositeTimings::default();

        let background_start = Instant::now();
        let mut result = {
            let _span = span!(Level::DEBUG, "background_layer", background = %background).entered();
            BackgroundRenderer::render(background, source)?
        };
        timings.background_ms = background_start.elapsed().as_millis() as u64;

        let cutout_start = Instant::now();
        let cutout = {
            let _span = span!(Level::DEBUG, "cutout", width, height).entered();
            let scaled_mask = mask.resize(width, height)?;
            Self::cut_out(source.pixels(), &scaled_mask)?
        };
        timings.cutout_ms = cutout_start.elapsed().as_millis() as u64;

        Self::overlay(&mut result, &cutout)?;
        timings.total_ms = total_start.elapsed().as_millis() as u64;

        Ok(CompositeResult {
            image: result,
            background: *background,
            fallback: false,
            timings,
        })
    }

    /// Composite, degrading to the unmodified source when the mask cannot be applied
    ///
    /// Returns the warning that must be surfaced to the user when the fallback
    /// was taken.
    ///
    /// # Errors
    /// - Errors other than `MaskApplication` (invalid background spec)
    pub fn composite_or_fallback(
        source: &SourceImage,
        mask: &SegmentationMask,
        background: &BackgroundSpec,
    ) -> Result<(CompositeResult, Option<CompositeWarning>)> {
        match Self::composite(source, mask, background) {
            Ok(result) => Ok((result, None)),
            Err(PixkitError::MaskApplication(reason)) => {
                warn!(reason = %reason, "Mask could not be applied, showing the original image");
                let warning = CompositeWarning::new(format!(
                    "Background could not be removed ({}). Showing the original image.",
                    reason
                ));
                let result = CompositeResult {
                    image: source.pixels().clone(),
                    background: *background,
                    fallback: true,
                    timings: CompositeTimings::default(),
                };
                Ok((result, Some(warning)))
            },
            Err(other) => Err(other),
        }
    }

    /// Set each pixel's alpha to its own alpha scaled by the mask intensity; RGB is untouched
    ///
    /// # Errors
    /// - Mask and image dimensions differ
    pub fn cut_out(image: &RgbaImage, mask: &SegmentationMask) -> Result<RgbaImage> {
        if image.dimensions() != mask.dimensions {
            return Err(PixkitError::mask_application(format!(
                "Mask is {}x{} but the image is {}x{}",
                mask.width(),
                mask.height(),
                image.width(),
                image.height()
            )));
        }
        mask.validate()?;

        let mut cutout = image.clone();
        for (pixel, &intensity) in cutout.pixels_mut().zip(&mask.data) {
            pixel[3] = unit_to_u8(f32::from(pixel[3]) / 255.0 * intensity);
        }
        Ok(cutout)
    }

    /// Draw `layer` over `base` in place using source-over blending
    ///
    /// # Errors
    /// - Layer and base dimensions differ
    pub fn overlay(base: &mut RgbaImage, layer: &RgbaImage) -> Result<()> {
        if base.dimensions() != layer.dimensions() {
            return Err(PixkitError::processing(format!(
                "Cannot overlay a {}x{} layer onto a {}x{} surface",
                layer.width(),
                layer.height(),
                base.width(),
                base.height()
            )));
        }

        for (dst, src) in base.pixels_mut().zip(layer.pixels()) {
            *dst = blend_source_over(*dst, *src);
        }
        Ok(())
    }
}

/// Non-premultiplied source-over for a single pixel
#[must_use]
pub fn blend_source_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let src_alpha = f32::from(src[3]) / 255.0;
    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = src_alpha + dst_alpha * (1.0 - src_alpha);

    if out_alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |s: u8, d: u8| {
        let value = (f32::from(s) * src_alpha + f32::from(d) * dst_alpha * (1.0 - src_alpha))
            / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        unit_to_u8(out_alpha),
    ])
}
