//! Background treatments drawn beneath the cut-out foreground

use crate::{
    error::{PixkitError, Result},
    types::{BackgroundSpec, SourceImage},
};
use image::{imageops, Rgba, RgbaImage};
use tracing::{debug, instrument};

/// Draws a [`BackgroundSpec`] into a target surface
pub struct BackgroundRenderer;

impl BackgroundRenderer {
    /// Render a background at the source image's dimensions
    ///
    /// # Errors
    /// - Invalid background spec (blur radius out of range)
    pub fn render(spec: &BackgroundSpec, source: &SourceImage) -> Result<RgbaImage> {
        let (width, height) = source.dimensions();
        let mut target = RgbaImage::new(width, height);
        Self::render_into(spec, source, &mut target)?;
        Ok(target)
    }

    /// Render a background into an existing surface, replacing all of its pixels
    ///
    /// The surface keeps its own dimensions; a blurred background scales the
    /// source to fit them. Nothing drawn by a previous call survives.
    ///
    /// # Errors
    /// - Invalid background spec (blur radius out of range)
    /// - Zero-area target surface
    #[instrument(skip(source, target), fields(width = target.width(), height = target.height()))]
    pub fn render_into(
        spec: &BackgroundSpec,
        source: &SourceImage,
        target: &mut RgbaImage,
    ) -> Result<()> {
        spec.validate()?;
        let (width, height) = target.dimensions();
        if width == 0 || height == 0 {
            return Err(PixkitError::processing(
                "Cannot render a background into an empty surface",
            ));
        }

        match spec {
            BackgroundSpec::Transparent => Self::fill(target, Rgba([0, 0, 0, 0])),
            BackgroundSpec::SolidColor { color } => Self::fill(target, color.to_rgba(255)),
            BackgroundSpec::Blur { radius } => {
                let scaled = Self::scale_to(source.pixels(), width, height);
                let backdrop = if *radius == 0 {
                    scaled
                } else {
                    imageops::blur(&scaled, *radius as f32)
                };
                debug!(radius, "Rendered blurred backdrop");
                target.copy_from_slice(backdrop.as_raw());
            },
        }

        Ok(())
    }

    fn fill(target: &mut RgbaImage, color: Rgba<u8>) {
        for pixel in target.pixels_mut() {
            *pixel = color;
        }
    }

    /// Source pixels at the requested size; unchanged when the size already matches
    pub(crate) fn scale_to(image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        if image.dimensions() == (width, height) {
            image.clone()
        } else {
            imageops::resize(image, width, height, imageops::FilterType::Triangle)
        }
    }
}
