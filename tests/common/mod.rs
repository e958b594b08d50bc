//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use pixkit::{MaskProducer, ModelOptions, PixkitError, Result, SegmentationMask, SourceImage};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

/// Opaque image with a horizontal/vertical color gradient
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        *pixel = Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
            255,
        ]);
    }
    image
}

pub fn gradient_source(width: u32, height: u32) -> SourceImage {
    SourceImage::from_rgba(gradient_image(width, height))
}

/// Encode an image in memory
pub fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    // image 0.25's JPEG encoder rejects RGBA; fixtures are opaque, so drop alpha
    if format == ImageFormat::Jpeg {
        image::DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .write_to(&mut cursor, format)
    } else {
        image.write_to(&mut cursor, format)
    }
    .expect("test image should encode");
    buffer
}

/// How a [`ScriptedProducer`] answers segmentation requests
#[derive(Clone)]
pub enum MaskScript {
    /// Same intensity everywhere, at the given mask resolution
    Uniform(f32, (u32, u32)),
    /// Left half foreground, right half background
    LeftHalf,
    /// Fixed mask as given
    Fixed(SegmentationMask),
    /// Capability runs but finds nothing
    Nothing,
}

/// Mask producer with scripted readiness and output
pub struct ScriptedProducer {
    pub script: MaskScript,
    pub init_delay: Duration,
    pub init_failures: usize,
    pub init_calls: Arc<AtomicUsize>,
    pub segment_calls: Arc<AtomicUsize>,
}

impl ScriptedProducer {
    pub fn new(script: MaskScript) -> Self {
        Self {
            script,
            init_delay: Duration::ZERO,
            init_failures: 0,
            init_calls: Arc::new(AtomicUsize::new(0)),
            segment_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn with_init_failures(mut self, failures: usize) -> Self {
        self.init_failures = failures;
        self
    }
}

#[async_trait]
impl MaskProducer for ScriptedProducer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn initialize(&mut self, _options: &ModelOptions) -> Result<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if self.init_failures > 0 {
            self.init_failures -= 1;
            return Err(PixkitError::model_unavailable("scripted setup failure"));
        }
        Ok(())
    }

    async fn segment(&mut self, image: &SourceImage) -> Result<Option<SegmentationMask>> {
        self.segment_calls.fetch_add(1, Ordering::SeqCst);
        let (width, height) = image.dimensions();
        Ok(match &self.script {
            MaskScript::Uniform(value, dims) => Some(SegmentationMask::uniform(*value, *dims)),
            MaskScript::LeftHalf => {
                let data = (0..height)
                    .flat_map(|_| (0..width).map(move |x| if x < width / 2 { 1.0 } else { 0.0 }))
                    .collect();
                Some(SegmentationMask::new(data, (width, height)))
            },
            MaskScript::Fixed(mask) => Some(mask.clone()),
            MaskScript::Nothing => None,
        })
    }
}
