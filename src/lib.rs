#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]

//! # pixkit
//!
//! Local image utility: resize, format conversion and mask-driven background
//! replacement, with no server component.
//!
//! The core is the background-removal pipeline. An external segmentation
//! capability (anything implementing [`MaskProducer`]) produces a per-pixel
//! foreground mask; pixkit scales that mask to the image, cuts the foreground
//! out with the mask as continuous opacity and draws it over a transparent,
//! solid-color or blurred background.
//!
//! ## Features
//!
//! - **Background replacement**: transparent, solid color or blurred original
//! - **Soft edges**: mask intensities are opacity, never thresholded
//! - **Readiness handling**: lazy capability setup bounded by one timeout
//! - **Stale-result safety**: request generations discard superseded masks
//! - **Resize and convert**: JPEG/PNG/WebP export with download file names
//! - **Offline assets**: versioned static-asset cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pixkit::{BackgroundSpec, EditorSession, FileMaskProducer, SegmentationService, ToolConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ToolConfig::default();
//! let mut session = EditorSession::new(&config);
//! session.load_image(&std::fs::read("portrait.jpg")?, "image/jpeg")?;
//!
//! let producer = FileMaskProducer::new("portrait_mask.png");
//! let mut service = SegmentationService::from_config(Box::new(producer), &config);
//! session.remove_background(&mut service).await?;
//!
//! session.set_background("blur:8".parse::<BackgroundSpec>()?)?;
//! let png = session.export_png()?;
//! std::fs::write(png.file_name("background_removed"), &png.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface, progress spinner and tracing setup
//! - `webp-support` (default): WebP encoding and decoding
//! - `tracing-json`, `tracing-files`: extra log outputs for the CLI

pub mod background;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod convert;
pub mod error;
pub mod resize;
pub mod segmentation;
pub mod services;
pub mod session;
pub mod surface;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;

pub use background::BackgroundRenderer;
pub use cache::{AssetCache, AssetSource, FetchedAsset, CACHE_NAME, PRECACHE_PATHS};
pub use compositor::{blend_source_over, CompositeWarning, MaskCompositor};
pub use config::{ModelOptions, ModelSelection, OutputFormat, ToolConfig, ToolConfigBuilder};
pub use convert::{ConvertRequest, CONVERTED_PREFIX};
pub use error::{PixkitError, Result};
pub use resize::{
    estimate_file_size, format_file_size, linked_dimensions, Dimension, ResizeRequest,
    RESIZED_PREFIX,
};
pub use segmentation::{FileMaskProducer, MaskProducer, ProducerState, SegmentationService};
pub use services::{
    ImageIOService, NoOpProgressReporter, OutputFormatHandler, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate, TracingProgressReporter,
};
pub use session::{EditorSession, SegmentationOutcome, SegmentationTicket};
pub use surface::{EncodedImage, PreviewSurface, BACKGROUND_REMOVED_PREFIX};
pub use types::{
    BackgroundSpec, CompositeResult, CompositeTimings, MaskStatistics, RgbColor,
    SegmentationMask, SourceImage, MAX_BLUR_RADIUS,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, spans, TracingConfig, TracingFormat, TracingOutput};

/// Replace the background of an image provided as bytes
///
/// One-shot form of the session workflow: load, segment, composite. Any
/// warnings raised while compositing are returned with the result.
///
/// # Arguments
///
/// * `image_bytes` - Encoded image data
/// * `mime_type` - Declared MIME type; must start with `image/`
/// * `producer` - Segmentation capability to run
/// * `background` - Background treatment for the result
/// * `config` - Readiness budget and model options
///
/// # Examples
///
/// ```rust,no_run
/// use pixkit::{remove_background_from_bytes, BackgroundSpec, FileMaskProducer, ToolConfig};
///
/// # async fn example(upload: Vec<u8>) -> anyhow::Result<()> {
/// let (result, warnings) = remove_background_from_bytes(
///     &upload,
///     "image/png",
///     Box::new(FileMaskProducer::new("mask.png")),
///     BackgroundSpec::Transparent,
///     &ToolConfig::default(),
/// )
/// .await?;
/// assert!(warnings.is_empty() || result.fallback);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - `InvalidInput` for non-image or undecodable input
/// - `ModelUnavailable` / `SegmentationFailed` from the capability
/// - `InvalidConfig` for an out-of-range background
pub async fn remove_background_from_bytes(
    image_bytes: &[u8],
    mime_type: &str,
    producer: Box<dyn MaskProducer>,
    background: BackgroundSpec,
    config: &ToolConfig,
) -> Result<(CompositeResult, Vec<CompositeWarning>)> {
    background.validate()?;

    let mut session = EditorSession::new(config);
    session.load_image(image_bytes, mime_type)?;
    session.set_background(background)?;

    let mut service = SegmentationService::from_config(producer, config);
    session.remove_background(&mut service).await?;

    let warnings = session.take_warnings();
    let result = session
        .composite()
        .cloned()
        .ok_or_else(|| PixkitError::internal("Segmentation completed without a composite"))?;
    Ok((result, warnings))
}
