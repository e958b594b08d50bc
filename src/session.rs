//! Editing session state for the background-removal workflow
//!
//! One [`EditorSession`] owns the loaded source image, at most one mask for it,
//! the selected background and the preview surface. Segmentation runs as a
//! ticketed request: every request (and every image load) bumps the session
//! generation, and a result whose ticket generation no longer matches is
//! discarded on arrival instead of overwriting newer state.

use crate::{
    compositor::{CompositeWarning, MaskCompositor},
    config::ToolConfig,
    error::{PixkitError, Result},
    segmentation::SegmentationService,
    services::{ImageIOService, ProcessingStage, ProgressReporter, ProgressTracker},
    surface::{EncodedImage, PreviewSurface},
    types::{BackgroundSpec, CompositeResult, SegmentationMask, SourceImage},
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Handle for one in-flight segmentation request
#[derive(Debug, Clone)]
pub struct SegmentationTicket {
    generation: u64,
    image: Arc<SourceImage>,
}

impl SegmentationTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Image the request was issued for
    #[must_use]
    pub fn image(&self) -> &SourceImage {
        &self.image
    }
}

/// What happened to a segmentation result when it reached the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationOutcome {
    /// The mask was stored and the preview recomposited
    Applied,
    /// A newer request or image load superseded the ticket; nothing changed
    Discarded,
}

/// Explicit editing state: one source image, at most one mask, one preview
pub struct EditorSession {
    source: Option<Arc<SourceImage>>,
    mask: Option<SegmentationMask>,
    generation: u64,
    background: BackgroundSpec,
    surface: PreviewSurface,
    warnings: Vec<CompositeWarning>,
    progress: ProgressTracker,
    log_timings: bool,
}

impl EditorSession {
    /// Create an empty session using the configured default background
    #[must_use]
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            source: None,
            mask: None,
            generation: 0,
            background: config.default_background,
            surface: PreviewSurface::new(),
            warnings: Vec::new(),
            progress: ProgressTracker::no_op(),
            log_timings: config.debug,
        }
    }

    /// Attach a progress reporter for removal runs
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.progress = ProgressTracker::new(reporter);
        self
    }

    #[must_use]
    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn mask(&self) -> Option<&SegmentationMask> {
        self.mask.as_ref()
    }

    #[must_use]
    pub fn background(&self) -> &BackgroundSpec {
        &self.background
    }

    #[must_use]
    pub fn surface(&self) -> &PreviewSurface {
        &self.surface
    }

    /// Composite currently on the preview surface
    #[must_use]
    pub fn composite(&self) -> Option<&CompositeResult> {
        self.surface.current()
    }

    /// Current request generation; results from older generations are discarded
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Decode and load a new image
    ///
    /// A rejected file leaves the session exactly as it was.
    ///
    /// # Errors
    /// - `InvalidInput` for a non-image MIME type or undecodable bytes
    pub fn load_image(&mut self, bytes: &[u8], mime_type: &str) -> Result<()> {
        self.progress.reset();
        self.progress.report_stage(ProcessingStage::ImageLoading);
        let source = ImageIOService::load_from_bytes(bytes, mime_type).map_err(|e| {
            self.progress.report_error(&e.to_string());
            e
        })?;
        self.set_source(source);
        Ok(())
    }

    /// Replace the source image, discarding its mask and composite
    ///
    /// Any in-flight segmentation request is orphaned.
    pub fn set_source(&mut self, source: SourceImage) {
        info!(
            width = source.width(),
            height = source.height(),
            mime_type = source.mime_type().unwrap_or("unknown"),
            "Loaded source image"
        );
        self.source = Some(Arc::new(source));
        self.mask = None;
        self.surface.clear();
        self.generation += 1;
    }

    /// Start a segmentation request for the current image
    ///
    /// # Errors
    /// - `InvalidInput` when no image is loaded
    pub fn begin_segmentation(&mut self) -> Result<SegmentationTicket> {
        let image = self
            .source
            .clone()
            .ok_or_else(|| PixkitError::invalid_input("Please select an image first"))?;
        self.generation += 1;
        debug!(generation = self.generation, "Issued segmentation ticket");
        Ok(SegmentationTicket {
            generation: self.generation,
            image,
        })
    }

    /// Deliver the result of a segmentation request
    ///
    /// Stale tickets are discarded whatever their outcome. The mask is only
    /// stored once its composite has been built, so any failure leaves the
    /// previous mask and composite untouched.
    ///
    /// # Errors
    /// - The request's own error, for a current ticket
    /// - Background cannot be rendered for the current image
    #[instrument(skip(self, ticket, outcome), fields(generation = ticket.generation))]
    pub fn complete_segmentation(
        &mut self,
        ticket: SegmentationTicket,
        outcome: Result<SegmentationMask>,
    ) -> Result<SegmentationOutcome> {
        if ticket.generation != self.generation {
            debug!(
                current = self.generation,
                "Discarding segmentation result from a superseded request"
            );
            return Ok(SegmentationOutcome::Discarded);
        }

        let mask = match outcome {
            Ok(mask) => mask,
            Err(e) => {
                warn!(error = %e, "Segmentation request failed");
                self.progress.report_error(&e.to_string());
                return Err(e);
            },
        };

        let stats = mask.statistics();
        debug!(
            mask_width = mask.width(),
            mask_height = mask.height(),
            foreground_ratio = stats.foreground_ratio,
            "Received segmentation mask"
        );

        self.progress.report_stage(ProcessingStage::Compositing);
        let (result, warning) = MaskCompositor::composite_or_fallback(
            ticket.image(),
            &mask,
            &self.background,
        )
        .map_err(|e| {
            self.progress.report_error(&e.to_string());
            e
        })?;

        self.mask = Some(mask);
        self.present(result, warning);
        Ok(SegmentationOutcome::Applied)
    }

    /// Run a full removal: request a mask, wait for it and composite
    ///
    /// # Errors
    /// - `InvalidInput` when no image is loaded
    /// - `ModelUnavailable` or `SegmentationFailed` from the service
    pub async fn remove_background(
        &mut self,
        service: &mut SegmentationService,
    ) -> Result<SegmentationOutcome> {
        let ticket = self.begin_segmentation()?;
        self.progress.reset();

        if !service.is_ready() {
            self.progress.report_stage(ProcessingStage::ModelInitialization);
        }
        self.progress.report_stage(ProcessingStage::Segmentation);

        let outcome = service.request_segmentation(ticket.image()).await;
        let result = self.complete_segmentation(ticket, outcome)?;

        if let Some(composite) = self.surface.current() {
            self.progress.report_stage(ProcessingStage::Completed);
            self.progress.report_completion(composite.timings.clone());
        }
        Ok(result)
    }

    /// Select a background and recomposite when a mask is available
    ///
    /// # Errors
    /// - Blur radius out of range or background cannot be rendered (the
    ///   previous selection and composite are kept)
    pub fn set_background(&mut self, background: BackgroundSpec) -> Result<Option<&CompositeResult>> {
        background.validate()?;
        let composed = self.compose(&background)?;
        self.background = background;
        Ok(match composed {
            Some((result, warning)) => self.present(result, warning),
            None => None,
        })
    }

    /// Recomposite the current image, mask and background
    ///
    /// Returns `None` without touching the surface when there is no image or
    /// no mask yet. A mask that cannot be applied puts the unmodified source on
    /// the surface and records a warning.
    ///
    /// # Errors
    /// - Invalid background spec
    pub fn refresh_preview(&mut self) -> Result<Option<&CompositeResult>> {
        let background = self.background;
        Ok(match self.compose(&background)? {
            Some((result, warning)) => self.present(result, warning),
            None => None,
        })
    }

    /// Composite the current image and mask over `background`; the mask and surface are not modified
    fn compose(
        &mut self,
        background: &BackgroundSpec,
    ) -> Result<Option<(CompositeResult, Option<CompositeWarning>)>> {
        let (Some(source), Some(mask)) = (self.source.as_ref(), self.mask.as_ref()) else {
            return Ok(None);
        };

        self.progress.report_stage(ProcessingStage::Compositing);
        MaskCompositor::composite_or_fallback(source, mask, background).map(Some)
    }

    fn present(
        &mut self,
        result: CompositeResult,
        warning: Option<CompositeWarning>,
    ) -> Option<&CompositeResult> {
        if self.log_timings {
            info!(
                background_ms = result.timings.background_ms,
                cutout_ms = result.timings.cutout_ms,
                total_ms = result.timings.total_ms,
                fallback = result.fallback,
                "Composite timings"
            );
        }
        if let Some(warning) = warning {
            self.warnings.push(warning);
        }
        self.surface.present(result);
        self.surface.current()
    }

    /// Drain warnings recorded since the last call
    pub fn take_warnings(&mut self) -> Vec<CompositeWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Encode the preview as a PNG download
    ///
    /// # Errors
    /// - Nothing has been composited yet
    pub fn export_png(&mut self) -> Result<EncodedImage> {
        self.progress.report_stage(ProcessingStage::Encoding);
        self.surface.export_png()
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(&ToolConfig::default())
    }
}
