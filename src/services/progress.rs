//! Progress stages for background-removal runs
//!
//! Stages are reported by the session; frontends decide how to show them.

use crate::types::CompositeTimings;
use instant::Instant;

/// Stages of a background-removal run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Decoding the selected file
    ImageLoading,
    /// Waiting for the segmentation capability to become ready
    ModelInitialization,
    /// Capability is producing the mask
    Segmentation,
    /// Background layer and cut-out are being drawn
    Compositing,
    /// Encoding the preview for download
    Encoding,
    /// Result is on the preview surface
    Completed,
}

impl ProcessingStage {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ProcessingStage::ImageLoading => "Loading image",
            ProcessingStage::ModelInitialization => "Loading segmentation model",
            ProcessingStage::Segmentation => "Processing image",
            ProcessingStage::Compositing => "Applying background",
            ProcessingStage::Encoding => "Encoding result",
            ProcessingStage::Completed => "Background removed",
        }
    }

    /// Typical progress percentage when the stage begins
    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        match self {
            ProcessingStage::ImageLoading => 5,
            ProcessingStage::ModelInitialization => 15,
            ProcessingStage::Segmentation => 40,
            ProcessingStage::Compositing => 85,
            ProcessingStage::Encoding => 95,
            ProcessingStage::Completed => 100,
        }
    }
}

/// Progress update containing stage and timing information
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub description: String,
    /// Elapsed time since tracking started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            progress: stage.progress_percentage(),
            description: stage.description().to_string(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            stage,
        }
    }
}

/// Receives progress from a session; implementations must be cheap and non-blocking
pub trait ProgressReporter: Send + Sync {
    fn report_progress(&self, update: ProgressUpdate);

    fn report_completion(&self, timings: CompositeTimings);

    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// Discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: CompositeTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Forwards progress to `tracing` events
pub struct TracingProgressReporter {
    verbose: bool,
}

impl TracingProgressReporter {
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for TracingProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if self.verbose {
            tracing::info!(
                progress = update.progress,
                elapsed_ms = update.elapsed_ms,
                "{}",
                update.description
            );
        } else {
            tracing::info!("[{}%] {}", update.progress, update.description);
        }
    }

    fn report_completion(&self, timings: CompositeTimings) {
        tracing::info!(total_ms = timings.total_ms, "Compositing completed");
        if self.verbose {
            tracing::debug!(
                background_ms = timings.background_ms,
                cutout_ms = timings.cutout_ms,
                "Compositing breakdown"
            );
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        tracing::error!(stage = ?stage, "Error during {}: {}", stage.description(), error);
    }
}

/// Tracks elapsed time and the current stage for one reporter
pub struct ProgressTracker {
    reporter: Box<dyn ProgressReporter>,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(reporter: Box<dyn ProgressReporter>) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    #[must_use]
    pub fn no_op() -> Self {
        Self::new(Box::new(NoOpProgressReporter))
    }

    /// Restart the clock for a new run
    pub fn reset(&mut self) {
        self.start_time = Instant::now();
        self.current_stage = None;
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    pub fn report_completion(&self, timings: CompositeTimings) {
        self.reporter.report_completion(timings);
    }

    /// Report an error against the most recently reported stage
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::ImageLoading);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::no_op()
    }
}
