//! Segmentation capability abstraction
//!
//! The segmentation model is an external collaborator: pixkit only consumes its
//! masks. A [`MaskProducer`] wraps a concrete capability; the
//! [`SegmentationService`] owns one producer and drives it through an explicit
//! readiness state machine, with lazy setup bounded by a single timeout.

mod file;

#[cfg(test)]
pub(crate) mod test_utils;

pub use file::FileMaskProducer;

use crate::{
    config::{ModelOptions, ToolConfig},
    error::{PixkitError, Result},
    types::{SegmentationMask, SourceImage},
};
use async_trait::async_trait;
use instant::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// A capability that turns an image into a foreground mask
#[async_trait]
pub trait MaskProducer: Send {
    /// Human-readable name used in logs and error messages
    fn name(&self) -> &str;

    /// Perform capability setup; resolves once the capability is ready to segment
    ///
    /// # Errors
    /// - Setup failed (missing model assets, unsupported options)
    async fn initialize(&mut self, options: &ModelOptions) -> Result<()>;

    /// Segment one image; resolves exactly once per call
    ///
    /// `Ok(None)` means the capability ran but produced no usable mask.
    ///
    /// # Errors
    /// - Capability failure while running
    async fn segment(&mut self, image: &SourceImage) -> Result<Option<SegmentationMask>>;
}

/// Readiness of the wrapped capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerState {
    /// Setup has not been attempted yet
    Uninitialized,
    /// Setup completed; requests go straight to segmentation
    Ready,
    /// The last setup attempt failed or timed out; the next request retries
    Unavailable { reason: String },
}

/// Drives a [`MaskProducer`] through lazy, memoized, time-bounded initialization
pub struct SegmentationService {
    producer: Box<dyn MaskProducer>,
    options: ModelOptions,
    ready_timeout: Duration,
    state: ProducerState,
}

impl SegmentationService {
    /// Create a service; the producer is not initialized until the first request
    #[must_use]
    pub fn new(producer: Box<dyn MaskProducer>, options: ModelOptions, ready_timeout: Duration) -> Self {
        Self {
            producer,
            options,
            ready_timeout,
            state: ProducerState::Uninitialized,
        }
    }

    /// Create a service using the model options and readiness budget of a `ToolConfig`
    #[must_use]
    pub fn from_config(producer: Box<dyn MaskProducer>, config: &ToolConfig) -> Self {
        Self::new(producer, config.model.clone(), config.ready_timeout())
    }

    #[must_use]
    pub fn state(&self) -> &ProducerState {
        &self.state
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ProducerState::Ready
    }

    #[must_use]
    pub fn producer_name(&self) -> &str {
        self.producer.name()
    }

    /// Bring the capability to `Ready`, running setup at most once per success
    ///
    /// # Errors
    /// - `ModelUnavailable` when setup fails or exceeds the readiness budget
    #[instrument(skip(self), fields(producer = %self.producer.name()))]
    pub async fn ensure_ready(&mut self) -> Result<()> {
        if self.state == ProducerState::Ready {
            return Ok(());
        }

        info!(
            timeout_ms = self.ready_timeout.as_millis() as u64,
            asset_location = %self.options.asset_location,
            selection = ?self.options.selection,
            "Initializing segmentation capability"
        );
        let start = Instant::now();

        let outcome =
            tokio::time::timeout(self.ready_timeout, self.producer.initialize(&self.options)).await;

        match outcome {
            Ok(Ok(())) => {
                debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Segmentation capability ready"
                );
                self.state = ProducerState::Ready;
                Ok(())
            },
            Ok(Err(e)) => {
                let reason = format!("{} failed to initialize: {}", self.producer.name(), e);
                warn!(reason = %reason, "Segmentation capability unavailable");
                self.state = ProducerState::Unavailable {
                    reason: reason.clone(),
                };
                Err(PixkitError::model_unavailable(reason))
            },
            Err(_elapsed) => {
                let reason = format!(
                    "{} did not become ready within {}ms",
                    self.producer.name(),
                    self.ready_timeout.as_millis()
                );
                warn!(reason = %reason, "Segmentation capability unavailable");
                self.state = ProducerState::Unavailable {
                    reason: reason.clone(),
                };
                Err(PixkitError::model_unavailable(reason))
            },
        }
    }

    /// Request a mask for `image`
    ///
    /// # Errors
    /// - `ModelUnavailable` when the capability cannot be brought up
    /// - `SegmentationFailed` when it runs but yields no usable mask
    #[instrument(
        skip(self, image),
        fields(
            producer = %self.producer.name(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub async fn request_segmentation(&mut self, image: &SourceImage) -> Result<SegmentationMask> {
        self.ensure_ready().await?;

        let start = Instant::now();
        let mask = match self.producer.segment(image).await {
            Ok(Some(mask)) => mask,
            Ok(None) => {
                return Err(PixkitError::segmentation_failed(format!(
                    "{} returned no mask",
                    self.producer.name()
                )));
            },
            Err(e @ PixkitError::SegmentationFailed(_)) => return Err(e),
            Err(e) => {
                return Err(PixkitError::segmentation_failed(format!(
                    "{}: {}",
                    self.producer.name(),
                    e
                )));
            },
        };

        if mask.is_empty() {
            return Err(PixkitError::segmentation_failed(format!(
                "{} returned an empty mask",
                self.producer.name()
            )));
        }

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            mask_width = mask.width(),
            mask_height = mask.height(),
            "Segmentation completed"
        );
        Ok(mask)
    }
}
