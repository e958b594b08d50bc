//! Mock mask producers for exercising the segmentation service without a model

use crate::{
    config::ModelOptions,
    error::{PixkitError, Result},
    segmentation::MaskProducer,
    types::{SegmentationMask, SourceImage},
};
use async_trait::async_trait;
use instant::Duration;
use std::sync::{Arc, Mutex};

/// Scriptable producer that records every call it receives
#[derive(Debug, Clone)]
pub struct MockMaskProducer {
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    /// Simulated setup latency
    init_delay: Duration,
    /// Number of initialize calls that fail before one succeeds
    failing_inits: usize,
    /// Fixed mask to return; `None` produces a soft-edged disc per image
    mask: Option<SegmentationMask>,
    /// Simulate a capability that runs but finds nothing
    return_none: bool,
}

impl MockMaskProducer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            call_history: Arc::new(Mutex::new(Vec::new())),
            init_delay: Duration::ZERO,
            failing_inits: 0,
            mask: None,
            return_none: false,
        }
    }

    #[must_use]
    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    #[must_use]
    pub fn failing_init_times(mut self, times: usize) -> Self {
        self.failing_inits = times;
        self
    }

    #[must_use]
    pub fn with_mask(mut self, mask: SegmentationMask) -> Self {
        self.mask = Some(mask);
        self
    }

    #[must_use]
    pub fn returning_none(mut self) -> Self {
        self.return_none = true;
        self
    }

    /// Shared handle to the call history, usable after the producer is boxed
    pub fn history(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.call_history)
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }

    /// Circular mask with a linear falloff, sized to the image
    pub fn disc_mask(width: u32, height: u32) -> SegmentationMask {
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius = (width.min(height) as f32 / 3.0).max(1.0);

        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let dx = x as f32 + 0.5 - center_x;
                let dy = y as f32 + 0.5 - center_y;
                let distance = (dx * dx + dy * dy).sqrt();
                data.push(((radius - distance) / radius).clamp(0.0, 1.0));
            }
        }
        SegmentationMask::new(data, (width, height))
    }
}

impl Default for MockMaskProducer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MaskProducer for MockMaskProducer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&mut self, _options: &ModelOptions) -> Result<()> {
        self.record_call("initialize");
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if self.failing_inits > 0 {
            self.failing_inits -= 1;
            return Err(PixkitError::model_unavailable("Mock setup failure"));
        }
        Ok(())
    }

    async fn segment(&mut self, image: &SourceImage) -> Result<Option<SegmentationMask>> {
        self.record_call("segment");
        if self.return_none {
            return Ok(None);
        }
        Ok(Some(self.mask.clone().unwrap_or_else(|| {
            Self::disc_mask(image.width(), image.height())
        })))
    }
}
