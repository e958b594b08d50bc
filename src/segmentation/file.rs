//! Mask producer backed by a pre-computed mask image on disk

use crate::{
    config::ModelOptions,
    error::{PixkitError, Result},
    segmentation::MaskProducer,
    types::{SegmentationMask, SourceImage},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads a grayscale (or alpha) mask image produced by an external segmenter
///
/// Any mask resolution is accepted; the compositor scales it to the source.
#[derive(Debug, Clone)]
pub struct FileMaskProducer {
    path: PathBuf,
    cached: Option<SegmentationMask>,
}

impl FileMaskProducer {
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cached: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MaskProducer for FileMaskProducer {
    fn name(&self) -> &str {
        "mask-file"
    }

    async fn initialize(&mut self, _options: &ModelOptions) -> Result<()> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| PixkitError::file_io_error("read mask file", &self.path, &e))?;
        let image = image::load_from_memory(&bytes).map_err(|e| {
            PixkitError::model_unavailable(format!(
                "'{}' is not a readable mask image: {}",
                self.path.display(),
                e
            ))
        })?;

        log::debug!(
            "Loaded mask {} ({}x{})",
            self.path.display(),
            image.width(),
            image.height()
        );
        self.cached = Some(SegmentationMask::from_dynamic(&image));
        Ok(())
    }

    async fn segment(&mut self, _image: &SourceImage) -> Result<Option<SegmentationMask>> {
        Ok(self.cached.clone())
    }
}
