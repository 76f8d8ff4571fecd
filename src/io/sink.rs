//! Annotation sinks: where annotated blocks and images are persisted.
//!
//! The numeric pipeline hands finished buffers to a sink after the block
//! barrier of each image. Sinks never see partially analyzed images.

use crate::core::error::StarscanError;
use crate::core::types::BlockRegion;
use image::RgbImage;
use log::debug;
use std::path::{Path, PathBuf};

/// Default directory for annotated block images.
pub const DEFAULT_CHUNKS_DIR: &str = "output_chunks";

/// Default directory for annotated full images and the report.
pub const DEFAULT_IMAGES_DIR: &str = "output_images";

/// Receives annotated buffers.
pub trait AnnotationSink: Send + Sync {
    /// Persist one annotated block of `file_name`.
    fn write_block(
        &self,
        file_name: &str,
        region: BlockRegion,
        block: &RgbImage,
    ) -> Result<(), StarscanError>;

    /// Persist the whole annotated image.
    fn write_image(&self, file_name: &str, image: &RgbImage) -> Result<(), StarscanError>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AnnotationSink for NullSink {
    fn write_block(&self, _: &str, _: BlockRegion, _: &RgbImage) -> Result<(), StarscanError> {
        Ok(())
    }

    fn write_image(&self, _: &str, _: &RgbImage) -> Result<(), StarscanError> {
        Ok(())
    }
}

/// Writes blocks to `<chunks>/<file_name>/block_<y>_<x>.jpg` and full
/// images to `<images>/<file_name>`.
///
/// Names with `/` separators land in matching sub-directories.
#[derive(Debug, Clone)]
pub struct FileAnnotationSink {
    chunks_dir: PathBuf,
    images_dir: PathBuf,
}

impl FileAnnotationSink {
    /// Create a sink writing under the given directories.
    pub fn new(chunks_dir: impl Into<PathBuf>, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            chunks_dir: chunks_dir.into(),
            images_dir: images_dir.into(),
        }
    }

    /// Create both output directories.
    pub fn prepare(&self) -> Result<(), StarscanError> {
        std::fs::create_dir_all(&self.chunks_dir)?;
        std::fs::create_dir_all(&self.images_dir)?;
        Ok(())
    }

    /// Path of the annotated block for `file_name` at `region`.
    pub fn block_path(&self, file_name: &str, region: BlockRegion) -> PathBuf {
        self.chunks_dir
            .join(file_name)
            .join(format!("block_{}_{}.jpg", region.y, region.x))
    }

    /// Path of the annotated full image for `file_name`.
    pub fn image_path(&self, file_name: &str) -> PathBuf {
        self.images_dir.join(file_name)
    }

    /// Directory for annotated full images.
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }
}

impl Default for FileAnnotationSink {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNKS_DIR, DEFAULT_IMAGES_DIR)
    }
}

impl AnnotationSink for FileAnnotationSink {
    fn write_block(
        &self,
        file_name: &str,
        region: BlockRegion,
        block: &RgbImage,
    ) -> Result<(), StarscanError> {
        let path = self.block_path(file_name, region);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        block.save(&path)?;
        Ok(())
    }

    fn write_image(&self, file_name: &str, image: &RgbImage) -> Result<(), StarscanError> {
        let path = self.image_path(file_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        image.save(&path)?;
        debug!("wrote {}", path.display());
        Ok(())
    }
}

/// Keeps annotated buffers in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    blocks: parking_lot::Mutex<Vec<(String, BlockRegion, RgbImage)>>,
    images: parking_lot::Mutex<Vec<(String, RgbImage)>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the stored blocks.
    pub fn take_blocks(&self) -> Vec<(String, BlockRegion, RgbImage)> {
        std::mem::take(&mut *self.blocks.lock())
    }

    /// Take the stored full images.
    pub fn take_images(&self) -> Vec<(String, RgbImage)> {
        std::mem::take(&mut *self.images.lock())
    }
}

impl AnnotationSink for MemorySink {
    fn write_block(
        &self,
        file_name: &str,
        region: BlockRegion,
        block: &RgbImage,
    ) -> Result<(), StarscanError> {
        self.blocks
            .lock()
            .push((file_name.to_string(), region, block.clone()));
        Ok(())
    }

    fn write_image(&self, file_name: &str, image: &RgbImage) -> Result<(), StarscanError> {
        self.images.lock().push((file_name.to_string(), image.clone()));
        Ok(())
    }
}
