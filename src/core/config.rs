//! Analysis configuration.
//!
//! Built with `with_*` methods or read from a TOML file. Missing keys fall
//! back to the defaults below.
//!
//! ```toml
//! block_width = 256
//! block_height = 160
//! threshold = 200
//! num_threads = 0
//! annotate = true
//! outline_color = [0, 0, 255]
//! outline_thickness = 2
//! ```

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default block width in pixels.
pub const DEFAULT_BLOCK_WIDTH: u32 = 256;

/// Default block height in pixels.
pub const DEFAULT_BLOCK_HEIGHT: u32 = 160;

/// Default binarization threshold on the 0-255 luminance scale.
pub const DEFAULT_THRESHOLD: u8 = 200;

/// Configuration for block-parallel star analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Nominal block width.
    pub block_width: u32,
    /// Nominal block height.
    pub block_height: u32,
    /// Pixels with luminance strictly above this are foreground.
    pub threshold: u8,
    /// Number of worker threads (0 = auto).
    pub num_threads: usize,
    /// Whether to produce annotated block and image buffers.
    pub annotate: bool,
    /// Boundary overlay colour (RGB).
    pub outline_color: [u8; 3],
    /// Boundary overlay thickness in pixels.
    pub outline_thickness: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            block_width: DEFAULT_BLOCK_WIDTH,
            block_height: DEFAULT_BLOCK_HEIGHT,
            threshold: DEFAULT_THRESHOLD,
            num_threads: 0,
            annotate: true,
            outline_color: [0, 0, 255],
            outline_thickness: 2,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the nominal block size.
    pub fn with_block_size(mut self, width: u32, height: u32) -> Self {
        self.block_width = width;
        self.block_height = height;
        self
    }

    /// Set the binarization threshold.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the number of worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Enable or disable annotation output.
    pub fn with_annotation(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Set the overlay colour and thickness.
    pub fn with_outline(mut self, color: [u8; 3], thickness: u32) -> Self {
        self.outline_color = color;
        self.outline_thickness = thickness;
        self
    }

    /// Check that the configuration can drive an analysis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_width == 0 || self.block_height == 0 {
            return Err(ConfigError::InvalidBlockSize {
                width: self.block_width,
                height: self.block_height,
            });
        }
        if self.annotate && self.outline_thickness == 0 {
            return Err(ConfigError::InvalidThickness);
        }
        Ok(())
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the worker count, substituting available parallelism for 0.
    pub fn effective_threads(&self) -> usize {
        if self.num_threads > 0 {
            self.num_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}
