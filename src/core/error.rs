//! Error types for Starscan.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Say which file or block failed
//! - Separate per-image failures (recoverable, reported in the dataset)
//!   from failures that stop a whole run (configuration, report output)
//! - Support error chaining for context

use crate::core::types::BlockRegion;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Starscan.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum StarscanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    ImageTask(#[from] ImageError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while building or loading an [`AnalysisConfig`](crate::core::config::AnalysisConfig).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Block size must be positive, got {width}x{height}")]
    InvalidBlockSize { width: u32, height: u32 },

    #[error("Outline thickness must be positive")]
    InvalidThickness,

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Failed to read configuration file {path}: {error}")]
    Read { path: PathBuf, error: String },
}

/// Failures confined to a single block of a single image.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Block {region} lies outside the {width}x{height} image")]
    BlockOutOfBounds {
        region: BlockRegion,
        width: u32,
        height: u32,
    },

    #[error("Annotated buffer for block {region} is {got_width}x{got_height}")]
    AnnotationSizeMismatch {
        region: BlockRegion,
        got_width: u32,
        got_height: u32,
    },
}

/// Failures confined to a single image of the dataset.
///
/// None of these stop sibling images; the failing image is reported in
/// its own dataset row.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error("Failed to decode '{file_name}': {error}")]
    Decode { file_name: String, error: String },

    #[error("Block analysis failed for '{file_name}': {error}")]
    Block {
        file_name: String,
        error: AnalysisError,
    },

    #[error("Failed to write annotations for '{file_name}': {error}")]
    Annotation { file_name: String, error: String },

    #[error("No image at submission index {0}")]
    MissingIndex(usize),
}

/// Errors while persisting the dataset report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error writing {path}: {error}")]
    Io { path: PathBuf, error: std::io::Error },
}

// ============================================================================
// Error Utilities
// ============================================================================

impl ImageError {
    /// Name of the file this error belongs to, if known.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            ImageError::Decode { file_name, .. }
            | ImageError::Block { file_name, .. }
            | ImageError::Annotation { file_name, .. } => Some(file_name),
            ImageError::MissingIndex(_) => None,
        }
    }

    /// Check if the run can continue with other images.
    ///
    /// A missing submission index means the source and the scheduler
    /// disagree about the dataset, which no other image can recover from.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ImageError::MissingIndex(_))
    }
}

/// Result type alias for Starscan operations.
pub type StarscanResult<T> = Result<T, StarscanError>;

/// Result type alias for per-block analysis.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
