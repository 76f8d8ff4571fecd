//! Core types for block-partitioned star analysis.
//!
//! This module contains the foundational pieces the pipeline is built on:
//! - Block geometry and per-block, per-image and per-dataset results
//! - Partitioning of an image into blocks
//! - Analysis configuration
//! - Error types

pub mod config;
pub mod error;
pub mod partition;
pub mod types;

// Re-export commonly used types
pub use config::AnalysisConfig;
pub use error::{AnalysisError, ConfigError, ImageError, ReportError, StarscanError};
pub use partition::{partition, BlockPartition};
pub use types::{BlockRegion, BlockResult, DatasetRow, ImageResult, Region};
