//! Parallel execution module.
//!
//! This module schedules block and image tasks and joins their results.

pub mod aggregate;
pub mod analyzer;
pub mod progress;

pub use aggregate::{aggregate_blocks, DatasetAggregator, DatasetReport};
pub use analyzer::{Analyzer, ImageAnalysis, RunOptions};
pub use progress::{ProgressTracker, ProgressUpdate};
