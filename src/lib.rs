//! # Starscan - Block-parallel Star Detection
//!
//! Starscan counts bright point-like features ("stars") in a folder of
//! astronomical images. Each image is cut into a grid of rectangular
//! blocks, every block is analyzed on its own, and the results are folded
//! back into one row per image.
//!
//! ## Features
//!
//! - **Two-level parallelism**: images run concurrently, and so do the blocks
//!   of each image, on one shared worker pool
//! - **Deterministic output**: rows come out in submission order no matter
//!   which image finishes first
//! - **Failure isolation**: an image that fails to decode gets an error row
//!   and never stops its siblings
//! - **Annotation**: optional per-block and whole-image overlays with the
//!   detected region boundaries drawn in
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use starscan::prelude::*;
//!
//! let config = AnalysisConfig::new().with_block_size(256, 160).with_threshold(200);
//! let analyzer = Analyzer::new(config)?;
//!
//! let source = FolderSource::scan("images", &ScanOptions::new())?;
//! let report = analyzer.run(&source, &NullSink, &RunOptions::new());
//!
//! CsvReportWriter::new("stars_analysis.csv").write(&report.rows)?;
//! # Ok::<(), StarscanError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Block geometry, partitioning, configuration, and errors
//! - [`detection`]: Per-block region detection and boundary drawing
//! - [`execution`]: The scheduler, aggregation, and progress tracking
//! - [`io`]: Image sources, annotation sinks, and report writers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod detection;
pub mod execution;
pub mod io;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use starscan::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{BlockRegion, BlockResult, DatasetRow, ImageResult, Region};
    pub use crate::core::config::AnalysisConfig;
    pub use crate::core::partition::{partition, BlockPartition};

    // Errors
    pub use crate::core::error::{
        AnalysisError, ConfigError, ImageError, ReportError, StarscanError, StarscanResult,
    };

    // Detection
    pub use crate::detection::annotate::Outline;
    pub use crate::detection::extractor::{BlockAnalysis, FeatureExtractor};

    // Execution
    pub use crate::execution::aggregate::{aggregate_blocks, DatasetAggregator, DatasetReport};
    pub use crate::execution::analyzer::{Analyzer, ImageAnalysis, RunOptions};
    pub use crate::execution::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};

    // Collaborators
    pub use crate::io::report::{
        report_writer, CsvReportWriter, JsonReportWriter, ReportFormat, ReportWriter,
    };
    pub use crate::io::layout::OutputLayout;
    pub use crate::io::sink::{AnnotationSink, FileAnnotationSink, MemorySink, NullSink};
    pub use crate::io::source::{FolderSource, ImageSource, MemorySource, ScanOptions};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "starscan");
    }

    #[test]
    fn test_default_grid() {
        let config = AnalysisConfig::default();
        let blocks = partition(1024, 640, config.block_width, config.block_height);
        assert_eq!(blocks.len(), 16);
    }

    #[test]
    fn test_prelude_round_trip() {
        let mut image = RgbImage::new(40, 40);
        image.put_pixel(20, 20, Rgb([255, 255, 255]));

        let analyzer = Analyzer::new(
            AnalysisConfig::new()
                .with_block_size(16, 16)
                .with_threads(2)
                .with_annotation(false),
        )
        .unwrap();
        let source = MemorySource::new().with_image("single.png", image);
        let report = analyzer.run(&source, &NullSink, &RunOptions::new());

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].star_count(), Some(1));
    }
}
