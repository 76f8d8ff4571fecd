//! Two-level parallel analysis of an image dataset.
//!
//! The outer stage runs one task per image; each image task runs one task
//! per block. Both stages share a single rayon pool, so nested block tasks
//! are stolen by idle workers instead of oversubscribing the machine.
//!
//! There are exactly two joins:
//! - an image task collects all of its block results before aggregating,
//! - the dataset stage collects all image outcomes before emitting rows.
//!
//! Image outcomes are placed into pre-assigned slots, so rows always come
//! out in submission order.

use crate::core::config::AnalysisConfig;
use crate::core::error::{AnalysisResult, ImageError, StarscanError, StarscanResult};
use crate::core::partition::partition;
use crate::core::types::{BlockRegion, BlockResult, ImageResult};
use crate::detection::annotate::paste_block;
use crate::detection::extractor::{BlockAnalysis, FeatureExtractor};
use crate::execution::aggregate::{aggregate_blocks, DatasetAggregator, DatasetReport};
use crate::execution::progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
use crate::io::sink::AnnotationSink;
use crate::io::source::ImageSource;
use image::RgbImage;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Everything produced for one image.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    /// Aggregated statistics.
    pub result: ImageResult,
    /// Per-block results in partition order.
    pub blocks: Vec<BlockResult>,
    /// Annotated blocks in partition order, when annotation is enabled.
    pub annotated_blocks: Vec<(BlockRegion, RgbImage)>,
    /// The full image with every block's overlay, when annotation is enabled.
    pub annotated: Option<RgbImage>,
}

/// Dataset run options.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Progress callback.
    pub progress_callback: Option<Arc<ProgressCallback>>,
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl RunOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(Box::new(callback)));
        self
    }
}

/// Runs block-parallel star analysis over images and datasets.
pub struct Analyzer {
    config: AnalysisConfig,
    extractor: FeatureExtractor,
    pool: rayon::ThreadPool,
}

impl Analyzer {
    /// Create an analyzer with its own worker pool.
    pub fn new(config: AnalysisConfig) -> StarscanResult<Self> {
        config.validate()?;
        let threads = config.effective_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("starscan-worker-{}", i))
            .build()?;
        debug!("analyzer pool with {} thread(s)", threads);

        Ok(Self {
            extractor: FeatureExtractor::from_config(&config),
            config,
            pool,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Analyze one image, fanning its blocks out over the pool.
    ///
    /// Any block failure fails the whole image.
    pub fn analyze_image(&self, image: &RgbImage) -> AnalysisResult<ImageAnalysis> {
        self.pool.install(|| self.analyze_blocks(image))
    }

    /// Analyze every image of `source` and emit rows in submission order.
    ///
    /// Annotated buffers go to `sink` from inside each image task, after
    /// that image's blocks have all finished. An image that fails to
    /// decode, analyze, or annotate gets a failed row; it never stops the
    /// other images.
    pub fn run(
        &self,
        source: &dyn ImageSource,
        sink: &dyn AnnotationSink,
        options: &RunOptions,
    ) -> DatasetReport {
        let total = source.len();
        let mut tracker = ProgressTracker::new(total);
        if let Some(callback) = &options.progress_callback {
            let callback = callback.clone();
            tracker = tracker.with_callback(Box::new(move |update| callback(update)));
        }
        tracker.start();

        if total == 0 {
            warn!("no images to analyze");
            tracker.complete();
            return DatasetAggregator::new(0).finish();
        }

        info!(
            "analyzing {} image(s) with {}x{} blocks on {} thread(s)",
            total,
            self.config.block_width,
            self.config.block_height,
            self.threads()
        );

        let outcomes: Vec<(usize, String, Result<ImageResult, ImageError>)> = self.pool.install(|| {
            (0..total)
                .into_par_iter()
                .map(|index| {
                    let file_name = source.name(index).unwrap_or_else(|| format!("#{}", index));
                    let outcome = self.process_image(index, &file_name, source, sink, &tracker);
                    (index, file_name, outcome)
                })
                .collect()
        });

        let mut aggregator = DatasetAggregator::new(total);
        for (index, file_name, outcome) in outcomes {
            aggregator.fill(index, file_name, outcome);
        }
        let report = aggregator.finish();

        tracker.complete();
        info!(
            "analyzed {} image(s), {} failed, {} star(s) total",
            report.len(),
            report.failures().count(),
            report.total_star_count()
        );
        report
    }

    fn process_image(
        &self,
        index: usize,
        file_name: &str,
        source: &dyn ImageSource,
        sink: &dyn AnnotationSink,
        tracker: &ProgressTracker,
    ) -> Result<ImageResult, ImageError> {
        let start = Instant::now();
        tracker.image_started(index, file_name);

        let outcome = source.load(index).and_then(|image| {
            let analysis = self
                .analyze_blocks(&image)
                .map_err(|error| ImageError::Block {
                    file_name: file_name.to_string(),
                    error,
                })?;
            self.write_annotations(file_name, &analysis, sink)?;
            Ok(analysis.result)
        });

        match &outcome {
            Ok(result) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                debug!(
                    "{}: {} star(s), average brightness {:.3} over {} block(s) in {}ms",
                    file_name,
                    result.total_star_count,
                    result.average_brightness,
                    result.block_count,
                    duration_ms
                );
                tracker.image_completed(index, file_name, result.total_star_count, duration_ms);
            }
            Err(error) => {
                warn!("{}", error);
                tracker.image_failed(index, file_name, error.to_string());
            }
        }
        outcome
    }

    /// Block fan-out and join for one image. Must run inside the pool.
    fn analyze_blocks(&self, image: &RgbImage) -> AnalysisResult<ImageAnalysis> {
        let blocks = partition(
            image.width(),
            image.height(),
            self.config.block_width,
            self.config.block_height,
        );

        let analyses: Vec<BlockAnalysis> = blocks
            .par_iter()
            .map(|&region| self.extractor.extract(image, region))
            .collect::<AnalysisResult<_>>()?;

        let mut results = Vec::with_capacity(analyses.len());
        let mut annotated_blocks = Vec::new();
        for analysis in analyses {
            if let Some(buffer) = analysis.annotated {
                annotated_blocks.push((analysis.result.region, buffer));
            }
            results.push(analysis.result);
        }

        let annotated = if self.config.annotate {
            let mut canvas = image.clone();
            for (region, buffer) in &annotated_blocks {
                paste_block(&mut canvas, *region, buffer)?;
            }
            Some(canvas)
        } else {
            None
        };

        Ok(ImageAnalysis {
            result: aggregate_blocks(&results),
            blocks: results,
            annotated_blocks,
            annotated,
        })
    }

    fn write_annotations(
        &self,
        file_name: &str,
        analysis: &ImageAnalysis,
        sink: &dyn AnnotationSink,
    ) -> Result<(), ImageError> {
        let annotation_error = |error: StarscanError| ImageError::Annotation {
            file_name: file_name.to_string(),
            error: error.to_string(),
        };

        analysis
            .annotated_blocks
            .par_iter()
            .try_for_each(|(region, buffer)| sink.write_block(file_name, *region, buffer))
            .map_err(annotation_error)?;

        if let Some(annotated) = &analysis.annotated {
            sink.write_image(file_name, annotated)
                .map_err(annotation_error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sink::{MemorySink, NullSink};
    use crate::io::source::MemorySource;
    use approx::assert_relative_eq;
    use image::Rgb;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Fills a square of side `size` at (x, y) with a grey level.
    fn star(image: &mut RgbImage, x: u32, y: u32, size: u32, level: u8) {
        for yy in y..y + size {
            for xx in x..x + size {
                image.put_pixel(xx, yy, Rgb([level, level, level]));
            }
        }
    }

    fn analyzer(threads: usize) -> Analyzer {
        Analyzer::new(
            AnalysisConfig::new()
                .with_block_size(32, 32)
                .with_threads(threads)
                .with_annotation(false),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Analyzer::new(AnalysisConfig::new().with_block_size(0, 0));
        assert!(matches!(result, Err(StarscanError::Config(_))));
    }

    #[test]
    fn test_analyze_image_aggregates_blocks() {
        // 64x64 in 32x32 blocks: stars in two of the four blocks
        let mut image = RgbImage::new(64, 64);
        star(&mut image, 4, 4, 3, 250);
        star(&mut image, 20, 20, 3, 230);
        star(&mut image, 40, 40, 3, 210);

        let analysis = analyzer(2).analyze_image(&image).unwrap();
        assert_eq!(analysis.blocks.len(), 4);
        assert_eq!(analysis.result.total_star_count, 3);
        assert_eq!(analysis.result.block_count, 4);
        // Block means: 240, 0, 0, 210
        assert_relative_eq!(analysis.result.average_brightness, 112.5, epsilon = 1e-9);
        assert!(analysis.annotated.is_none());
        assert!(analysis.annotated_blocks.is_empty());
    }

    #[test]
    fn test_star_on_block_seam_is_split() {
        let mut image = RgbImage::new(64, 32);
        star(&mut image, 30, 10, 4, 255);

        let analysis = analyzer(2).analyze_image(&image).unwrap();
        assert_eq!(analysis.result.total_star_count, 2);
    }

    #[test]
    fn test_zero_sized_image() {
        let analysis = analyzer(1).analyze_image(&RgbImage::new(0, 0)).unwrap();
        assert_eq!(analysis.result.total_star_count, 0);
        assert_eq!(analysis.result.average_brightness, 0.0);
        assert_eq!(analysis.result.block_count, 0);
    }

    #[test]
    fn test_annotated_image_matches_blocks() {
        let mut image = RgbImage::new(64, 32);
        star(&mut image, 10, 10, 5, 255);
        star(&mut image, 45, 12, 5, 255);

        let analyzer = Analyzer::new(AnalysisConfig::new().with_block_size(32, 32).with_threads(2))
            .unwrap();
        let analysis = analyzer.analyze_image(&image).unwrap();

        let annotated = analysis.annotated.unwrap();
        assert_eq!(annotated.dimensions(), (64, 32));
        assert_eq!(analysis.annotated_blocks.len(), 2);
        for (region, block) in &analysis.annotated_blocks {
            for (x, y, pixel) in block.enumerate_pixels() {
                assert_eq!(annotated.get_pixel(region.x + x, region.y + y), pixel);
            }
        }
        assert!(annotated.pixels().any(|p| *p == Rgb([0, 0, 255])));
    }

    #[test]
    fn test_run_writes_annotations() {
        let mut image = RgbImage::new(64, 32);
        star(&mut image, 10, 10, 5, 255);
        let source = MemorySource::new().with_image("sky.png", image);
        let sink = MemorySink::new();

        let analyzer = Analyzer::new(AnalysisConfig::new().with_block_size(32, 32).with_threads(2))
            .unwrap();
        let report = analyzer.run(&source, &sink, &RunOptions::new());

        assert!(report.is_complete());
        assert_eq!(report.rows[0].star_count(), Some(1));
        let mut blocks = sink.take_blocks();
        blocks.sort_by_key(|(_, region, _)| region.x);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].1, BlockRegion::new(32, 0, 32, 32));
        assert_eq!(sink.take_images().len(), 1);
    }

    #[test]
    fn test_failed_image_does_not_stop_siblings() {
        let mut bright = RgbImage::new(32, 32);
        star(&mut bright, 8, 8, 4, 240);
        let source = MemorySource::new()
            .with_image("a.png", bright.clone())
            .with_failure("b.png", "truncated file")
            .with_image("c.png", bright);

        let report = analyzer(3).run(&source, &NullSink, &RunOptions::new());
        assert_eq!(report.len(), 3);
        assert_eq!(report.rows[0].star_count(), Some(1));
        assert!(report.rows[1].error().unwrap().contains("truncated file"));
        assert_eq!(report.rows[2].star_count(), Some(1));
        assert!(!report.is_complete());
    }

    #[test]
    fn test_empty_dataset() {
        let report = analyzer(1).run(&MemorySource::new(), &NullSink, &RunOptions::new());
        assert!(report.is_empty());
    }

    /// Decodes images with a delay that shrinks with the index, so later
    /// submissions tend to finish first.
    struct DelayedSource {
        inner: MemorySource,
        completion_order: Mutex<Vec<usize>>,
    }

    impl ImageSource for DelayedSource {
        fn len(&self) -> usize {
            self.inner.len()
        }

        fn name(&self, index: usize) -> Option<String> {
            self.inner.name(index)
        }

        fn load(&self, index: usize) -> Result<RgbImage, ImageError> {
            let delay = (self.len() - index) as u64 * 15;
            std::thread::sleep(Duration::from_millis(delay));
            self.completion_order.lock().push(index);
            self.inner.load(index)
        }
    }

    #[test]
    fn test_rows_follow_submission_order() {
        let mut inner = MemorySource::new();
        for i in 0..8u32 {
            let mut image = RgbImage::new(64, 64);
            // Image i has i + 1 stars spread over separate blocks
            for s in 0..=i {
                star(&mut image, (s % 8) * 8 + 1, (s / 8) * 8 + 1, 2, 250);
            }
            inner.push(format!("img_{}.png", i), image);
        }
        let source = DelayedSource {
            inner,
            completion_order: Mutex::new(Vec::new()),
        };

        let report = analyzer(4).run(&source, &NullSink, &RunOptions::new());

        let names: Vec<_> = report.rows.iter().map(|r| r.file_name.clone()).collect();
        let expected: Vec<_> = (0..8).map(|i| format!("img_{}.png", i)).collect();
        assert_eq!(names, expected);
        for (i, row) in report.rows.iter().enumerate() {
            assert_eq!(row.star_count(), Some(i + 1));
        }
        // Later submissions decode faster, so completion order is shuffled
        let completion_order = source.completion_order.lock();
        assert_eq!(completion_order.len(), 8);
        assert_ne!(*completion_order, (0..8).collect::<Vec<usize>>());
    }

    #[test]
    fn test_progress_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let options = RunOptions::new().with_progress(move |update| {
            sink_events.lock().push(update);
        });

        let source = MemorySource::new()
            .with_image("a.png", RgbImage::new(8, 8))
            .with_failure("b.png", "bad");
        analyzer(2).run(&source, &NullSink, &options);

        let events = events.lock();
        assert!(matches!(events.first(), Some(ProgressUpdate::Started { total_images: 2 })));
        assert!(matches!(
            events.last(),
            Some(ProgressUpdate::Completed {
                images_processed: 1,
                images_failed: 1,
                ..
            })
        ));
    }
}
