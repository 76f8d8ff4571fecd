//! Per-block feature extraction.
//!
//! A block is converted to luminance, binarized against a fixed threshold,
//! and split into external bright regions. A region is an 8-connected
//! foreground component together with every hole it encloses, so a bright
//! ring with a bright dot in its middle is one region, not two. Region
//! brightness is the mean of the original luminance over that filled area.

use crate::core::config::AnalysisConfig;
use crate::core::error::{AnalysisError, AnalysisResult};
use crate::core::types::{BlockRegion, BlockResult, Region};
use crate::detection::annotate::{draw_boundaries, Outline};
use image::{imageops, GenericImageView, GrayImage, Luma, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use imageproc::region_labelling::{connected_components, Connectivity};
use log::trace;

/// Output of one block task.
#[derive(Debug, Clone)]
pub struct BlockAnalysis {
    /// Statistics and region boundaries.
    pub result: BlockResult,
    /// Copy of the block with boundaries drawn, when annotation is enabled.
    pub annotated: Option<RgbImage>,
}

/// Detects bright regions inside image blocks.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    threshold: u8,
    outline: Option<Outline>,
}

impl FeatureExtractor {
    /// Create an extractor with the given threshold and no annotation.
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            outline: None,
        }
    }

    /// Create an extractor from an analysis configuration.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let outline = config.annotate.then(|| Outline {
            color: config.outline_color,
            thickness: config.outline_thickness,
        });
        Self {
            threshold: config.threshold,
            outline,
        }
    }

    /// Enable annotation with the given outline.
    pub fn with_outline(mut self, outline: Outline) -> Self {
        self.outline = Some(outline);
        self
    }

    /// The binarization threshold.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Analyze one block of `image`.
    ///
    /// Only reads the image; the annotated output is a separate buffer
    /// covering exactly `region`.
    pub fn extract(&self, image: &RgbImage, region: BlockRegion) -> AnalysisResult<BlockAnalysis> {
        if !region.is_within_bounds(image.width(), image.height()) {
            return Err(AnalysisError::BlockOutOfBounds {
                region,
                width: image.width(),
                height: image.height(),
            });
        }

        if region.is_empty() {
            return Ok(BlockAnalysis {
                result: BlockResult::empty(region),
                annotated: None,
            });
        }

        let view = image.view(region.x, region.y, region.width, region.height);
        let gray = luminance(&*view);
        let result = analyze_luma(&gray, self.threshold, region);

        let annotated = self.outline.as_ref().map(|outline| {
            let mut canvas = view.to_image();
            draw_boundaries(&mut canvas, result.boundaries(), outline);
            canvas
        });

        trace!(
            "block {}: {} region(s), mean brightness {:.2}",
            region,
            result.star_count,
            result.mean_brightness
        );

        Ok(BlockAnalysis { result, annotated })
    }
}

/// BT.601 luma (0.299 R + 0.587 G + 0.114 B), rounded to nearest.
///
/// Grey pixels keep their value.
pub fn luminance<I>(image: &I) -> GrayImage
where
    I: GenericImageView<Pixel = Rgb<u8>>,
{
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let Rgb([r, g, b]) = image.get_pixel(x, y);
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        Luma([luma as u8])
    })
}

/// Detect external bright regions in a single-channel block.
///
/// `region` only labels the result; `gray` is the block's own pixels.
pub fn analyze_luma(gray: &GrayImage, threshold: u8, region: BlockRegion) -> BlockResult {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return BlockResult::empty(region);
    }

    let filled = fill_external_regions(gray, threshold);
    let labels = connected_components(&filled, Connectivity::Eight, Luma([0u8]));

    let region_count = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    if region_count == 0 {
        return BlockResult::empty(region);
    }

    // Per-label intensity sums over the filled masks
    let mut sums = vec![0u64; region_count];
    let mut counts = vec![0usize; region_count];
    for (label, value) in labels.pixels().zip(gray.pixels()) {
        if label[0] > 0 {
            let index = label[0] as usize - 1;
            sums[index] += value[0] as u64;
            counts[index] += 1;
        }
    }

    // Trace the filled mask inside a one pixel background frame, so regions
    // on the block edge still get an outer border. Points shift back by one.
    let mut framed = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut framed, &filled, 1, 1);

    let mut boundaries: Vec<Vec<Point<u32>>> = vec![Vec::new(); region_count];
    for contour in find_contours::<u32>(&framed) {
        if contour.border_type != BorderType::Outer || contour.parent.is_some() {
            continue;
        }
        let points: Vec<Point<u32>> = contour
            .points
            .iter()
            .map(|p| Point::new(p.x.saturating_sub(1), p.y.saturating_sub(1)))
            .collect();
        let Some(first) = points.first() else {
            continue;
        };
        let label = labels.get_pixel(first.x, first.y)[0];
        if label > 0 {
            boundaries[label as usize - 1] = points;
        }
    }

    let regions: Vec<Region> = boundaries
        .into_iter()
        .zip(sums.iter().zip(counts.iter()))
        .map(|(boundary, (&sum, &count))| Region {
            boundary,
            pixel_count: count,
            mean_brightness: if count > 0 { sum as f64 / count as f64 } else { 0.0 },
        })
        .collect();

    let mean_brightness =
        regions.iter().map(|r| r.mean_brightness).sum::<f64>() / regions.len() as f64;

    BlockResult {
        region,
        star_count: regions.len(),
        mean_brightness,
        regions,
    }
}

/// Binarize `gray` and fill every hole enclosed by foreground.
///
/// Background that cannot reach the block edge through 4-connected
/// background is enclosed by 8-connected foreground, so it belongs to the
/// surrounding region. Returns 255 for region pixels, 0 elsewhere.
fn fill_external_regions(gray: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let foreground: Vec<bool> = gray.pixels().map(|p| p[0] > threshold).collect();

    let mut outside = vec![false; w * h];
    let mut stack = Vec::new();
    let seed = |x: usize, y: usize, outside: &mut [bool], stack: &mut Vec<usize>| {
        let i = y * w + x;
        if !foreground[i] && !outside[i] {
            outside[i] = true;
            stack.push(i);
        }
    };

    for x in 0..w {
        seed(x, 0, &mut outside, &mut stack);
        seed(x, h - 1, &mut outside, &mut stack);
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut stack);
        seed(w - 1, y, &mut outside, &mut stack);
    }

    while let Some(i) = stack.pop() {
        let (x, y) = (i % w, i / w);
        if x > 0 {
            seed(x - 1, y, &mut outside, &mut stack);
        }
        if x + 1 < w {
            seed(x + 1, y, &mut outside, &mut stack);
        }
        if y > 0 {
            seed(x, y - 1, &mut outside, &mut stack);
        }
        if y + 1 < h {
            seed(x, y + 1, &mut outside, &mut stack);
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let i = y as usize * w + x as usize;
        Luma([if outside[i] { 0 } else { 255 }])
    })
}
