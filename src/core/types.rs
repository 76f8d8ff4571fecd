//! Core data types for the star analysis pipeline.
//!
//! The numeric core passes these around by value: block tasks return
//! [`BlockResult`]s, image tasks fold them into an [`ImageResult`], and the
//! dataset stage turns those into ordered [`DatasetRow`]s.

use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a rectangular block within an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRegion {
    /// X offset from the image origin
    pub x: u32,
    /// Y offset from the image origin
    pub y: u32,
    /// Width of the block
    pub width: u32,
    /// Height of the block
    pub height: u32,
}

impl BlockRegion {
    /// Create a new block region.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Get the right edge coordinate (exclusive), saturating at `u32::MAX`.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Get the bottom edge coordinate (exclusive), saturating at `u32::MAX`.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Calculate the area of this block in pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// A block with no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check if this block is entirely within the given bounds.
    pub fn is_within_bounds(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }

    /// Check whether two blocks share at least one pixel.
    pub fn overlaps(&self, other: &BlockRegion) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Origin as an `(x, y)` pair.
    pub fn origin(&self) -> (u32, u32) {
        (self.x, self.y)
    }
}

impl fmt::Display for BlockRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// A connected bright component detected within one block.
///
/// Boundary points are in block-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Outer boundary, traced in order.
    pub boundary: Vec<Point<u32>>,
    /// Number of pixels in the filled region (holes included).
    pub pixel_count: usize,
    /// Mean original intensity over the filled region.
    pub mean_brightness: f64,
}

/// Per-block feature statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockResult {
    /// The block these statistics describe.
    pub region: BlockRegion,
    /// Number of external bright regions.
    pub star_count: usize,
    /// Mean of the region brightnesses, 0.0 when there are no regions.
    pub mean_brightness: f64,
    /// Detected regions in discovery order.
    pub regions: Vec<Region>,
}

impl BlockResult {
    /// Result for a block with nothing in it.
    pub fn empty(region: BlockRegion) -> Self {
        Self {
            region,
            star_count: 0,
            mean_brightness: 0.0,
            regions: Vec::new(),
        }
    }

    /// Outer boundaries of every region, for overlay drawing.
    pub fn boundaries(&self) -> impl Iterator<Item = &[Point<u32>]> {
        self.regions.iter().map(|r| r.boundary.as_slice())
    }
}

/// Image-level statistics folded from all of its blocks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageResult {
    /// Sum of star counts over all blocks.
    pub total_star_count: usize,
    /// Unweighted mean of block brightnesses, star-free blocks included.
    pub average_brightness: f64,
    /// Number of blocks the image was partitioned into.
    pub block_count: usize,
}

/// One line of the dataset report.
///
/// `outcome` holds the image statistics, or the error message when the
/// image could not be analyzed. Failed images keep their row so the report
/// always says which files are missing numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    /// File name (no directory).
    pub file_name: String,
    /// Statistics or failure message.
    pub outcome: Result<ImageResult, String>,
}

impl DatasetRow {
    /// Star count, if the image was analyzed.
    pub fn star_count(&self) -> Option<usize> {
        self.outcome.as_ref().ok().map(|r| r.total_star_count)
    }

    /// Average brightness, if the image was analyzed.
    pub fn average_brightness(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|r| r.average_brightness)
    }

    /// Failure message, if the image could not be analyzed.
    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }

    /// Whether this row carries statistics.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_region() {
        let region = BlockRegion::new(10, 20, 100, 200);
        assert_eq!(region.right(), 110);
        assert_eq!(region.bottom(), 220);
        assert_eq!(region.area(), 20000);
        assert_eq!(region.origin(), (10, 20));
        assert!(!region.is_empty());
        assert!(BlockRegion::new(5, 5, 0, 7).is_empty());
    }

    #[test]
    fn test_bounds_check_does_not_overflow() {
        assert!(!BlockRegion::new(u32::MAX, 0, 10, 10).is_within_bounds(u32::MAX, 10));
        assert!(!BlockRegion::new(0, u32::MAX - 1, 1, 2).is_within_bounds(10, u32::MAX));
        assert!(BlockRegion::new(0, u32::MAX - 1, 1, 1).is_within_bounds(10, u32::MAX));
        assert_eq!(BlockRegion::new(u32::MAX, 0, 10, 10).right(), u32::MAX);
    }

    #[test]
    fn test_block_region_overlap() {
        let a = BlockRegion::new(0, 0, 256, 160);
        let b = BlockRegion::new(256, 0, 44, 160);
        let c = BlockRegion::new(255, 159, 10, 10);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn test_block_region_display() {
        assert_eq!(BlockRegion::new(256, 160, 44, 40).to_string(), "(256, 160) 44x40");
    }

    #[test]
    fn test_dataset_row_accessors() {
        let ok = DatasetRow {
            file_name: "a.png".to_string(),
            outcome: Ok(ImageResult {
                total_star_count: 3,
                average_brightness: 120.5,
                block_count: 4,
            }),
        };
        assert_eq!(ok.star_count(), Some(3));
        assert_eq!(ok.average_brightness(), Some(120.5));
        assert!(ok.error().is_none());

        let failed = DatasetRow {
            file_name: "b.png".to_string(),
            outcome: Err("decode".to_string()),
        };
        assert!(!failed.is_ok());
        assert_eq!(failed.star_count(), None);
        assert_eq!(failed.error(), Some("decode"));
    }
}
