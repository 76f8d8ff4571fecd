//! Block partitioning of an image into a disjoint, full-coverage grid.
//!
//! Blocks are generated row-major: the outer stride walks down the image
//! in steps of the block height, the inner stride walks across in steps of
//! the block width. Edge blocks are clipped to the remaining pixels, so the
//! union of all blocks is exactly the image rectangle and no two blocks
//! share a pixel. Block tasks rely on that disjointness to annotate their
//! own rectangle without coordinating with each other.

use crate::core::types::BlockRegion;

/// Iterator over the blocks of an image.
#[derive(Debug, Clone)]
pub struct BlockPartition {
    image_width: u32,
    image_height: u32,
    block_width: u32,
    block_height: u32,
    current_x: u32,
    current_y: u32,
}

impl BlockPartition {
    /// Create a new partition iterator.
    ///
    /// A zero image dimension or a zero block dimension produces no blocks.
    pub fn new(image_width: u32, image_height: u32, block_width: u32, block_height: u32) -> Self {
        Self {
            image_width,
            image_height,
            block_width,
            block_height,
            current_x: 0,
            current_y: 0,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.image_width == 0
            || self.image_height == 0
            || self.block_width == 0
            || self.block_height == 0
    }

    /// Number of columns in the block grid.
    pub fn columns(&self) -> u32 {
        if self.is_degenerate() {
            return 0;
        }
        self.image_width.div_ceil(self.block_width)
    }

    /// Number of rows in the block grid.
    pub fn rows(&self) -> u32 {
        if self.is_degenerate() {
            return 0;
        }
        self.image_height.div_ceil(self.block_height)
    }

    /// Get the total number of blocks.
    pub fn block_count(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }
}

impl Iterator for BlockPartition {
    type Item = BlockRegion;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_degenerate() || self.current_y >= self.image_height {
            return None;
        }

        let x = self.current_x;
        let y = self.current_y;
        let width = self.block_width.min(self.image_width - x);
        let height = self.block_height.min(self.image_height - y);

        // Step across, then wrap to the next block row
        match self.current_x.checked_add(self.block_width) {
            Some(next_x) if next_x < self.image_width => self.current_x = next_x,
            _ => {
                self.current_x = 0;
                self.current_y = self.current_y.saturating_add(self.block_height);
            }
        }

        Some(BlockRegion::new(x, y, width, height))
    }
}

/// Partition an image into blocks, returned in row-major order.
pub fn partition(
    image_width: u32,
    image_height: u32,
    block_width: u32,
    block_height: u32,
) -> Vec<BlockRegion> {
    BlockPartition::new(image_width, image_height, block_width, block_height).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exact_grid() {
        let blocks = partition(512, 320, 256, 160);
        assert_eq!(
            blocks,
            vec![
                BlockRegion::new(0, 0, 256, 160),
                BlockRegion::new(256, 0, 256, 160),
                BlockRegion::new(0, 160, 256, 160),
                BlockRegion::new(256, 160, 256, 160),
            ]
        );
    }

    #[test]
    fn test_clipped_edges() {
        let blocks = partition(300, 200, 256, 160);
        assert_eq!(
            blocks,
            vec![
                BlockRegion::new(0, 0, 256, 160),
                BlockRegion::new(256, 0, 44, 160),
                BlockRegion::new(0, 160, 256, 40),
                BlockRegion::new(256, 160, 44, 40),
            ]
        );
    }

    #[test]
    fn test_block_count() {
        let iter = BlockPartition::new(1000, 1000, 256, 256);
        assert_eq!(iter.block_count(), 16);
        assert_eq!(iter.count(), 16);

        let iter = BlockPartition::new(300, 200, 256, 160);
        assert_eq!((iter.columns(), iter.rows()), (2, 2));
    }

    #[test]
    fn test_block_larger_than_image() {
        assert_eq!(partition(10, 7, 256, 160), vec![BlockRegion::new(0, 0, 10, 7)]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(partition(0, 200, 256, 160).is_empty());
        assert!(partition(300, 0, 256, 160).is_empty());
        assert!(partition(300, 200, 0, 160).is_empty());
        assert_eq!(BlockPartition::new(0, 0, 16, 16).block_count(), 0);
    }

    #[test]
    fn test_near_u32_max_does_not_overflow() {
        let blocks: Vec<_> = BlockPartition::new(u32::MAX, 1, u32::MAX - 1, 1).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], BlockRegion::new(u32::MAX - 1, 0, 1, 1));
    }

    proptest! {
        #[test]
        fn prop_blocks_tile_the_image(
            width in 0u32..400,
            height in 0u32..400,
            block_width in 1u32..300,
            block_height in 1u32..300,
        ) {
            let partition = BlockPartition::new(width, height, block_width, block_height);
            let expected = partition.block_count();
            let blocks: Vec<_> = partition.collect();
            prop_assert_eq!(blocks.len(), expected);

            // Each block is inside the image, non-empty, and on the lattice
            let mut area = 0u64;
            for block in &blocks {
                prop_assert!(!block.is_empty());
                prop_assert!(block.is_within_bounds(width, height));
                prop_assert_eq!(block.x % block_width, 0);
                prop_assert_eq!(block.y % block_height, 0);
                prop_assert_eq!(block.width, block_width.min(width - block.x));
                prop_assert_eq!(block.height, block_height.min(height - block.y));
                area += block.area();
            }

            // Every pixel is covered exactly once
            prop_assert_eq!(area, width as u64 * height as u64);
            let mut coverage = vec![0u8; width as usize * height as usize];
            for block in &blocks {
                for y in block.y..block.bottom() {
                    for x in block.x..block.right() {
                        coverage[y as usize * width as usize + x as usize] += 1;
                    }
                }
            }
            prop_assert!(coverage.iter().all(|&c| c == 1));

            // Strict row-major order
            for pair in blocks.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(a.y < b.y || (a.y == b.y && a.x < b.x));
            }
        }
    }
}
