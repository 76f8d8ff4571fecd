//! Bright region detection and boundary overlays for single blocks.

pub mod annotate;
pub mod extractor;

pub use annotate::{draw_boundaries, paste_block, Outline};
pub use extractor::{analyze_luma, BlockAnalysis, FeatureExtractor};
