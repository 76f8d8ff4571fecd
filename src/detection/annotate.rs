//! Boundary overlays and annotated image assembly.

use crate::core::error::{AnalysisError, AnalysisResult};
use crate::core::types::BlockRegion;
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::point::Point;

/// Overlay style for region boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outline {
    /// RGB colour.
    pub color: [u8; 3],
    /// Line thickness in pixels.
    pub thickness: u32,
}

impl Default for Outline {
    fn default() -> Self {
        Self {
            color: [0, 0, 255],
            thickness: 2,
        }
    }
}

/// Draw closed boundaries onto `canvas`.
///
/// Points are in canvas coordinates. Pixels that would fall outside the
/// canvas are dropped, so a thick outline never spills past the block.
pub fn draw_boundaries<'a>(
    canvas: &mut RgbImage,
    boundaries: impl IntoIterator<Item = &'a [Point<u32>]>,
    outline: &Outline,
) {
    let color = Rgb(outline.color);
    let offsets = brush_offsets(outline.thickness);

    for boundary in boundaries {
        let Some(&last) = boundary.last() else {
            continue;
        };
        let mut previous = last;
        for &point in boundary {
            for &(dx, dy) in &offsets {
                draw_line_segment_mut(
                    canvas,
                    (previous.x as f32 + dx, previous.y as f32 + dy),
                    (point.x as f32 + dx, point.y as f32 + dy),
                    color,
                );
            }
            previous = point;
        }
    }
}

/// Square brush footprint centred on the line, `thickness` pixels wide.
fn brush_offsets(thickness: u32) -> Vec<(f32, f32)> {
    let thickness = thickness.max(1) as i32;
    let low = -(thickness / 2);
    let high = low + thickness;
    (low..high)
        .flat_map(|dy| (low..high).map(move |dx| (dx as f32, dy as f32)))
        .collect()
}

/// Copy an annotated block back into the full image at its origin.
///
/// Blocks of one partition are disjoint, so pasting them in any order
/// produces the same image.
pub fn paste_block(
    image: &mut RgbImage,
    region: BlockRegion,
    annotated: &RgbImage,
) -> AnalysisResult<()> {
    if annotated.dimensions() != (region.width, region.height) {
        return Err(AnalysisError::AnnotationSizeMismatch {
            region,
            got_width: annotated.width(),
            got_height: annotated.height(),
        });
    }
    if !region.is_within_bounds(image.width(), image.height()) {
        return Err(AnalysisError::BlockOutOfBounds {
            region,
            width: image.width(),
            height: image.height(),
        });
    }
    imageops::replace(image, annotated, region.x as i64, region.y as i64);
    Ok(())
}
