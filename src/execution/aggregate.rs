//! Block-level and dataset-level aggregation.
//!
//! Both stages run after a barrier: block results are folded only once
//! every block of the image has finished, and dataset rows are assembled
//! only once every image has finished.

use crate::core::error::ImageError;
use crate::core::types::{BlockResult, DatasetRow, ImageResult};
use log::warn;

/// Fold the results of every block of one image.
///
/// The star total is a plain sum. The brightness is the unweighted mean of
/// block means, so star-free blocks contribute 0.0. An image with no
/// blocks reports 0.0.
pub fn aggregate_blocks<'a, I>(results: I) -> ImageResult
where
    I: IntoIterator<Item = &'a BlockResult>,
{
    let mut total_star_count = 0usize;
    let mut brightness_sum = 0.0f64;
    let mut block_count = 0usize;

    for result in results {
        total_star_count += result.star_count;
        brightness_sum += result.mean_brightness;
        block_count += 1;
    }

    let average_brightness = if block_count == 0 {
        0.0
    } else {
        brightness_sum / block_count as f64
    };

    ImageResult {
        total_star_count,
        average_brightness,
        block_count,
    }
}

/// Collects per-image outcomes into submission-ordered rows.
///
/// Each image owns a pre-assigned slot, so the order of [`finish`]'s
/// output never depends on which image completed first.
///
/// [`finish`]: DatasetAggregator::finish
#[derive(Debug)]
pub struct DatasetAggregator {
    slots: Vec<Option<DatasetRow>>,
}

impl DatasetAggregator {
    /// Create an aggregator with one slot per submitted image.
    pub fn new(image_count: usize) -> Self {
        Self {
            slots: vec![None; image_count],
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the dataset has no images.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store the outcome for the image submitted at `index`.
    ///
    /// Returns `false` if `index` has no slot.
    pub fn fill(
        &mut self,
        index: usize,
        file_name: impl Into<String>,
        outcome: Result<ImageResult, ImageError>,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        *slot = Some(DatasetRow {
            file_name: file_name.into(),
            outcome: outcome.map_err(|e| e.to_string()),
        });
        true
    }

    /// Produce the rows in submission order.
    ///
    /// A slot that was never filled becomes a failed row rather than being
    /// dropped.
    pub fn finish(self) -> DatasetReport {
        let rows = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    warn!("no result recorded for image #{}", index);
                    DatasetRow {
                        file_name: format!("#{}", index),
                        outcome: Err(ImageError::MissingIndex(index).to_string()),
                    }
                })
            })
            .collect();
        DatasetReport { rows }
    }
}

/// Ordered dataset rows, one per submitted image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetReport {
    /// Rows in submission order.
    pub rows: Vec<DatasetRow>,
}

impl DatasetReport {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no images were submitted.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose image could not be analyzed.
    pub fn failures(&self) -> impl Iterator<Item = &DatasetRow> {
        self.rows.iter().filter(|row| !row.is_ok())
    }

    /// Whether every image produced statistics.
    pub fn is_complete(&self) -> bool {
        self.rows.iter().all(DatasetRow::is_ok)
    }

    /// Sum of star counts over the analyzed images.
    pub fn total_star_count(&self) -> usize {
        self.rows.iter().filter_map(DatasetRow::star_count).sum()
    }
}
