//! Progress tracking for dataset analysis.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A progress update event.
#[derive(Debug, Clone)]
pub enum ProgressUpdate {
    /// Analysis has started.
    Started {
        total_images: usize,
    },
    /// An image task has started.
    ImageStarted {
        index: usize,
        file_name: String,
    },
    /// An image task has produced statistics.
    ImageCompleted {
        index: usize,
        file_name: String,
        star_count: usize,
        duration_ms: u64,
    },
    /// An image task failed.
    ImageFailed {
        index: usize,
        file_name: String,
        message: String,
    },
    /// Every image task has finished.
    Completed {
        total_duration_ms: u64,
        images_processed: usize,
        images_failed: usize,
    },
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Counts finished image tasks and forwards events to a callback.
///
/// Shared by reference across worker threads.
pub struct ProgressTracker {
    /// Total number of images to process.
    total_images: usize,
    /// Number of images analyzed successfully.
    completed_images: AtomicU64,
    /// Number of images that failed.
    failed_images: AtomicU64,
    /// Start time.
    start_time: Option<Instant>,
    /// Progress callback.
    callback: Option<ProgressCallback>,
    /// Per-image durations for estimation.
    image_times: parking_lot::Mutex<Vec<u64>>,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new(total_images: usize) -> Self {
        Self {
            total_images,
            completed_images: AtomicU64::new(0),
            failed_images: AtomicU64::new(0),
            start_time: None,
            callback: None,
            image_times: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Set a callback for progress updates.
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Start tracking.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
        self.send_update(ProgressUpdate::Started {
            total_images: self.total_images,
        });
    }

    /// Report that an image task has started.
    pub fn image_started(&self, index: usize, file_name: &str) {
        self.send_update(ProgressUpdate::ImageStarted {
            index,
            file_name: file_name.to_string(),
        });
    }

    /// Report that an image task has completed.
    pub fn image_completed(&self, index: usize, file_name: &str, star_count: usize, duration_ms: u64) {
        self.completed_images.fetch_add(1, Ordering::Relaxed);
        self.image_times.lock().push(duration_ms);

        self.send_update(ProgressUpdate::ImageCompleted {
            index,
            file_name: file_name.to_string(),
            star_count,
            duration_ms,
        });
    }

    /// Report that an image task has failed.
    pub fn image_failed(&self, index: usize, file_name: &str, message: String) {
        self.failed_images.fetch_add(1, Ordering::Relaxed);
        self.send_update(ProgressUpdate::ImageFailed {
            index,
            file_name: file_name.to_string(),
            message,
        });
    }

    /// Complete tracking.
    pub fn complete(&self) {
        let duration = self
            .start_time
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        self.send_update(ProgressUpdate::Completed {
            total_duration_ms: duration,
            images_processed: self.completed_images.load(Ordering::Relaxed) as usize,
            images_failed: self.failed_images.load(Ordering::Relaxed) as usize,
        });
    }

    /// Get current progress percentage.
    pub fn progress_percent(&self) -> f32 {
        if self.total_images == 0 {
            return 100.0;
        }
        let completed = self.completed_images.load(Ordering::Relaxed);
        let failed = self.failed_images.load(Ordering::Relaxed);
        ((completed + failed) as f32 / self.total_images as f32) * 100.0
    }

    /// Estimate remaining time in milliseconds.
    pub fn estimated_remaining_ms(&self) -> Option<u64> {
        let times = self.image_times.lock();
        if times.is_empty() {
            return None;
        }

        let avg_time: u64 = times.iter().sum::<u64>() / times.len() as u64;
        let finished = (self.completed_images.load(Ordering::Relaxed)
            + self.failed_images.load(Ordering::Relaxed)) as usize;
        let remaining = self.total_images.saturating_sub(finished);

        Some(avg_time * remaining as u64)
    }

    fn send_update(&self, update: ProgressUpdate) {
        if let Some(ref callback) = self.callback {
            callback(update);
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_progress_calculation() {
        let tracker = ProgressTracker::new(10);
        assert_eq!(tracker.progress_percent(), 0.0);

        tracker.completed_images.store(4, Ordering::Relaxed);
        tracker.failed_images.store(1, Ordering::Relaxed);
        assert_eq!(tracker.progress_percent(), 50.0);
    }

    #[test]
    fn test_empty_dataset_is_done() {
        assert_eq!(ProgressTracker::default().progress_percent(), 100.0);
    }

    #[test]
    fn test_estimate() {
        let tracker = ProgressTracker::new(4);
        assert!(tracker.estimated_remaining_ms().is_none());

        tracker.image_completed(0, "a.png", 3, 100);
        tracker.image_completed(1, "b.png", 1, 300);
        assert_eq!(tracker.estimated_remaining_ms(), Some(400));
    }

    #[test]
    fn test_callback_invoked() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let mut tracker = ProgressTracker::new(2).with_callback(Box::new(move |_| {
            call_count_clone.fetch_add(1, Ordering::Relaxed);
        }));

        tracker.start();
        tracker.image_started(0, "a.png");
        tracker.image_completed(0, "a.png", 2, 10);
        tracker.image_failed(1, "b.png", "decode".to_string());
        tracker.complete();

        assert_eq!(call_count.load(Ordering::Relaxed), 5);
    }
}
