//! Where a folder run reads from and writes to.

use crate::io::report::{ReportFormat, DEFAULT_REPORT_NAME};
use crate::io::sink::{FileAnnotationSink, DEFAULT_CHUNKS_DIR, DEFAULT_IMAGES_DIR};
use crate::io::source::{ScanOptions, DEFAULT_EXTENSIONS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File-system layout of a run.
///
/// The report lands inside `images_dir`, next to the annotated images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    /// Directory for annotated blocks, one sub-directory per image.
    pub chunks_dir: PathBuf,
    /// Directory for annotated images and the report.
    pub images_dir: PathBuf,
    /// Report file name.
    pub report_name: String,
    /// Accepted input extensions.
    pub extensions: Vec<String>,
    /// Glob pattern for input file names.
    pub pattern: String,
    /// Scan input sub-directories too.
    pub recursive: bool,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            chunks_dir: PathBuf::from(DEFAULT_CHUNKS_DIR),
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            report_name: DEFAULT_REPORT_NAME.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            pattern: "*".to_string(),
            recursive: false,
        }
    }
}

impl OutputLayout {
    /// Create a layout with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the annotated block directory.
    pub fn with_chunks_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chunks_dir = dir.into();
        self
    }

    /// Set the annotated image directory.
    pub fn with_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images_dir = dir.into();
        self
    }

    /// Set the report file name.
    pub fn with_report_name(mut self, name: impl Into<String>) -> Self {
        self.report_name = name.into();
        self
    }

    /// Set the input file name pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Enable or disable recursive scanning.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Full path of the report.
    ///
    /// A report name without an extension gets the one matching `format`.
    pub fn report_path(&self, format: ReportFormat) -> PathBuf {
        let path = self.images_dir.join(&self.report_name);
        if path.extension().is_some() {
            path
        } else {
            path.with_extension(format.extension())
        }
    }

    /// Scan options for the input folder.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions::new()
            .with_extensions(self.extensions.iter().cloned())
            .with_pattern(self.pattern.clone())
            .with_recursive(self.recursive)
    }

    /// Annotation sink writing into this layout.
    pub fn sink(&self) -> FileAnnotationSink {
        FileAnnotationSink::new(&self.chunks_dir, &self.images_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_path() {
        let layout = OutputLayout::default();
        assert_eq!(
            layout.report_path(ReportFormat::Csv),
            PathBuf::from("output_images/stars_analysis.csv")
        );
    }

    #[test]
    fn test_report_extension_from_format() {
        let layout = OutputLayout::new()
            .with_images_dir("out")
            .with_report_name("summary");
        assert_eq!(layout.report_path(ReportFormat::Json), PathBuf::from("out/summary.json"));
    }

    #[test]
    fn test_scan_options_follow_layout() {
        let options = OutputLayout::new()
            .with_pattern("m*")
            .with_recursive(true)
            .scan_options();
        assert_eq!(options.pattern, "m*");
        assert!(options.recursive);
        assert_eq!(options.extensions, ["jpg", "png"]);
    }

    #[test]
    fn test_partial_toml() {
        let layout: OutputLayout = toml::from_str("report_name = \"night.csv\"").unwrap();
        assert_eq!(layout.report_name, "night.csv");
        assert_eq!(layout.chunks_dir, PathBuf::from("output_chunks"));
    }
}
