//! Collaborators at the edges of the pipeline: image sources, annotation
//! sinks and report writers.

pub mod layout;
pub mod report;
pub mod sink;
pub mod source;

pub use layout::OutputLayout;
pub use report::{report_writer, CsvReportWriter, JsonReportWriter, ReportFormat, ReportWriter};
pub use sink::{AnnotationSink, FileAnnotationSink, MemorySink, NullSink};
pub use source::{FolderSource, ImageSource, MemorySource, ScanOptions};
