//! Report writers for the dataset table.
//!
//! The table has one row per submitted image, in submission order, under
//! the header `File Name, Star Count, Average Brightness`. Failed images
//! keep their row: in CSV the star count cell holds [`FAILED_MARKER`] and
//! the brightness cell is empty, in JSON the row carries the message.

use crate::core::error::ReportError;
use crate::core::types::DatasetRow;
use log::{info, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Report column headers.
pub const REPORT_HEADER: [&str; 3] = ["File Name", "Star Count", "Average Brightness"];

/// Star count cell of a CSV row whose image could not be analyzed.
pub const FAILED_MARKER: &str = "failed";

/// Default report file name.
pub const DEFAULT_REPORT_NAME: &str = "stars_analysis.csv";

/// Persists dataset rows.
pub trait ReportWriter {
    /// Write all rows.
    fn write(&self, rows: &[DatasetRow]) -> Result<(), ReportError>;

    /// Where the report goes, if it is a file.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Supported report encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl ReportFormat {
    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

/// Write rows as CSV to any writer.
pub fn write_csv<W: Write>(writer: W, rows: &[DatasetRow]) -> Result<(), ReportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(REPORT_HEADER)?;

    for row in rows {
        match &row.outcome {
            Ok(result) => csv.write_record([
                row.file_name.clone(),
                result.total_star_count.to_string(),
                result.average_brightness.to_string(),
            ])?,
            Err(message) => {
                warn!("report row for '{}' has no statistics: {}", row.file_name, message);
                csv.write_record([row.file_name.as_str(), FAILED_MARKER, ""])?;
            }
        }
    }

    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[derive(Serialize)]
struct JsonRow<'a> {
    file_name: &'a str,
    star_count: Option<usize>,
    average_brightness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// Write rows as a pretty JSON array to any writer.
pub fn write_json<W: Write>(writer: W, rows: &[DatasetRow]) -> Result<(), ReportError> {
    let json_rows: Vec<JsonRow<'_>> = rows
        .iter()
        .map(|row| JsonRow {
            file_name: &row.file_name,
            star_count: row.star_count(),
            average_brightness: row.average_brightness(),
            error: row.error(),
        })
        .collect();
    serde_json::to_writer_pretty(writer, &json_rows)?;
    Ok(())
}

/// Writes the report as a CSV file.
#[derive(Debug, Clone)]
pub struct CsvReportWriter {
    path: PathBuf,
}

impl CsvReportWriter {
    /// Create a writer for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportWriter for CsvReportWriter {
    fn write(&self, rows: &[DatasetRow]) -> Result<(), ReportError> {
        let file = create(&self.path)?;
        write_csv(BufWriter::new(file), rows)?;
        info!("wrote {} row(s) to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Writes the report as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    /// Create a writer for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportWriter for JsonReportWriter {
    fn write(&self, rows: &[DatasetRow]) -> Result<(), ReportError> {
        let file = create(&self.path)?;
        let mut writer = BufWriter::new(file);
        write_json(&mut writer, rows)?;
        writer.flush().map_err(|error| ReportError::Io {
            path: self.path.clone(),
            error,
        })?;
        info!("wrote {} row(s) to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Build the writer for `format` at `path`.
pub fn report_writer(format: ReportFormat, path: impl Into<PathBuf>) -> Box<dyn ReportWriter> {
    match format {
        ReportFormat::Csv => Box::new(CsvReportWriter::new(path)),
        ReportFormat::Json => Box::new(JsonReportWriter::new(path)),
    }
}

fn create(path: &Path) -> Result<File, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|error| ReportError::Io {
            path: parent.to_path_buf(),
            error,
        })?;
    }
    File::create(path).map_err(|error| ReportError::Io {
        path: path.to_path_buf(),
        error,
    })
}
