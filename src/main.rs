//! Starscan CLI - block-parallel star detection over a folder of images.
//!
//! Usage:
//! ```text
//! starscan <folder> [--block-width N] [--block-height N] [--threshold T] ...
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use starscan::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

/// Report encodings selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => ReportFormat::Csv,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(
    name = "starscan",
    version,
    about = "Counts stars in a folder of images, block by block",
    long_about = None
)]
struct Args {
    /// Folder containing the input images
    folder: PathBuf,

    /// TOML file with analysis settings; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Block width in pixels
    #[arg(long)]
    block_width: Option<u32>,

    /// Block height in pixels
    #[arg(long)]
    block_height: Option<u32>,

    /// Binarization threshold (pixels strictly above it are foreground)
    #[arg(short, long)]
    threshold: Option<u8>,

    /// Worker threads (0 = all available cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Directory for annotated blocks
    #[arg(long, default_value = "output_chunks")]
    chunks: PathBuf,

    /// Directory for annotated images and the report
    #[arg(long, default_value = "output_images")]
    images: PathBuf,

    /// Report file name, written inside the images directory
    #[arg(long, default_value = "stars_analysis.csv")]
    report: String,

    /// Report format
    #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
    format: FormatArg,

    /// Scan sub-directories too
    #[arg(short, long)]
    recursive: bool,

    /// Only analyze files whose name matches this glob
    #[arg(long, default_value = "*")]
    pattern: String,

    /// Skip writing annotated blocks and images
    #[arg(long)]
    no_annotate: bool,
}

impl Args {
    fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AnalysisConfig::default(),
        };

        if let Some(width) = self.block_width {
            config.block_width = width;
        }
        if let Some(height) = self.block_height {
            config.block_height = height;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(threads) = self.threads {
            config.num_threads = threads;
        }
        if self.no_annotate {
            config.annotate = false;
        }
        config.validate()?;
        Ok(config)
    }

    fn layout(&self) -> OutputLayout {
        OutputLayout::new()
            .with_chunks_dir(&self.chunks)
            .with_images_dir(&self.images)
            .with_report_name(self.report.clone())
            .with_pattern(self.pattern.clone())
            .with_recursive(self.recursive)
    }
}

fn run(args: &Args) -> Result<bool> {
    let config = args.analysis_config()?;
    let layout = args.layout();
    let format = ReportFormat::from(args.format);

    let source = FolderSource::scan(&args.folder, &layout.scan_options())
        .with_context(|| format!("scanning {}", args.folder.display()))?;
    info!("{} image(s) in {}", source.len(), args.folder.display());

    let file_sink = layout.sink();
    let sink: &dyn AnnotationSink = if config.annotate {
        file_sink.prepare()?;
        &file_sink
    } else {
        &NullSink
    };

    let analyzer = Analyzer::new(config)?;
    let options = RunOptions::new().with_progress(|update| match update {
        ProgressUpdate::ImageCompleted {
            file_name,
            star_count,
            duration_ms,
            ..
        } => {
            info!("{}: {} star(s) in {}ms", file_name, star_count, duration_ms);
        }
        ProgressUpdate::Completed {
            total_duration_ms,
            images_processed,
            images_failed,
        } => {
            info!(
                "done in {}ms: {} analyzed, {} failed",
                total_duration_ms, images_processed, images_failed
            );
        }
        _ => {}
    });

    let report = analyzer.run(&source, sink, &options);

    let report_path = layout.report_path(format);
    report_writer(format, &report_path)
        .write(&report.rows)
        .with_context(|| format!("writing {}", report_path.display()))?;
    println!("All results saved in {}", report_path.display());

    for row in report.failures() {
        eprintln!("  failed: {}", row.error().unwrap_or(&row.file_name));
    }
    Ok(report.is_complete())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
