//! Image sources: where the pipeline gets decoded images from.
//!
//! A source is indexed by submission order. Decoding happens in
//! [`ImageSource::load`], which the scheduler calls from inside each image
//! task, so a file that fails to decode only fails its own row.

use crate::core::error::{ImageError, StarscanError};
use image::RgbImage;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Default accepted file extensions.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Supplies decoded images by submission index.
pub trait ImageSource: Send + Sync {
    /// Number of images in the dataset.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// File name of the image at `index`.
    fn name(&self, index: usize) -> Option<String>;

    /// Decode the image at `index`.
    fn load(&self, index: usize) -> Result<RgbImage, ImageError>;
}

/// Options for scanning a folder.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Accepted extensions, compared case-insensitively.
    pub extensions: Vec<String>,
    /// Glob pattern matched against the file name.
    pub pattern: String,
    /// Descend into sub-directories.
    pub recursive: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            pattern: "*".to_string(),
            recursive: false,
        }
    }
}

impl ScanOptions {
    /// Create scan options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accepted extensions.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(|e| e.into().to_lowercase()).collect();
        self
    }

    /// Set the file name pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Enable or disable recursive scanning.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn accepts(&self, path: &Path, pattern: &glob::Pattern) -> bool {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if !self.extensions.iter().any(|e| *e == extension) {
            return false;
        }
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        pattern.matches(file_name)
    }
}

/// Images found in a directory, decoded lazily.
///
/// Each image is named by its path relative to the scanned directory,
/// with `/` separators. A flat scan therefore names images by file name,
/// and a recursive scan keeps same-named files in different
/// sub-directories apart.
#[derive(Debug, Clone)]
pub struct FolderSource {
    paths: Vec<PathBuf>,
    names: Vec<String>,
}

impl FolderSource {
    /// Scan `directory` for images.
    ///
    /// Paths are sorted, which fixes the submission order.
    pub fn scan(directory: impl AsRef<Path>, options: &ScanOptions) -> Result<Self, StarscanError> {
        let directory = directory.as_ref();
        let pattern = glob::Pattern::new(&options.pattern)
            .map_err(|e| StarscanError::Other(format!("Invalid pattern '{}': {}", options.pattern, e)))?;

        let mut paths = Vec::new();
        if options.recursive {
            for entry in walkdir::WalkDir::new(directory)
                .into_iter()
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(error) => {
                        warn!("skipping unreadable entry: {}", error);
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
            {
                if options.accepts(entry.path(), &pattern) {
                    paths.push(entry.into_path());
                }
            }
        } else {
            for entry in std::fs::read_dir(directory)? {
                let path = entry?.path();
                if path.is_file() && options.accepts(&path, &pattern) {
                    paths.push(path);
                }
            }
        }

        paths.sort();
        let names = paths
            .iter()
            .map(|path| match path.strip_prefix(directory) {
                Ok(relative) => relative_name(relative),
                Err(_) => file_name(path),
            })
            .collect();
        debug!("found {} image(s) in {}", paths.len(), directory.display());
        Ok(Self { paths, names })
    }

    /// Build a source from explicit paths, keeping their order.
    ///
    /// Images are named by file name.
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        let names = paths.iter().map(|path| file_name(path)).collect();
        Self { paths, names }
    }

    /// The paths in submission order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn relative_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl ImageSource for FolderSource {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn name(&self, index: usize) -> Option<String> {
        self.names.get(index).cloned()
    }

    fn load(&self, index: usize) -> Result<RgbImage, ImageError> {
        let path = self.paths.get(index).ok_or(ImageError::MissingIndex(index))?;
        let image = image::open(path).map_err(|e| ImageError::Decode {
            file_name: self.name(index).unwrap_or_default(),
            error: e.to_string(),
        })?;
        Ok(image.to_rgb8())
    }
}

/// Pre-decoded images held in memory.
///
/// An entry can also be a failure, which `load` reports as a decode error.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Vec<(String, Result<RgbImage, String>)>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image.
    pub fn with_image(mut self, file_name: impl Into<String>, image: RgbImage) -> Self {
        self.push(file_name, image);
        self
    }

    /// Append an entry that fails to decode.
    pub fn with_failure(mut self, file_name: impl Into<String>, error: impl Into<String>) -> Self {
        self.entries.push((file_name.into(), Err(error.into())));
        self
    }

    /// Append an image.
    pub fn push(&mut self, file_name: impl Into<String>, image: RgbImage) {
        self.entries.push((file_name.into(), Ok(image)));
    }
}

impl ImageSource for MemorySource {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn name(&self, index: usize) -> Option<String> {
        self.entries.get(index).map(|(name, _)| name.clone())
    }

    fn load(&self, index: usize) -> Result<RgbImage, ImageError> {
        let (file_name, entry) = self.entries.get(index).ok_or(ImageError::MissingIndex(index))?;
        entry.clone().map_err(|error| ImageError::Decode {
            file_name: file_name.clone(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new()
            .with_image("a.png", RgbImage::new(4, 4))
            .with_failure("b.png", "corrupt");

        assert_eq!(source.len(), 2);
        assert_eq!(source.name(1).as_deref(), Some("b.png"));
        assert!(source.load(0).is_ok());
        assert!(matches!(source.load(1), Err(ImageError::Decode { .. })));
        assert_eq!(source.load(2), Err(ImageError::MissingIndex(2)));
        assert!(source.name(2).is_none());
    }

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(3, 3, Rgb([1, 2, 3]));
        image.save(dir.path().join("b.png")).unwrap();
        std::fs::copy(dir.path().join("b.png"), dir.path().join("a.PNG")).unwrap();
        image.save(dir.path().join("c.bmp")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        image.save(dir.path().join("nested").join("d.png")).unwrap();

        let source = FolderSource::scan(dir.path(), &ScanOptions::new()).unwrap();
        let names: Vec<_> = (0..source.len()).filter_map(|i| source.name(i)).collect();
        assert_eq!(names, ["a.PNG", "b.png"]);
        assert_eq!(source.load(1).unwrap().dimensions(), (3, 3));

        let recursive = FolderSource::scan(dir.path(), &ScanOptions::new().with_recursive(true)).unwrap();
        assert_eq!(recursive.len(), 3);
        assert_eq!(recursive.name(2).as_deref(), Some("nested/d.png"));

        let patterned = FolderSource::scan(dir.path(), &ScanOptions::new().with_pattern("b*")).unwrap();
        assert_eq!(patterned.len(), 1);
    }

    #[test]
    fn test_recursive_names_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(2, 2, Rgb([9, 9, 9]));
        for night in ["night1", "night2"] {
            std::fs::create_dir(dir.path().join(night)).unwrap();
            image.save(dir.path().join(night).join("m31.png")).unwrap();
        }

        let source = FolderSource::scan(dir.path(), &ScanOptions::new().with_recursive(true)).unwrap();
        let names: Vec<_> = (0..source.len()).filter_map(|i| source.name(i)).collect();
        assert_eq!(names, ["night1/m31.png", "night2/m31.png"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        assert!(FolderSource::scan("/definitely/not/here", &ScanOptions::new()).is_err());
    }

    #[test]
    fn test_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        let source = FolderSource::from_paths(vec![path]);
        let error = source.load(0).unwrap_err();
        assert_eq!(error.file_name(), Some("broken.jpg"));
    }
}
