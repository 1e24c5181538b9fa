//! Filesystem adapter for reading encoded images.

use anyhow::{Context, Result};
use capture_qa_core::{ImageSource, RawImage};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::encoding::decode_base64;

/// Binary image extensions handed to the decoder as-is.
const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif"];
/// Text extensions holding a Base64-encoded image.
const BASE64_EXTENSIONS: &[&str] = &["b64", "base64", "txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Raster,
    Base64,
}

/// Filesystem image source adapter.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
}

impl FsImageSource {
    /// Creates a new filesystem image source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self { paths, recursive }
    }

    /// Collects all supported files from the configured paths.
    fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                if input_kind(path).is_some() {
                    files.push(path.clone());
                } else {
                    warn!("Unsupported file type: {}", path.display());
                }
            } else if path.is_dir() {
                self.collect_from_dir(path, &mut files);
            } else {
                warn!("Path does not exist: {}", path.display());
            }
        }

        files
    }

    fn collect_from_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read directory {}: {e}", dir.display());
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();

        for path in paths {
            if path.is_file() && input_kind(&path).is_some() {
                files.push(path);
            } else if path.is_dir() && self.recursive {
                self.collect_from_dir(&path, files);
            }
        }
    }
}

impl ImageSource for FsImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<RawImage>> + Send + '_> {
        let files = self.collect_files();
        debug!("Found {} input files", files.len());

        Box::new(files.into_iter().map(|path| read_input(&path)))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.collect_files().len())
    }
}

fn input_kind(path: &Path) -> Option<InputKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    if RASTER_EXTENSIONS.contains(&ext.as_str()) {
        Some(InputKind::Raster)
    } else if BASE64_EXTENSIONS.contains(&ext.as_str()) {
        Some(InputKind::Base64)
    } else {
        None
    }
}

/// Reads one input, decoding Base64 text files to raw bytes.
fn read_input(path: &Path) -> Result<RawImage> {
    let bytes = match input_kind(path) {
        Some(InputKind::Base64) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            decode_base64(&text)
                .with_context(|| format!("Failed to decode Base64 in {}", path.display()))?
        }
        _ => std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?,
    };

    Ok(RawImage {
        path: path.to_string_lossy().into_owned(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kind() {
        assert_eq!(input_kind(Path::new("test.jpg")), Some(InputKind::Raster));
        assert_eq!(input_kind(Path::new("test.JPEG")), Some(InputKind::Raster));
        assert_eq!(input_kind(Path::new("test.png")), Some(InputKind::Raster));
        assert_eq!(input_kind(Path::new("test.b64")), Some(InputKind::Base64));
        assert_eq!(input_kind(Path::new("test.TXT")), Some(InputKind::Base64));
        assert_eq!(input_kind(Path::new("test.cr2")), None);
        assert_eq!(input_kind(Path::new("test")), None);
    }
}
