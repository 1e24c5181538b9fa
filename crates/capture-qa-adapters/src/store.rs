//! Filesystem store for resized images.

use std::path::PathBuf;

use anyhow::{Context, Result};
use capture_qa_core::ImageStore;
use tracing::info;

/// Writes resized images as `image_<id>.jpg` under a directory.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path an image with `image_id` is written to.
    #[must_use]
    pub fn path_for(&self, image_id: &str) -> PathBuf {
        self.dir.join(format!("image_{image_id}.jpg"))
    }
}

impl ImageStore for FsImageStore {
    fn store(&self, image_id: &str, jpeg: &[u8]) -> Result<String> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.path_for(image_id);
        std::fs::write(&path, jpeg).with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Saved resized image to {}", path.display());
        Ok(path.to_string_lossy().into_owned())
    }
}
