//! Persistence port for normalized images.

/// Port for storing the resized image of a run.
pub trait ImageStore: Send + Sync {
    /// Stores `jpeg` under `image_id` and returns where it was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be written.
    fn store(&self, image_id: &str, jpeg: &[u8]) -> anyhow::Result<String>;
}
