//! Image source port for enumerating encoded inputs.

/// Encoded image bytes together with where they came from.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Display path or identifier of the input.
    pub path: String,
    /// Encoded bytes, already base64-decoded when the input was text.
    pub bytes: Vec<u8>,
}

/// Port for discovering and reading images.
pub trait ImageSource: Send + Sync {
    /// Returns an iterator over all inputs from this source.
    ///
    /// Each item is either the raw input or an error describing why it could
    /// not be read.
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<RawImage>> + Send + '_>;

    /// Returns the total number of inputs, if known upfront.
    fn count_hint(&self) -> Option<usize> {
        None
    }
}
