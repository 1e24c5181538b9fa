//! Error taxonomy for the quality pipeline.
//!
//! Errors never cross a component boundary: each component converts its own
//! failure into an invalid result shape and logs the cause.

use thiserror::Error;

/// Failures raised inside pipeline components.
#[derive(Debug, Error)]
pub enum QaError {
    /// Input bytes could not be decoded into an image.
    #[error("decode failed: {0}")]
    Decode(String),

    /// Target geometry or resampling failed.
    #[error("resize failed: {0}")]
    Resize(String),

    /// An analyzer could not compute its metric.
    #[error("{metric} computation failed: {reason}")]
    MetricComputation {
        /// Name of the failing metric.
        metric: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// A buffer violates `width * height * channels == pixels.len()`.
    #[error("invalid image buffer: {0}")]
    InvalidBuffer(String),

    /// The advanced quality model failed.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Writing a report or image to storage failed.
    #[error("persistence failed: {0}")]
    Persistence(String),
}

impl QaError {
    /// Shorthand for a [`QaError::MetricComputation`].
    pub fn metric(metric: &'static str, reason: impl Into<String>) -> Self {
        Self::MetricComputation {
            metric,
            reason: reason.into(),
        }
    }
}

impl From<image::ImageError> for QaError {
    fn from(err: image::ImageError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<candle_core::Error> for QaError {
    fn from(err: candle_core::Error) -> Self {
        Self::Inference(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_error_message() {
        let err = QaError::metric("sharpness", "empty luminance plane");
        assert_eq!(
            err.to_string(),
            "sharpness computation failed: empty luminance plane"
        );
    }

    #[test]
    fn test_image_error_maps_to_decode() {
        let err: QaError = image::ImageError::IoError(std::io::Error::other("truncated")).into();
        assert!(matches!(err, QaError::Decode(_)));
    }
}
