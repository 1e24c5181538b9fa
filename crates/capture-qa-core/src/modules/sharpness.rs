//! Sharpness analysis.
//!
//! Focus is measured as the variance of the Laplacian response over the
//! luminance plane: more high-frequency detail means a larger variance.

use image::{GrayImage, Luma};
use imageproc::filter::filter3x3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{ImageBuffer, MetricResult, SharpnessResult};
use crate::error::QaError;

/// 4-neighbour Laplacian kernel.
const LAPLACIAN: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Configuration for sharpness analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharpnessConfig {
    /// Minimum Laplacian variance for an image to count as sharp.
    pub threshold: f64,
}

impl Default for SharpnessConfig {
    fn default() -> Self {
        Self { threshold: 150.0 }
    }
}

/// Population variance of the Laplacian response of `luma`.
///
/// # Errors
///
/// Returns [`QaError::MetricComputation`] for an empty plane or a
/// non-finite result.
#[allow(clippy::cast_precision_loss)]
pub fn laplacian_variance(luma: &GrayImage) -> Result<f64, QaError> {
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return Err(QaError::metric(
            SharpnessResult::NAME,
            "empty luminance plane",
        ));
    }

    let plane = image::ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(
        width,
        height,
        luma.as_raw().iter().copied().map(f32::from).collect(),
    )
    .ok_or_else(|| QaError::metric(SharpnessResult::NAME, "luminance plane size mismatch"))?;

    let response: Vec<f32> = filter3x3(&plane, &LAPLACIAN).into_raw();
    let n = response.len() as f64;
    let mean = response.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let variance = response
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    if variance.is_finite() {
        Ok(variance)
    } else {
        Err(QaError::metric(
            SharpnessResult::NAME,
            format!("non-finite variance {variance}"),
        ))
    }
}

/// Scores the focus of `image` against `config.threshold`.
///
/// Any internal failure yields [`SharpnessResult::invalid`].
#[must_use]
pub fn detect_sharpness(image: &ImageBuffer, config: &SharpnessConfig) -> SharpnessResult {
    match laplacian_variance(&image.luma()) {
        Ok(value) => {
            let is_correct_sharpness = value >= config.threshold;
            if is_correct_sharpness {
                info!(
                    sharpness = value,
                    threshold = config.threshold,
                    "Sharpness within threshold"
                );
            } else {
                warn!(
                    sharpness = value,
                    threshold = config.threshold,
                    "Sharpness below threshold"
                );
            }
            SharpnessResult {
                sharpness_value: Some(value),
                is_correct_sharpness,
                is_valid: true,
            }
        }
        Err(e) => {
            warn!("Sharpness analysis failed: {e}");
            SharpnessResult::invalid()
        }
    }
}
