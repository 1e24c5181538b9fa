//! Advanced quality scoring through an external [`QualityModel`].

use candle_core::Device;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{AdvancedQualityResult, ImageBuffer, MetricResult, QualityBucket};
use crate::error::QaError;
use crate::inference::to_input_tensor;
use crate::ports::QualityModel;

/// Configuration for the advanced quality check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Block edge length for block-based scorers. Must be positive.
    pub block_size: usize,
    /// Scores at or below this are `HIGH`.
    pub high: f64,
    /// Scores at or below this (and above `high`) are `MEDIUM`; the rest are `BAD`.
    pub medium: f64,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            block_size: 32,
            high: 10.0,
            medium: 20.0,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn evaluate(
    image: &ImageBuffer,
    model: &dyn QualityModel,
    device: &Device,
    config: &AdvancedConfig,
) -> Result<AdvancedQualityResult, QaError> {
    if !(config.high.is_finite() && config.medium.is_finite()) || config.high > config.medium {
        return Err(QaError::metric(
            AdvancedQualityResult::NAME,
            format!("cutoffs must be finite and ordered, got {} / {}", config.high, config.medium),
        ));
    }
    if config.block_size == 0 {
        return Err(QaError::metric(
            AdvancedQualityResult::NAME,
            "block size must be positive",
        ));
    }

    let input = to_input_tensor(image, device)?;
    let score = model
        .score(&input, config)
        .map_err(|e| QaError::Inference(format!("{}: {e:#}", model.name())))?;
    if !score.is_finite() {
        return Err(QaError::Inference(format!("{} returned {score}", model.name())));
    }

    let score = round4(score);
    Ok(AdvancedQualityResult {
        score: Some(score),
        quality: Some(QualityBucket::classify(score, config.high, config.medium)),
        is_valid: true,
    })
}

/// Scores `image` with `model` and buckets the result with `config`'s cutoffs.
///
/// Any failure, including a model error, yields [`AdvancedQualityResult::invalid`].
#[must_use]
pub fn score_advanced(
    image: &ImageBuffer,
    model: &dyn QualityModel,
    device: &Device,
    config: &AdvancedConfig,
) -> AdvancedQualityResult {
    match evaluate(image, model, device, config) {
        Ok(result) => {
            if result.passes() {
                info!(model = model.name(), score = result.score, quality = ?result.quality, "Advanced quality scored");
            } else {
                warn!(model = model.name(), score = result.score, "Advanced quality is BAD");
            }
            result
        }
        Err(e) => {
            warn!(model = model.name(), "Advanced quality failed: {e}");
            AdvancedQualityResult::invalid()
        }
    }
}
