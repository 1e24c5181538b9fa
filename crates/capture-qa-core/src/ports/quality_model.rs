//! Port for external no-reference quality scorers.

use candle_core::Tensor;

use crate::modules::AdvancedConfig;

/// A no-reference image quality model.
///
/// Lower scores mean better quality. The input is a `(1, 3, H, W)` `f32`
/// tensor with channel values in `[0, 1]`.
pub trait QualityModel: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Scores a preprocessed image tensor.
    ///
    /// `config` is the effective configuration for this call, per-call
    /// overrides included.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or produces no score.
    fn score(&self, input: &Tensor, config: &AdvancedConfig) -> anyhow::Result<f64>;
}
