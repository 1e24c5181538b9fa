//! Exposure analysis.
//!
//! Counts clipped shadows and highlights in the luminance histogram and
//! compares each share against a common tolerance.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{ExposureResult, ImageBuffer, MetricResult};
use crate::error::QaError;

/// Configuration for exposure analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureConfig {
    /// Pixels at or above this level (0-255) count as overexposed.
    pub overexposed_threshold: u8,
    /// Pixels at or below this level (0-255) count as underexposed.
    pub underexposed_threshold: u8,
    /// Maximum allowed fraction (0.0-1.0) of clipped pixels on either side.
    pub tolerance: f64,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            overexposed_threshold: 245,
            underexposed_threshold: 10,
            tolerance: 0.3,
        }
    }
}

/// 256-bin histogram of luminance values.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

impl Histogram {
    /// Compute histogram from grayscale image.
    #[must_use]
    pub fn from_luma(image: &GrayImage) -> Self {
        let mut bins = [0u64; 256];
        for pixel in image.pixels() {
            bins[usize::from(pixel.0[0])] += 1;
        }
        let total = bins.iter().sum();
        Self { bins, total }
    }

    /// Returns the total pixel count.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Calculate mean luminance.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: u64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(i, &count)| (i as u64) * count)
            .sum();
        sum as f64 / self.total as f64
    }

    /// Count pixels below or equal to a threshold.
    #[must_use]
    pub fn count_below(&self, threshold: u8) -> u64 {
        self.bins[..=usize::from(threshold)].iter().sum()
    }

    /// Count pixels above or equal to a threshold.
    #[must_use]
    pub fn count_above(&self, threshold: u8) -> u64 {
        self.bins[usize::from(threshold)..].iter().sum()
    }

    /// Percentage (0-100) of pixels below or equal to threshold.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn percent_below(&self, threshold: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.count_below(threshold) as f64 / self.total as f64
    }

    /// Percentage (0-100) of pixels above or equal to threshold.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn percent_above(&self, threshold: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.count_above(threshold) as f64 / self.total as f64
    }
}

/// Rounds to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn measure(luma: &GrayImage, config: &ExposureConfig) -> Result<ExposureResult, QaError> {
    if !config.tolerance.is_finite() || config.tolerance < 0.0 {
        return Err(QaError::metric(
            ExposureResult::NAME,
            format!("tolerance must be a non-negative fraction, got {}", config.tolerance),
        ));
    }

    let histogram = Histogram::from_luma(luma);
    if histogram.total() == 0 {
        return Err(QaError::metric(ExposureResult::NAME, "empty luminance plane"));
    }

    let over = round2(histogram.percent_above(config.overexposed_threshold));
    let under = round2(histogram.percent_below(config.underexposed_threshold));
    let limit = config.tolerance * 100.0;

    let is_overexposed_correct = over < limit;
    let is_underexposed_correct = under < limit;
    debug!(mean = histogram.mean(), over, under, limit, "Exposure histogram");

    Ok(ExposureResult {
        overexposed_percentage: Some(over),
        underexposed_percentage: Some(under),
        is_overexposed_correct,
        is_underexposed_correct,
        is_correct_exposure: is_overexposed_correct && is_underexposed_correct,
        is_valid: true,
    })
}

/// Measures clipped highlights and shadows of `image`.
///
/// Any internal failure yields [`ExposureResult::invalid`].
#[must_use]
pub fn detect_exposure(image: &ImageBuffer, config: &ExposureConfig) -> ExposureResult {
    match measure(&image.luma(), config) {
        Ok(result) => {
            if result.is_correct_exposure {
                info!(
                    over = result.overexposed_percentage,
                    under = result.underexposed_percentage,
                    "Exposure within tolerance"
                );
            } else {
                warn!(
                    over = result.overexposed_percentage,
                    under = result.underexposed_percentage,
                    tolerance = config.tolerance,
                    "Exposure outside tolerance"
                );
            }
            result
        }
        Err(e) => {
            warn!("Exposure analysis failed: {e}");
            ExposureResult::invalid()
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::cast_possible_truncation, clippy::float_cmp)]
mod tests {
    use super::*;
    use image::Luma;

    fn gray(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> ImageBuffer {
        ImageBuffer::from_gray(GrayImage::from_fn(width, height, |x, y| Luma([f(x, y)])))
            .expect("buffer")
    }

    #[test]
    fn test_default_config() {
        let config = ExposureConfig::default();
        assert_eq!(config.overexposed_threshold, 245);
        assert_eq!(config.underexposed_threshold, 10);
        assert!((config.tolerance - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_histogram_from_uniform() {
        let img = GrayImage::from_fn(256, 1, |x, _| Luma([x as u8]));
        let hist = Histogram::from_luma(&img);

        assert_eq!(hist.total(), 256);
        assert!(hist.bins.iter().all(|&count| count == 1));
        assert_eq!(hist.count_below(10), 11);
        assert_eq!(hist.count_above(245), 11);
    }

    #[test]
    fn test_histogram_mean_uniform() {
        let img = GrayImage::from_pixel(100, 100, Luma([128u8]));
        let hist = Histogram::from_luma(&img);
        assert!((hist.mean() - 128.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_histogram() {
        let hist = Histogram {
            bins: [0u64; 256],
            total: 0,
        };
        assert_eq!(hist.mean(), 0.0);
        assert_eq!(hist.percent_below(128), 0.0);
        assert_eq!(hist.percent_above(128), 0.0);
    }

    #[test]
    fn test_all_white_is_overexposed() {
        let result = detect_exposure(&gray(100, 100, |_, _| 255), &ExposureConfig::default());

        assert!(result.is_valid);
        assert_eq!(result.overexposed_percentage, Some(100.0));
        assert_eq!(result.underexposed_percentage, Some(0.0));
        assert!(!result.is_overexposed_correct);
        assert!(result.is_underexposed_correct);
        assert!(!result.is_correct_exposure);
    }

    #[test]
    fn test_all_black_is_underexposed() {
        let result = detect_exposure(&gray(100, 100, |_, _| 0), &ExposureConfig::default());

        assert_eq!(result.overexposed_percentage, Some(0.0));
        assert_eq!(result.underexposed_percentage, Some(100.0));
        assert!(result.is_overexposed_correct);
        assert!(!result.is_underexposed_correct);
        assert!(!result.is_correct_exposure);
    }

    #[test]
    fn test_mid_gray_passes() {
        let result = detect_exposure(&gray(100, 100, |_, _| 128), &ExposureConfig::default());

        assert_eq!(result.overexposed_percentage, Some(0.0));
        assert_eq!(result.underexposed_percentage, Some(0.0));
        assert!(result.is_correct_exposure);
        assert!(result.is_valid);
    }

    #[test]
    fn test_threshold_levels_are_inclusive() {
        // Half the pixels sit exactly on each level.
        let image = gray(100, 100, |x, _| if x < 50 { 10 } else { 245 });
        let result = detect_exposure(&image, &ExposureConfig::default());

        assert_eq!(result.underexposed_percentage, Some(50.0));
        assert_eq!(result.overexposed_percentage, Some(50.0));
    }

    #[test]
    fn test_percentages_rounded_to_two_decimals() {
        // 1 of 3 pixels overexposed -> 33.333..%
        let image = gray(3, 1, |x, _| if x == 0 { 255 } else { 128 });
        let result = detect_exposure(&image, &ExposureConfig::default());
        assert_eq!(result.overexposed_percentage, Some(33.33));
    }

    #[test]
    fn test_tolerance_is_strict() {
        // Exactly 25% clipped with tolerance 0.25 fails.
        let image = gray(20, 1, |x, _| if x < 5 { 255 } else { 128 });
        let strict = ExposureConfig {
            tolerance: 0.25,
            ..ExposureConfig::default()
        };
        let result = detect_exposure(&image, &strict);
        assert_eq!(result.overexposed_percentage, Some(25.0));
        assert!(!result.is_overexposed_correct);

        let relaxed = ExposureConfig {
            tolerance: 0.26,
            ..ExposureConfig::default()
        };
        assert!(detect_exposure(&image, &relaxed).is_overexposed_correct);
    }

    #[test]
    fn test_custom_levels() {
        let image = gray(10, 10, |_, _| 230);
        let config = ExposureConfig {
            overexposed_threshold: 220,
            ..ExposureConfig::default()
        };
        let result = detect_exposure(&image, &config);
        assert_eq!(result.overexposed_percentage, Some(100.0));
    }

    #[test]
    fn test_invalid_tolerance_yields_invalid_result() {
        let config = ExposureConfig {
            tolerance: f64::NAN,
            ..ExposureConfig::default()
        };
        let result = detect_exposure(&gray(4, 4, |_, _| 128), &config);
        assert_eq!(result, ExposureResult::invalid());
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let image = gray(64, 64, |x, y| ((x * 7 + y * 3) % 256) as u8);
        let config = ExposureConfig::default();
        assert_eq!(
            detect_exposure(&image, &config),
            detect_exposure(&image, &config)
        );
    }
}
