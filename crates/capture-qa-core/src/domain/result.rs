//! Per-metric outcomes and the aggregate report.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Resolution;

/// Common contract for per-analyzer outcomes.
///
/// A result is either fully measured (`is_valid == true`, every metric field
/// present) or fully invalid (every metric field absent, every flag false).
pub trait MetricResult: Sized {
    /// Metric name used in logs and events.
    const NAME: &'static str;

    /// The all-absent failure shape.
    fn invalid() -> Self;

    /// Whether the analyzer produced real values.
    fn is_valid(&self) -> bool;

    /// Whether the measured values satisfy the configured thresholds.
    fn passes(&self) -> bool;
}

/// Focus measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SharpnessResult {
    /// Variance of the Laplacian response.
    pub sharpness_value: Option<f64>,
    /// `sharpness_value >= threshold`.
    pub is_correct_sharpness: bool,
    /// Whether the analyzer succeeded.
    pub is_valid: bool,
}

impl MetricResult for SharpnessResult {
    const NAME: &'static str = "sharpness";

    fn invalid() -> Self {
        Self {
            sharpness_value: None,
            is_correct_sharpness: false,
            is_valid: false,
        }
    }

    fn is_valid(&self) -> bool {
        self.is_valid
    }

    fn passes(&self) -> bool {
        self.is_valid && self.is_correct_sharpness
    }
}

/// Clipped-pixel measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureResult {
    /// Percentage of pixels at or above the overexposure level, 2 decimals.
    pub overexposed_percentage: Option<f64>,
    /// Percentage of pixels at or below the underexposure level, 2 decimals.
    pub underexposed_percentage: Option<f64>,
    /// Overexposed share is under the tolerance.
    pub is_overexposed_correct: bool,
    /// Underexposed share is under the tolerance.
    pub is_underexposed_correct: bool,
    /// Both shares are under the tolerance.
    pub is_correct_exposure: bool,
    /// Whether the analyzer succeeded.
    pub is_valid: bool,
}

impl MetricResult for ExposureResult {
    const NAME: &'static str = "exposure";

    fn invalid() -> Self {
        Self {
            overexposed_percentage: None,
            underexposed_percentage: None,
            is_overexposed_correct: false,
            is_underexposed_correct: false,
            is_correct_exposure: false,
            is_valid: false,
        }
    }

    fn is_valid(&self) -> bool {
        self.is_valid
    }

    fn passes(&self) -> bool {
        self.is_valid && self.is_correct_exposure
    }
}

/// Glare coverage measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecularResult {
    /// Percentage of pixels inside surviving glare regions.
    pub specular_score: Option<f64>,
    /// `specular_score < sensitivity`.
    pub is_correct_specular_reflections: bool,
    /// Whether the analyzer succeeded.
    pub is_valid: bool,
}

impl MetricResult for SpecularResult {
    const NAME: &'static str = "specular_reflections";

    fn invalid() -> Self {
        Self {
            specular_score: None,
            is_correct_specular_reflections: false,
            is_valid: false,
        }
    }

    fn is_valid(&self) -> bool {
        self.is_valid
    }

    fn passes(&self) -> bool {
        self.is_valid && self.is_correct_specular_reflections
    }
}

/// Qualitative bucket for a no-reference quality score (lower is better).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityBucket {
    /// Score at or under the high cutoff.
    High,
    /// Score at or under the medium cutoff.
    Medium,
    /// Anything worse.
    Bad,
}

impl QualityBucket {
    /// Buckets a score against two ordered cutoffs.
    #[must_use]
    pub fn classify(score: f64, high: f64, medium: f64) -> Self {
        if score <= high {
            Self::High
        } else if score <= medium {
            Self::Medium
        } else {
            Self::Bad
        }
    }
}

/// Learned or heuristic no-reference quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdvancedQualityResult {
    /// Model score, 4 decimals.
    pub score: Option<f64>,
    /// Bucket derived from the score.
    pub quality: Option<QualityBucket>,
    /// Whether the model succeeded.
    pub is_valid: bool,
}

impl MetricResult for AdvancedQualityResult {
    const NAME: &'static str = "advanced_quality";

    fn invalid() -> Self {
        Self {
            score: None,
            quality: None,
            is_valid: false,
        }
    }

    fn is_valid(&self) -> bool {
        self.is_valid
    }

    fn passes(&self) -> bool {
        self.is_valid && self.quality != Some(QualityBucket::Bad)
    }
}

/// Width and height that serialize as `null` when unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: Option<u32>,
    /// Height in pixels.
    pub height: Option<u32>,
}

impl Dimensions {
    /// Both fields absent.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            width: None,
            height: None,
        }
    }
}

impl From<Resolution> for Dimensions {
    fn from(resolution: Resolution) -> Self {
        Self {
            width: Some(resolution.width),
            height: Some(resolution.height),
        }
    }
}

/// Aggregate outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Caller-supplied client description, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_info: Option<Value>,
    /// Caller-supplied capture metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Identifier assigned by the normalizer.
    pub image_id: Option<String>,
    /// Input resolution.
    pub original_dimensions: Dimensions,
    /// Working resolution.
    pub resized_dimensions: Dimensions,
    /// Sharpness group.
    pub sharpness: SharpnessResult,
    /// Exposure group.
    pub exposure: ExposureResult,
    /// Specular reflection group.
    pub specular_reflections: SpecularResult,
    /// Present only when an advanced model is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced_quality: Option<AdvancedQualityResult>,
    /// Where the resized image was stored, if it was.
    #[serde(default)]
    pub saved_path: Option<String>,
    /// End-to-end duration, 4 decimals.
    pub processing_time_seconds: f64,
    /// The same duration in milliseconds, 2 decimals.
    pub processing_time_milliseconds: f64,
    /// Normalization and every invoked analyzer succeeded.
    pub is_valid: bool,
}

impl Report {
    /// True when the report is valid and every metric passes its threshold.
    #[must_use]
    pub fn passes(&self) -> bool {
        self.is_valid
            && self.sharpness.passes()
            && self.exposure.passes()
            && self.specular_reflections.passes()
            && self
                .advanced_quality
                .as_ref()
                .map_or(true, MetricResult::passes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_shapes_have_no_values() {
        let s = SharpnessResult::invalid();
        assert!(s.sharpness_value.is_none() && !s.is_correct_sharpness && !s.is_valid);

        let e = ExposureResult::invalid();
        assert!(e.overexposed_percentage.is_none() && e.underexposed_percentage.is_none());
        assert!(!e.is_overexposed_correct && !e.is_underexposed_correct);
        assert!(!e.is_correct_exposure && !e.is_valid);

        let r = SpecularResult::invalid();
        assert!(r.specular_score.is_none() && !r.is_correct_specular_reflections);
    }

    #[test]
    fn test_invalid_sharpness_serializes_nulls() {
        let json = serde_json::to_value(SharpnessResult::invalid()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sharpness_value": null,
                "is_correct_sharpness": false,
                "is_valid": false
            })
        );
    }

    #[test]
    fn test_quality_bucket_cutoffs() {
        assert_eq!(QualityBucket::classify(3.0, 3.0, 5.5), QualityBucket::High);
        assert_eq!(QualityBucket::classify(5.5, 3.0, 5.5), QualityBucket::Medium);
        assert_eq!(QualityBucket::classify(5.6, 3.0, 5.5), QualityBucket::Bad);
        assert_eq!(
            serde_json::to_value(QualityBucket::Medium).unwrap(),
            serde_json::json!("MEDIUM")
        );
    }

    #[test]
    fn test_absent_dimensions_serialize_as_null() {
        let json = serde_json::to_value(Dimensions::absent()).unwrap();
        assert_eq!(json, serde_json::json!({"width": null, "height": null}));
    }
}
