//! Core domain types for image quality assessment.

mod buffer;
mod result;

pub use buffer::{Channels, ImageBuffer, Resolution};
pub use result::{
    AdvancedQualityResult, Dimensions, ExposureResult, MetricResult, QualityBucket, Report,
    SharpnessResult, SpecularResult,
};
