//! Capture QA Core - Normalization and quality metrics
//!
//! This crate contains the canonical image buffer, the normalizer that brings
//! arbitrary inputs to a working resolution, the sharpness, exposure and
//! specular-reflection analyzers, the advanced quality adapter, and the
//! pipeline that aggregates everything into one report.

pub mod domain;
pub mod error;
pub mod inference;
pub mod modules;
pub mod pipeline;
pub mod ports;

pub use domain::{
    AdvancedQualityResult, Channels, Dimensions, ExposureResult, ImageBuffer, MetricResult,
    QualityBucket, Report, Resolution, SharpnessResult, SpecularResult,
};
pub use error::QaError;
pub use inference::{device_label, select_device, to_input_tensor, BlockVarianceModel};
pub use modules::{
    detect_exposure, detect_sharpness, detect_specular_reflections, normalize, score_advanced,
    AdvancedConfig, ExposureConfig, NormalizationResult, NormalizedImage, Presets,
    SharpnessConfig, SpecularConfig,
};
pub use pipeline::{aggregate, Elapsed, Metrics, Overrides, Pipeline, QaConfig, ReportContext};
pub use ports::{
    EventSink, ImageSource, ImageStore, PipelineEvent, QualityModel, RawImage, ReportSink,
};
