//! Normalization and quality metric implementations.
//!
//! Every analyzer is a pure function of an [`ImageBuffer`](crate::ImageBuffer)
//! and its configuration, and never fails: internal errors surface as the
//! metric's invalid result.

mod advanced;
mod exposure;
mod normalize;
mod sharpness;
mod specular;

pub use advanced::{score_advanced, AdvancedConfig};
pub use exposure::{detect_exposure, ExposureConfig, Histogram};
pub use normalize::{
    normalize, target_resolution, try_normalize, NormalizationResult, NormalizedImage, Presets,
};
pub use sharpness::{detect_sharpness, laplacian_variance, SharpnessConfig};
pub use specular::{
    candidate_mask, close, detect_specular_reflections, filter_regions, HsvPlanes,
    SpecularAnalysis, SpecularConfig, StructuringElement,
};
