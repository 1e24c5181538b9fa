//! End-to-end pipeline and report aggregation.
//!
//! [`Pipeline`] runs normalization, fans the analyzers out with `rayon`, and
//! hands their outcomes to [`aggregate`], the only place that decides the
//! top-level `is_valid`. Persistence collaborators run afterwards and can
//! never change a computed report.

use std::sync::Arc;
use std::time::{Duration, Instant};

use candle_core::Device;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{
    AdvancedQualityResult, Dimensions, ExposureResult, ImageBuffer, MetricResult, Report,
    SharpnessResult, SpecularResult,
};
use crate::inference::{device_label, select_device};
use crate::modules::{
    detect_exposure, detect_sharpness, detect_specular_reflections, normalize, score_advanced,
    AdvancedConfig, ExposureConfig, NormalizationResult, NormalizedImage, Presets,
    SharpnessConfig, SpecularConfig,
};
use crate::ports::{EventSink, ImageStore, PipelineEvent, QualityModel, ReportSink};

/// Process-wide configuration, read-only once the pipeline is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QaConfig {
    /// Working resolution presets.
    pub presets: Presets,
    /// Sharpness threshold.
    pub sharpness: SharpnessConfig,
    /// Exposure thresholds.
    pub exposure: ExposureConfig,
    /// Specular reflection parameters.
    pub specular: SpecularConfig,
    /// Advanced quality cutoffs.
    pub advanced: AdvancedConfig,
}

impl QaConfig {
    /// Returns a copy with every present override applied.
    #[must_use]
    pub fn with_overrides(&self, overrides: &Overrides) -> Self {
        Self {
            presets: overrides.presets.unwrap_or(self.presets),
            sharpness: overrides.sharpness.unwrap_or(self.sharpness),
            exposure: overrides.exposure.unwrap_or(self.exposure),
            specular: overrides.specular.unwrap_or(self.specular),
            advanced: overrides.advanced.unwrap_or(self.advanced),
        }
    }
}

/// Per-call configuration; `None` falls back to the pipeline's [`QaConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    /// Preset override.
    pub presets: Option<Presets>,
    /// Sharpness override.
    pub sharpness: Option<SharpnessConfig>,
    /// Exposure override.
    pub exposure: Option<ExposureConfig>,
    /// Specular override.
    pub specular: Option<SpecularConfig>,
    /// Advanced quality override.
    pub advanced: Option<AdvancedConfig>,
}

/// Caller context carried into the report untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportContext {
    /// Opaque client description.
    pub client_info: Option<Value>,
    /// Opaque capture metadata.
    pub metadata: Option<Value>,
    /// Location of the stored resized image.
    pub saved_path: Option<String>,
}

/// One measured duration in the two report units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elapsed {
    /// Seconds, rounded to 4 decimals.
    pub seconds: f64,
    /// Milliseconds, rounded to 2 decimals.
    pub milliseconds: f64,
}

impl From<Duration> for Elapsed {
    fn from(duration: Duration) -> Self {
        let secs = duration.as_secs_f64();
        Self {
            seconds: (secs * 10_000.0).round() / 10_000.0,
            milliseconds: (secs * 100_000.0).round() / 100.0,
        }
    }
}

/// Analyzer outcomes for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Sharpness outcome.
    pub sharpness: SharpnessResult,
    /// Exposure outcome.
    pub exposure: ExposureResult,
    /// Specular outcome.
    pub specular: SpecularResult,
    /// Advanced outcome, when a model is configured.
    pub advanced: Option<AdvancedQualityResult>,
}

impl Metrics {
    /// Every metric invalid; `advanced` present only if a model was configured.
    #[must_use]
    pub fn invalid(with_advanced: bool) -> Self {
        Self {
            sharpness: SharpnessResult::invalid(),
            exposure: ExposureResult::invalid(),
            specular: SpecularResult::invalid(),
            advanced: with_advanced.then(AdvancedQualityResult::invalid),
        }
    }

    fn all_valid(&self) -> bool {
        self.sharpness.is_valid()
            && self.exposure.is_valid()
            && self.specular.is_valid()
            && self.advanced.as_ref().map_or(true, MetricResult::is_valid)
    }
}

/// Composes the final report.
///
/// A failed normalization discards `metrics` entirely: every group is
/// reported invalid and the dimensions are absent.
#[must_use]
pub fn aggregate(
    normalization: &NormalizationResult,
    metrics: Metrics,
    context: ReportContext,
    elapsed: Elapsed,
) -> Report {
    let (image_id, original, resized, metrics) = match normalization.image() {
        Some(image) => (
            Some(image.image_id.clone()),
            Dimensions::from(image.original),
            Dimensions::from(image.resized),
            metrics,
        ),
        None => (
            None,
            Dimensions::absent(),
            Dimensions::absent(),
            Metrics::invalid(metrics.advanced.is_some()),
        ),
    };
    let is_valid = normalization.is_valid() && metrics.all_valid();

    Report {
        client_info: context.client_info,
        metadata: context.metadata,
        image_id,
        original_dimensions: original,
        resized_dimensions: resized,
        sharpness: metrics.sharpness,
        exposure: metrics.exposure,
        specular_reflections: metrics.specular,
        advanced_quality: metrics.advanced,
        saved_path: context.saved_path,
        processing_time_seconds: elapsed.seconds,
        processing_time_milliseconds: elapsed.milliseconds,
        is_valid,
    }
}

/// Image quality pipeline with optional collaborators.
pub struct Pipeline {
    config: QaConfig,
    events: Option<Arc<dyn EventSink>>,
    store: Option<Arc<dyn ImageStore>>,
    reports: Option<Arc<dyn ReportSink>>,
    model: Option<Arc<dyn QualityModel>>,
    device: Device,
}

impl Pipeline {
    /// Creates a pipeline with no collaborators attached.
    #[must_use]
    pub const fn new(config: QaConfig) -> Self {
        Self {
            config,
            events: None,
            store: None,
            reports: None,
            model: None,
            device: Device::Cpu,
        }
    }

    /// Attaches an event observer.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Attaches a store for the resized image.
    #[must_use]
    pub fn with_image_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attaches a sink that receives every report.
    #[must_use]
    pub fn with_report_sink(mut self, reports: Arc<dyn ReportSink>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Enables the advanced quality check.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn QualityModel>) -> Self {
        self.device = select_device(true);
        debug!(
            model = model.name(),
            device = device_label(&self.device),
            "Advanced quality model attached"
        );
        self.model = Some(model);
        self
    }

    /// The process-wide configuration.
    #[must_use]
    pub const fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Runs the pipeline with the process-wide configuration.
    #[must_use]
    pub fn run(&self, bytes: &[u8]) -> Report {
        self.run_in_context(bytes, &Overrides::default(), ReportContext::default())
    }

    /// Runs the pipeline with per-call overrides.
    #[must_use]
    pub fn run_with(&self, bytes: &[u8], overrides: &Overrides) -> Report {
        self.run_in_context(bytes, overrides, ReportContext::default())
    }

    /// Runs the pipeline with overrides and caller context.
    ///
    /// Always returns a well-formed report. Failures show up only as
    /// `is_valid = false` on the report and on the affected metric groups.
    #[must_use]
    pub fn run_in_context(
        &self,
        bytes: &[u8],
        overrides: &Overrides,
        mut context: ReportContext,
    ) -> Report {
        let start = Instant::now();
        let config = self.config.with_overrides(overrides);

        let normalization = normalize(bytes, &config.presets);
        let metrics = match &normalization {
            NormalizationResult::Normalized(image) => {
                self.emit(|| PipelineEvent::Normalized {
                    image_id: image.image_id.clone(),
                    original: (image.original.width, image.original.height),
                    resized: (image.resized.width, image.resized.height),
                });
                let metrics = self.analyze(&image.buffer, &config);
                context.saved_path = self.store_image(image);
                metrics
            }
            NormalizationResult::Failed { reason } => {
                self.emit(|| PipelineEvent::NormalizationFailed {
                    reason: reason.clone(),
                });
                Metrics::invalid(self.model.is_some())
            }
        };

        let report = aggregate(&normalization, metrics, context, start.elapsed().into());
        info!(
            image_id = report.image_id.as_deref().unwrap_or("-"),
            is_valid = report.is_valid,
            ms = report.processing_time_milliseconds,
            "Report built"
        );
        self.emit(|| PipelineEvent::ReportBuilt {
            report: report.clone(),
        });

        if let Some(reports) = &self.reports {
            if let Err(e) = reports.write(&report) {
                self.persistence_failed("report_sink", &e);
            }
        }
        report
    }

    fn analyze(&self, buffer: &ImageBuffer, config: &QaConfig) -> Metrics {
        let ((sharpness, exposure), (specular, advanced)) = rayon::join(
            || {
                rayon::join(
                    || detect_sharpness(buffer, &config.sharpness),
                    || detect_exposure(buffer, &config.exposure),
                )
            },
            || {
                rayon::join(
                    || detect_specular_reflections(buffer, &config.specular),
                    || {
                        self.model.as_deref().map(|model| {
                            score_advanced(buffer, model, &self.device, &config.advanced)
                        })
                    },
                )
            },
        );

        self.metric_event(&sharpness);
        self.metric_event(&exposure);
        self.metric_event(&specular);
        if let Some(advanced) = &advanced {
            self.metric_event(advanced);
        }

        Metrics {
            sharpness,
            exposure,
            specular,
            advanced,
        }
    }

    fn store_image(&self, image: &NormalizedImage) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.store(&image.image_id, &image.encoded_jpeg) {
            Ok(path) => {
                debug!(path = %path, "Stored resized image");
                Some(path)
            }
            Err(e) => {
                self.persistence_failed("image_store", &e);
                None
            }
        }
    }

    fn metric_event<M: MetricResult>(&self, result: &M) {
        let event = if result.is_valid() {
            PipelineEvent::MetricCompleted {
                metric: M::NAME,
                passed: result.passes(),
            }
        } else {
            PipelineEvent::MetricFailed { metric: M::NAME }
        };
        self.emit(|| event);
    }

    fn persistence_failed(&self, target: &'static str, error: &anyhow::Error) {
        warn!(target_name = target, "Persistence failed: {error:#}");
        self.emit(|| PipelineEvent::PersistenceFailed {
            target,
            reason: format!("{error:#}"),
        });
    }

    /// Builds the event only when an observer is attached.
    fn emit(&self, event: impl FnOnce() -> PipelineEvent) {
        if let Some(events) = &self.events {
            events.on_event(event());
        }
    }
}
