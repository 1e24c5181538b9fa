//! Mock implementations of core port traits.

use std::sync::{Arc, Mutex, PoisonError};

use candle_core::Tensor;
use capture_qa_core::ports::{
    EventSink, ImageSource, ImageStore, PipelineEvent, QualityModel, RawImage, ReportSink,
};
use capture_qa_core::{AdvancedConfig, Report};

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built inputs and tracks iteration for assertions.
pub struct MockImageSource {
    images: Vec<RawImage>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given inputs.
    #[must_use]
    pub fn new(images: Vec<RawImage>) -> Self {
        Self {
            images,
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<RawImage>> + Send + '_> {
        let count = Arc::clone(&self.iteration_count);
        if let Ok(mut c) = count.lock() {
            *c += 1;
        }
        Box::new(self.images.iter().cloned().map(Ok))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.images.len())
    }
}

/// Mock implementation of `ReportSink` for testing.
///
/// Captures reports for later assertions, or fails every write.
#[derive(Default)]
pub struct MockReportSink {
    reports: Arc<Mutex<Vec<Report>>>,
    fail: bool,
}

impl MockReportSink {
    /// Creates a new capturing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink whose writes always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for MockReportSink {
    fn write(&self, report: &Report) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("mock report sink failure");
        }
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }
}

/// Mock implementation of `ImageStore` for testing.
///
/// Records stored image ids and returns a fake path, or fails every write.
#[derive(Default)]
pub struct MockImageStore {
    stored: Arc<Mutex<Vec<(String, usize)>>>,
    fail: bool,
}

impl MockImageStore {
    /// Creates a new recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose writes always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Returns `(image_id, byte_len)` for every stored image.
    #[must_use]
    pub fn stored(&self) -> Vec<(String, usize)> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ImageStore for MockImageStore {
    fn store(&self, image_id: &str, jpeg: &[u8]) -> anyhow::Result<String> {
        if self.fail {
            anyhow::bail!("mock image store failure");
        }
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((image_id.to_string(), jpeg.len()));
        Ok(format!("memory://image_{image_id}.jpg"))
    }
}

/// Mock implementation of `EventSink` for testing.
///
/// Captures events for later assertions.
#[derive(Default)]
pub struct MockEventSink {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl MockEventSink {
    /// Creates a new mock event sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of metrics that completed.
    #[must_use]
    pub fn completed_metrics(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::MetricCompleted { metric, .. } => Some(*metric),
                _ => None,
            })
            .collect()
    }

    /// Names of metrics that failed.
    #[must_use]
    pub fn failed_metrics(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::MetricFailed { metric } => Some(*metric),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of `PersistenceFailed` events.
    #[must_use]
    pub fn persistence_failures(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PipelineEvent::PersistenceFailed { .. }))
            .count()
    }

    /// Returns the number of `ReportBuilt` events.
    #[must_use]
    pub fn reports_built(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PipelineEvent::ReportBuilt { .. }))
            .count()
    }
}

impl EventSink for MockEventSink {
    fn on_event(&self, event: PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Mock implementation of `QualityModel` returning a fixed score.
pub struct MockQualityModel {
    score: Option<f64>,
    calls: Arc<Mutex<Vec<Vec<usize>>>>,
}

impl MockQualityModel {
    /// Model that always returns `score`.
    #[must_use]
    pub fn new(score: f64) -> Self {
        Self {
            score: Some(score),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Model that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            score: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shapes of every input tensor received.
    #[must_use]
    pub fn input_shapes(&self) -> Vec<Vec<usize>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QualityModel for MockQualityModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn score(&self, input: &Tensor, _config: &AdvancedConfig) -> anyhow::Result<f64> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(input.dims().to_vec());
        self.score
            .ok_or_else(|| anyhow::anyhow!("mock quality model failure"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::SyntheticImageBuilder;

    #[test]
    fn test_mock_image_source_empty() {
        let source = MockImageSource::empty();
        assert_eq!(source.count_hint(), Some(0));
        assert_eq!(source.images().count(), 0);
        assert_eq!(source.iteration_count(), 1);
    }

    #[test]
    fn test_mock_image_source_with_images() {
        let img = SyntheticImageBuilder::well_exposed(10, 10);
        let source = MockImageSource::new(vec![SyntheticImageBuilder::raw("test.png", &img)]);

        assert_eq!(source.count_hint(), Some(1));
        let first = source.images().next().unwrap().unwrap();
        assert_eq!(first.path, "test.png");
        assert!(!first.bytes.is_empty());
    }

    #[test]
    fn test_mock_image_store() {
        let store = MockImageStore::new();
        let path = store.store("abc", &[1, 2, 3]).unwrap();

        assert_eq!(path, "memory://image_abc.jpg");
        assert_eq!(store.stored(), vec![("abc".to_string(), 3)]);
        assert!(MockImageStore::failing().store("abc", &[]).is_err());
    }

    #[test]
    fn test_mock_event_sink() {
        let sink = MockEventSink::new();
        sink.on_event(PipelineEvent::MetricCompleted {
            metric: "sharpness",
            passed: true,
        });
        sink.on_event(PipelineEvent::MetricFailed { metric: "exposure" });

        assert_eq!(sink.completed_metrics(), ["sharpness"]);
        assert_eq!(sink.failed_metrics(), ["exposure"]);
        assert_eq!(sink.persistence_failures(), 0);
    }

    #[test]
    fn test_mock_quality_model() {
        let model = MockQualityModel::new(7.5);
        let input = Tensor::zeros((1, 3, 2, 2), candle_core::DType::F32, &candle_core::Device::Cpu)
            .unwrap();

        let config = AdvancedConfig::default();

        assert!((model.score(&input, &config).unwrap() - 7.5).abs() < f64::EPSILON);
        assert_eq!(model.input_shapes(), vec![vec![1, 3, 2, 2]]);
        assert!(MockQualityModel::failing().score(&input, &config).is_err());
    }
}
