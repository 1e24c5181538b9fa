//! Event port for observing pipeline progress.

use crate::domain::Report;

/// Events emitted while a single input flows through the pipeline.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Decoding and resizing succeeded.
    Normalized {
        /// Identifier assigned to the image.
        image_id: String,
        /// Decoded width and height.
        original: (u32, u32),
        /// Working width and height.
        resized: (u32, u32),
    },
    /// Decoding or resizing failed; every metric will be invalid.
    NormalizationFailed {
        /// Cause of the failure.
        reason: String,
    },
    /// A metric finished with a valid result.
    MetricCompleted {
        /// Metric name.
        metric: &'static str,
        /// Whether the metric passed its threshold.
        passed: bool,
    },
    /// A metric could not be computed.
    MetricFailed {
        /// Metric name.
        metric: &'static str,
    },
    /// The final report was assembled.
    ReportBuilt {
        /// The report.
        report: Report,
    },
    /// A persistence collaborator failed. The report is unaffected.
    PersistenceFailed {
        /// Which collaborator failed.
        target: &'static str,
        /// Cause of the failure.
        reason: String,
    },
}

/// Port for receiving pipeline events.
pub trait EventSink: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: PipelineEvent);
}
