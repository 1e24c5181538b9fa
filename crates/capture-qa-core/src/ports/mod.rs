//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the pipeline core and its
//! collaborators: input enumeration, persistence, event observation and the
//! external quality scorer.

mod events;
mod image_source;
mod image_store;
mod quality_model;
mod report_sink;

pub use events::{EventSink, PipelineEvent};
pub use image_source::{ImageSource, RawImage};
pub use image_store::ImageStore;
pub use quality_model::QualityModel;
pub use report_sink::ReportSink;
