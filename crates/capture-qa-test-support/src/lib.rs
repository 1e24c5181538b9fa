//! Test support utilities for capture-qa.
//!
//! Provides mocks, synthetic image builders, and utilities for testing
//! the capture-qa pipeline.
//!
//! # Example
//!
//! ```
//! use capture_qa_test_support::{MockImageSource, SyntheticImageBuilder};
//!
//! // Create synthetic test inputs
//! let sharp = SyntheticImageBuilder::checkerboard(128, 128);
//! let glare = SyntheticImageBuilder::disc_on_background(200, 20, [250, 250, 250], [110, 110, 110]);
//!
//! // Create mock image source of encoded inputs
//! let source = MockImageSource::new(vec![
//!     SyntheticImageBuilder::raw("sharp.png", &sharp),
//!     SyntheticImageBuilder::raw("glare.png", &glare),
//! ]);
//! ```

mod builders;
mod mocks;

pub use builders::SyntheticImageBuilder;
pub use mocks::{
    MockEventSink, MockImageSource, MockImageStore, MockQualityModel, MockReportSink,
};
