//! Inference support for the advanced quality check.
//!
//! Provides device selection, tensor preprocessing and the built-in
//! block-variance scorer.

mod block_variance;
mod device;
mod tensor;

pub use block_variance::BlockVarianceModel;
pub use device::{device_label, select_device};
pub use tensor::to_input_tensor;
