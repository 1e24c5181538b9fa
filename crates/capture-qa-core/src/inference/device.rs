//! Tensor device selection for quality models.

use candle_core::Device;
use tracing::{debug, info};

/// Picks the device model input tensors are built on.
///
/// With `prefer_accelerator` set, tries Metal and then CUDA when the matching
/// feature is compiled in. Falls back to the CPU.
#[must_use]
pub fn select_device(prefer_accelerator: bool) -> Device {
    if !prefer_accelerator {
        debug!("Accelerator disabled, scoring on CPU");
        return Device::Cpu;
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Scoring on Metal device 0");
                return device;
            }
            Err(e) => debug!("Metal unavailable: {e}"),
        }
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Scoring on CUDA device 0");
                return device;
            }
            Err(e) => debug!("CUDA unavailable: {e}"),
        }
    }

    info!("Scoring on CPU");
    Device::Cpu
}

/// Short name for logs.
#[must_use]
pub const fn device_label(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}
