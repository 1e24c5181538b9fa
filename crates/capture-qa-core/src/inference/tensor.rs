//! Conversion of image buffers into model input tensors.

use candle_core::{DType, Device, Tensor};

use crate::domain::ImageBuffer;

/// Converts `image` into a `(1, 3, H, W)` `f32` tensor normalized to `[0, 1]`.
///
/// Grayscale buffers are replicated across the three channels.
///
/// # Errors
///
/// Returns an error if tensor creation fails.
pub fn to_input_tensor(image: &ImageBuffer, device: &Device) -> candle_core::Result<Tensor> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let rgb = image.to_rgb();

    let data: Vec<f32> = rgb
        .pixels()
        .flat_map(|p| {
            [
                f32::from(p[0]) / 255.0,
                f32::from(p[1]) / 255.0,
                f32::from(p[2]) / 255.0,
            ]
        })
        .collect();

    // HWC -> NCHW
    Tensor::from_vec(data, (1, height, width, 3), device)?
        .permute((0, 3, 1, 2))?
        .to_dtype(DType::F32)?
        .contiguous()
}
