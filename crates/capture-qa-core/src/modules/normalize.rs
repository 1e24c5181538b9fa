//! Decoding and resizing to the canonical working resolution.
//!
//! The input is fitted into one of two preset boxes chosen from its own
//! orientation. Aspect ratio is preserved and no padding is added, so only
//! the constraining dimension reaches the preset bound.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{Channels, ImageBuffer, Resolution};
use crate::error::QaError;

/// Target boxes for landscape and portrait inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presets {
    /// Box used when the input is wider than tall.
    pub horizontal: Resolution,
    /// Box used otherwise (including square inputs).
    pub vertical: Resolution,
}

impl Default for Presets {
    fn default() -> Self {
        Self {
            horizontal: Resolution::new(1920, 1080),
            vertical: Resolution::new(1080, 1920),
        }
    }
}

impl Presets {
    /// Picks the preset matching the orientation of `original`.
    #[must_use]
    pub const fn select(&self, original: Resolution) -> Resolution {
        if original.is_landscape() {
            self.horizontal
        } else {
            self.vertical
        }
    }
}

/// Successful normalization output.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Fresh unique identifier for this image.
    pub image_id: String,
    /// Canonical buffer every analyzer reads.
    pub buffer: ImageBuffer,
    /// Decoded input resolution.
    pub original: Resolution,
    /// Working resolution after resizing.
    pub resized: Resolution,
    /// Resized image encoded as JPEG, for persistence collaborators.
    pub encoded_jpeg: Vec<u8>,
}

/// Outcome of [`normalize`]. A failure never carries a partial buffer.
#[derive(Debug, Clone)]
pub enum NormalizationResult {
    /// Decoding and resizing succeeded.
    Normalized(Box<NormalizedImage>),
    /// Decoding or resizing failed.
    Failed {
        /// Human-readable cause, for logs only.
        reason: String,
    },
}

impl NormalizationResult {
    /// Whether normalization succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Normalized(_))
    }

    /// The normalized image, if any.
    #[must_use]
    pub fn image(&self) -> Option<&NormalizedImage> {
        match self {
            Self::Normalized(image) => Some(image),
            Self::Failed { .. } => None,
        }
    }
}

/// Computes the aspect-preserving working resolution for `original`.
///
/// # Errors
///
/// Returns [`QaError::Resize`] when either input or preset dimension is zero.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn target_resolution(original: Resolution, presets: &Presets) -> Result<Resolution, QaError> {
    if !original.is_positive() {
        return Err(QaError::Resize(format!(
            "input has zero dimension {}x{}",
            original.width, original.height
        )));
    }
    let preset = presets.select(original);
    if !preset.is_positive() {
        return Err(QaError::Resize(format!(
            "preset has zero dimension {}x{}",
            preset.width, preset.height
        )));
    }

    let aspect = original.aspect();
    let (width, height) = if aspect > preset.aspect() {
        let height = (f64::from(preset.width) / aspect).round() as u32;
        (preset.width, height.clamp(1, preset.height))
    } else {
        let width = (f64::from(preset.height) * aspect).round() as u32;
        (width.clamp(1, preset.width), preset.height)
    };

    Ok(Resolution::new(width, height))
}

/// Decodes, resizes and re-encodes `bytes`, returning the typed error.
///
/// # Errors
///
/// [`QaError::Decode`] for empty, corrupt or unsupported input and
/// [`QaError::Resize`] for geometry or encoding failures.
pub fn try_normalize(bytes: &[u8], presets: &Presets) -> Result<NormalizedImage, QaError> {
    if bytes.is_empty() {
        return Err(QaError::Decode("empty input".into()));
    }

    let decoded = image::load_from_memory(bytes)?;
    let original = Resolution::new(decoded.width(), decoded.height());
    info!(
        width = original.width,
        height = original.height,
        "Decoded input image"
    );

    let resized = target_resolution(original, presets)?;
    let buffer = resize(&decoded, original, resized)?;
    info!(
        width = resized.width,
        height = resized.height,
        "Resized to working resolution"
    );

    let encoded_jpeg = encode_jpeg(&buffer)?;
    debug!(bytes = encoded_jpeg.len(), "Encoded resized image");

    Ok(NormalizedImage {
        image_id: Uuid::new_v4().to_string(),
        buffer,
        original,
        resized,
        encoded_jpeg,
    })
}

/// Brings arbitrary encoded bytes to the canonical [`ImageBuffer`].
///
/// Never fails uncontrolled: any error becomes [`NormalizationResult::Failed`].
#[must_use]
pub fn normalize(bytes: &[u8], presets: &Presets) -> NormalizationResult {
    match try_normalize(bytes, presets) {
        Ok(image) => NormalizationResult::Normalized(Box::new(image)),
        Err(e) => {
            warn!("Normalization failed: {e}");
            NormalizationResult::Failed {
                reason: e.to_string(),
            }
        }
    }
}

fn resize(
    decoded: &DynamicImage,
    original: Resolution,
    target: Resolution,
) -> Result<ImageBuffer, QaError> {
    let source = ImageBuffer::from_dynamic(decoded)
        .map_err(|e| QaError::Resize(format!("unusable decoded image: {e}")))?;
    if original == target {
        return Ok(source);
    }

    let result = match source.channels() {
        Channels::Gray => ImageBuffer::from_gray(imageops::resize(
            &source.luma(),
            target.width,
            target.height,
            FilterType::Triangle,
        )),
        Channels::Rgb => ImageBuffer::from_rgb(imageops::resize(
            &source.to_rgb(),
            target.width,
            target.height,
            FilterType::Triangle,
        )),
    };
    result.map_err(|e| QaError::Resize(e.to_string()))
}

fn encode_jpeg(buffer: &ImageBuffer) -> Result<Vec<u8>, QaError> {
    let mut out = Cursor::new(Vec::new());
    buffer
        .to_dynamic()
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| QaError::Resize(format!("JPEG encoding failed: {e}")))?;
    Ok(out.into_inner())
}
