//! Canonical in-memory image representation.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::QaError;

/// Channel layout of an [`ImageBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channels {
    /// Single luminance channel.
    Gray,
    /// Three channels in R, G, B order.
    Rgb,
}

impl Channels {
    /// Number of interleaved samples per pixel.
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Gray => 1,
            Self::Rgb => 3,
        }
    }
}

/// Image width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Creates a new resolution.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    #[must_use]
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    /// True when strictly wider than tall.
    #[must_use]
    pub const fn is_landscape(self) -> bool {
        self.width > self.height
    }

    /// True when both dimensions are non-zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Dense, immutable pixel matrix shared read-only by every analyzer.
///
/// Invariant: `width > 0`, `height > 0` and
/// `pixels.len() == width * height * channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    channels: Channels,
    pixels: Vec<u8>,
}

impl ImageBuffer {
    /// Creates a buffer from interleaved samples, checking the size invariant.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::InvalidBuffer`] when a dimension is zero or the
    /// sample count does not match the geometry.
    pub fn new(
        width: u32,
        height: u32,
        channels: Channels,
        pixels: Vec<u8>,
    ) -> Result<Self, QaError> {
        if width == 0 || height == 0 {
            return Err(QaError::InvalidBuffer(format!(
                "zero-sized image {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * channels.count();
        if pixels.len() != expected {
            return Err(QaError::InvalidBuffer(format!(
                "expected {expected} samples for {width}x{height}x{}, got {}",
                channels.count(),
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Wraps a grayscale image.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::InvalidBuffer`] for zero-sized images.
    pub fn from_gray(image: GrayImage) -> Result<Self, QaError> {
        let (width, height) = image.dimensions();
        Self::new(width, height, Channels::Gray, image.into_raw())
    }

    /// Wraps an RGB image.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::InvalidBuffer`] for zero-sized images.
    pub fn from_rgb(image: RgbImage) -> Result<Self, QaError> {
        let (width, height) = image.dimensions();
        Self::new(width, height, Channels::Rgb, image.into_raw())
    }

    /// Converts a decoded image, keeping grayscale sources single-channel
    /// and flattening everything else to 8-bit RGB.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::InvalidBuffer`] for zero-sized images.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self, QaError> {
        match image {
            DynamicImage::ImageLuma8(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => Self::from_gray(image.to_luma8()),
            _ => Self::from_rgb(image.to_rgb8()),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout.
    #[must_use]
    pub const fn channels(&self) -> Channels {
        self.channels
    }

    /// Raw interleaved samples.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Dimensions as a [`Resolution`].
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Number of pixels (not samples).
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Luminance plane using BT.601 weights in 14-bit fixed point.
    #[must_use]
    pub fn luma(&self) -> GrayImage {
        let samples = match self.channels {
            Channels::Gray => self.pixels.clone(),
            Channels::Rgb => self
                .pixels
                .chunks_exact(3)
                .map(|px| luma_from_rgb(px[0], px[1], px[2]))
                .collect(),
        };
        let (width, height) = (self.width, self.height);
        GrayImage::from_raw(width, height, samples)
            .unwrap_or_else(|| GrayImage::from_pixel(width, height, Luma([0])))
    }

    /// RGB view, replicating the luminance channel for grayscale buffers.
    #[must_use]
    pub fn to_rgb(&self) -> RgbImage {
        match self.channels {
            Channels::Rgb => RgbImage::from_raw(self.width, self.height, self.pixels.clone())
                .unwrap_or_else(|| RgbImage::from_pixel(self.width, self.height, Rgb([0, 0, 0]))),
            Channels::Gray => {
                let luma = self.luma();
                RgbImage::from_fn(self.width, self.height, |x, y| {
                    let v = luma.get_pixel(x, y).0[0];
                    Rgb([v, v, v])
                })
            }
        }
    }

    /// Converts back into a [`DynamicImage`] of the same layout.
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicImage {
        match self.channels {
            Channels::Gray => DynamicImage::ImageLuma8(self.luma()),
            Channels::Rgb => DynamicImage::ImageRgb8(self.to_rgb()),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn luma_from_rgb(r: u8, g: u8, b: u8) -> u8 {
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    let y = (u32::from(r) * R + u32::from(g) * G + u32::from(b) * B + (1 << 13)) >> 14;
    y.min(255) as u8
}
