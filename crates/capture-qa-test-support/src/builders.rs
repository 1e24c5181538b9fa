//! Synthetic image builders for testing.

use std::io::Cursor;

use capture_qa_core::{ImageBuffer, RawImage};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};

/// Builder for creating synthetic test images.
///
/// Provides convenience methods for generating images with specific
/// characteristics (sharp, flat, clipped, glare) and for turning them into
/// the inputs the pipeline consumes.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    // === Sharp/High-Contrast Images ===

    /// Creates a high-contrast checkerboard pattern (very sharp edges).
    #[must_use]
    pub fn checkerboard(width: u32, height: u32) -> DynamicImage {
        Self::checkerboard_with_cell_size(width, height, 8)
    }

    /// Creates a checkerboard with custom cell size.
    #[must_use]
    pub fn checkerboard_with_cell_size(width: u32, height: u32, cell_size: u32) -> DynamicImage {
        let cell = cell_size.max(1);
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        }))
    }

    // === Flat Images ===

    /// Creates a uniform gray image (no edges, reads as out of focus).
    #[must_use]
    pub fn uniform_gray(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
    }

    /// Creates a smooth horizontal gradient from black to white.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn horizontal_gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, _| {
            Luma([((u32::from(u8::MAX) * x) / width.max(1)) as u8])
        }))
    }

    // === Exposure Images ===

    /// Creates a completely black image.
    #[must_use]
    pub fn underexposed(width: u32, height: u32) -> DynamicImage {
        Self::uniform_gray(width, height, 0)
    }

    /// Creates a completely white image.
    #[must_use]
    pub fn overexposed(width: u32, height: u32) -> DynamicImage {
        Self::uniform_gray(width, height, 255)
    }

    /// Creates a well-exposed middle-gray image.
    #[must_use]
    pub fn well_exposed(width: u32, height: u32) -> DynamicImage {
        Self::uniform_gray(width, height, 128)
    }

    /// Creates a uniform RGB image.
    #[must_use]
    pub fn rgb_uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([r, g, b])))
    }

    // === Glare Images ===

    /// Creates a square image with one filled disc centred on a flat background.
    #[must_use]
    pub fn disc_on_background(size: u32, radius: u32, fg: [u8; 3], bg: [u8; 3]) -> DynamicImage {
        let c = f64::from(size) / 2.0;
        let r2 = f64::from(radius).powi(2);
        DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, y| {
            let (dx, dy) = (f64::from(x) + 0.5 - c, f64::from(y) + 0.5 - c);
            if dx * dx + dy * dy <= r2 {
                Rgb(fg)
            } else {
                Rgb(bg)
            }
        }))
    }

    /// Textured mid-tone scene with a large white glare patch, sharp and well exposed.
    #[must_use]
    pub fn glare_scene(width: u32, height: u32) -> DynamicImage {
        let (x0, y0) = (width / 4, height / 4);
        let (x1, y1) = (x0 + width / 4, y0 + height / 4);
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                texture(x, y)
            }
        }))
    }

    // === Passing Images ===

    /// Textured mid-tone scene that passes every check at its native size.
    ///
    /// Build it at a size the normalizer keeps unchanged, such as 1440x1080;
    /// upscaling smooths the texture below the default sharpness threshold.
    #[must_use]
    pub fn textured_scene(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, texture))
    }

    // === Conversions ===

    /// Converts to the canonical buffer analyzers consume.
    ///
    /// # Panics
    ///
    /// Never for images built here; the buffer invariant always holds.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn buffer(image: &DynamicImage) -> ImageBuffer {
        ImageBuffer::from_dynamic(image).expect("synthetic image is a valid buffer")
    }

    /// Encodes as PNG bytes.
    ///
    /// # Panics
    ///
    /// If in-memory encoding fails.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn png(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("PNG encoding");
        bytes
    }

    /// Wraps PNG bytes of `image` as a pipeline input.
    #[must_use]
    pub fn raw(path: &str, image: &DynamicImage) -> RawImage {
        RawImage {
            path: path.to_string(),
            bytes: Self::png(image),
        }
    }
}

/// 4px two-tone checker with no clipped or specular pixels.
fn texture(x: u32, y: u32) -> Rgb<u8> {
    if (x / 4 + y / 4) % 2 == 0 {
        Rgb([60, 80, 100])
    } else {
        Rgb([170, 150, 130])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkerboard_pattern() {
        let img = SyntheticImageBuilder::checkerboard_with_cell_size(16, 16, 8);
        let luma = img.to_luma8();

        assert_eq!(luma.get_pixel(0, 0).0[0], 255);
        assert_eq!(luma.get_pixel(8, 0).0[0], 0);
    }

    #[test]
    fn test_gradient_range() {
        let luma = SyntheticImageBuilder::horizontal_gradient(256, 10).to_luma8();

        assert!(luma.get_pixel(0, 0).0[0] < 5);
        assert!(luma.get_pixel(255, 0).0[0] > 250);
    }

    #[test]
    fn test_disc_on_background() {
        let rgb = SyntheticImageBuilder::disc_on_background(100, 10, [255, 255, 255], [0, 0, 0])
            .to_rgb8();

        assert_eq!(rgb.get_pixel(50, 50).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(0, 0).0, [0, 0, 0]);
        let lit = rgb.pixels().filter(|p| p.0[0] == 255).count();
        assert!((300..330).contains(&lit), "disc area {lit}");
    }

    #[test]
    fn test_buffer_keeps_channels() {
        let gray = SyntheticImageBuilder::buffer(&SyntheticImageBuilder::well_exposed(4, 4));
        let rgb = SyntheticImageBuilder::buffer(&SyntheticImageBuilder::rgb_uniform(4, 4, 1, 2, 3));

        assert_eq!(gray.pixels().len(), 16);
        assert_eq!(rgb.pixels().len(), 48);
    }

    #[test]
    fn test_png_round_trips_dimensions() {
        let bytes = SyntheticImageBuilder::png(&SyntheticImageBuilder::checkerboard(30, 20));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 20));
    }
}
