//! Specular reflection (glare) analysis.
//!
//! Glare shows up as bright, desaturated pixels. Candidates are selected in
//! HSV space, cleaned with a morphological closing, grouped into 8-connected
//! regions, and regions smaller than `min_region_size` are discarded. The
//! score is the share of the image covered by the surviving regions.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_close, Mask};
use imageproc::region_labelling::{connected_components, Connectivity};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{Channels, ImageBuffer, MetricResult, SpecularResult};
use crate::error::QaError;

const FOREGROUND: u8 = 255;

/// Configuration for specular reflection analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpecularConfig {
    /// Minimum HSV value (0-255) of a glare candidate.
    pub intensity_threshold: u8,
    /// Maximum HSV saturation (0-255) of a glare candidate.
    pub saturation_threshold: u8,
    /// Regions with fewer pixels than this are treated as noise.
    pub min_region_size: u32,
    /// Score ceiling, in percent of the image area.
    pub sensitivity: f64,
}

impl Default for SpecularConfig {
    fn default() -> Self {
        Self {
            intensity_threshold: 240,
            saturation_threshold: 50,
            min_region_size: 200,
            sensitivity: 1.5,
        }
    }
}

/// Hue, saturation and value planes in 8-bit convention
/// (hue 0-179 in 2-degree steps, saturation and value 0-255).
#[derive(Debug, Clone)]
pub struct HsvPlanes {
    /// Hue plane.
    pub hue: GrayImage,
    /// Saturation plane.
    pub saturation: GrayImage,
    /// Value plane.
    pub value: GrayImage,
}

impl HsvPlanes {
    /// Converts an image buffer. Grayscale buffers have zero hue and saturation.
    #[must_use]
    pub fn from_buffer(image: &ImageBuffer) -> Self {
        let (width, height) = (image.width(), image.height());
        let n = image.pixel_count();
        let mut hue = Vec::with_capacity(n);
        let mut saturation = Vec::with_capacity(n);
        let mut value = Vec::with_capacity(n);

        match image.channels() {
            Channels::Gray => {
                hue.resize(n, 0);
                saturation.resize(n, 0);
                value.extend_from_slice(image.pixels());
            }
            Channels::Rgb => {
                for px in image.pixels().chunks_exact(3) {
                    let (h, s, v) = hsv_from_rgb(px[0], px[1], px[2]);
                    hue.push(h);
                    saturation.push(s);
                    value.push(v);
                }
            }
        }

        let plane = |data: Vec<u8>| {
            GrayImage::from_raw(width, height, data)
                .unwrap_or_else(|| GrayImage::new(width, height))
        };
        Self {
            hue: plane(hue),
            saturation: plane(saturation),
            value: plane(value),
        }
    }
}

fn hsv_from_rgb(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(v - min);

    let s = if v == 0 {
        0.0
    } else {
        (255.0 * delta / f32::from(v)).round()
    };

    let h = if delta == 0.0 {
        0.0
    } else {
        let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
        let degrees = if v == r {
            60.0 * (gf - bf) / delta
        } else if v == g {
            120.0 + 60.0 * (bf - rf) / delta
        } else {
            240.0 + 60.0 * (rf - gf) / delta
        };
        let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
        (degrees / 2.0).round() % 180.0
    };

    (h as u8, s as u8, v)
}

/// Binary structuring element anchored at its centre pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    cells: GrayImage,
}

impl StructuringElement {
    /// Ellipse inscribed in a `width` x `height` box, rasterised row by row
    /// from the centre so that a 5x5 element has single-pixel tips.
    #[must_use]
    pub fn ellipse(width: u8, height: u8) -> Self {
        let (width, height) = (u32::from(width.max(1)), u32::from(height.max(1)));
        let (c, r) = (width / 2, height / 2);
        let inv_r2 = if r == 0 { 0.0 } else { 1.0 / f64::from(r * r) };

        let cells = GrayImage::from_fn(width, height, |x, y| {
            let dy = f64::from(y) - f64::from(r);
            let span = (f64::from(r * r) - dy * dy) * inv_r2;
            let dx = (f64::from(c) * span.max(0.0).sqrt()).round() as u32;
            let inside = x + dx >= c && x <= c + dx;
            Luma([if inside { FOREGROUND } else { 0 }])
        });
        Self { cells }
    }

    /// Whether the element covers `(row, col)`.
    #[must_use]
    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.cells
            .get_pixel_checked(col, row)
            .is_some_and(|p| p.0[0] != 0)
    }

    fn mask(&self) -> Mask {
        let (width, height) = self.cells.dimensions();
        Mask::from_image(&self.cells, (width / 2) as u8, (height / 2) as u8)
    }
}

impl Default for StructuringElement {
    fn default() -> Self {
        Self::ellipse(5, 5)
    }
}

/// Morphological closing: dilation followed by erosion.
///
/// Element positions falling outside the image are ignored.
#[must_use]
pub fn close(mask: &GrayImage, element: &StructuringElement) -> GrayImage {
    grayscale_close(mask, &element.mask())
}

/// Bright-and-desaturated candidate mask (255 = candidate).
#[must_use]
pub fn candidate_mask(hsv: &HsvPlanes, config: &SpecularConfig) -> GrayImage {
    let (width, height) = hsv.value.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let bright = hsv.value.get_pixel(x, y).0[0] >= config.intensity_threshold;
        let desaturated = hsv.saturation.get_pixel(x, y).0[0] <= config.saturation_threshold;
        Luma([if bright && desaturated { FOREGROUND } else { 0 }])
    })
}

/// Keeps 8-connected regions of at least `min_region_size` pixels.
///
/// Returns the filtered mask and the number of surviving regions.
#[must_use]
pub fn filter_regions(mask: &GrayImage, min_region_size: u32) -> (GrayImage, usize) {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let label_count = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;

    let mut areas = vec![0u64; label_count + 1];
    for p in labels.pixels() {
        areas[p.0[0] as usize] += 1;
    }
    let keep: Vec<bool> = areas
        .iter()
        .enumerate()
        .map(|(label, &area)| label != 0 && area >= u64::from(min_region_size))
        .collect();
    let survivors = keep.iter().filter(|&&k| k).count();

    let (width, height) = mask.dimensions();
    let filtered = GrayImage::from_fn(width, height, |x, y| {
        let label = labels.get_pixel(x, y).0[0] as usize;
        Luma([if keep[label] { FOREGROUND } else { 0 }])
    });
    (filtered, survivors)
}

/// Intermediate products of a specular analysis.
#[derive(Debug, Clone)]
pub struct SpecularAnalysis {
    /// Final glare mask after closing and region filtering.
    pub mask: GrayImage,
    /// Number of regions that survived filtering.
    pub regions: usize,
    /// Foreground pixels in `mask`.
    pub specular_pixels: u64,
    /// `100 * specular_pixels / total_pixels`.
    pub score: f64,
}

impl SpecularAnalysis {
    /// Runs the full segmentation on `image`.
    ///
    /// # Errors
    ///
    /// Returns [`QaError::MetricComputation`] when the configuration is
    /// unusable or the image has no pixels.
    pub fn analyze(image: &ImageBuffer, config: &SpecularConfig) -> Result<Self, QaError> {
        if !config.sensitivity.is_finite() {
            return Err(QaError::metric(
                SpecularResult::NAME,
                format!("sensitivity must be finite, got {}", config.sensitivity),
            ));
        }
        let total = image.pixel_count();
        if total == 0 {
            return Err(QaError::metric(SpecularResult::NAME, "empty image"));
        }

        let hsv = HsvPlanes::from_buffer(image);
        let candidates = candidate_mask(&hsv, config);
        let refined = close(&candidates, &StructuringElement::default());
        let (mask, regions) = filter_regions(&refined, config.min_region_size);

        let specular_pixels = mask.pixels().filter(|p| p.0[0] != 0).count() as u64;
        let score = 100.0 * specular_pixels as f64 / total as f64;
        debug!(regions, specular_pixels, score, "Specular segmentation");

        Ok(Self {
            mask,
            regions,
            specular_pixels,
            score,
        })
    }
}

/// Scores glare coverage of `image` against `config.sensitivity`.
///
/// Any internal failure yields [`SpecularResult::invalid`].
#[must_use]
pub fn detect_specular_reflections(image: &ImageBuffer, config: &SpecularConfig) -> SpecularResult {
    match SpecularAnalysis::analyze(image, config) {
        Ok(analysis) => {
            let is_correct = analysis.score < config.sensitivity;
            if is_correct {
                info!(
                    score = analysis.score,
                    sensitivity = config.sensitivity,
                    "Specular reflections within threshold"
                );
            } else {
                warn!(
                    score = analysis.score,
                    sensitivity = config.sensitivity,
                    regions = analysis.regions,
                    "Specular reflections above threshold"
                );
            }
            SpecularResult {
                specular_score: Some(analysis.score),
                is_correct_specular_reflections: is_correct,
                is_valid: true,
            }
        }
        Err(e) => {
            warn!("Specular analysis failed: {e}");
            SpecularResult::invalid()
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn disc_image(size: u32, radius: f64, fg: [u8; 3], bg: [u8; 3]) -> (ImageBuffer, u64) {
        let c = f64::from(size) / 2.0;
        let mut inside = 0u64;
        let img = RgbImage::from_fn(size, size, |x, y| {
            let (dx, dy) = (f64::from(x) + 0.5 - c, f64::from(y) + 0.5 - c);
            if dx * dx + dy * dy <= radius * radius {
                inside += 1;
                Rgb(fg)
            } else {
                Rgb(bg)
            }
        });
        (ImageBuffer::from_rgb(img).expect("buffer"), inside)
    }

    #[test]
    fn test_default_config() {
        let config = SpecularConfig::default();
        assert_eq!(config.intensity_threshold, 240);
        assert_eq!(config.saturation_threshold, 50);
        assert_eq!(config.min_region_size, 200);
        assert_eq!(config.sensitivity, 1.5);
    }

    #[test]
    fn test_ellipse_5x5_shape() {
        let element = StructuringElement::ellipse(5, 5);
        let rows: Vec<String> = (0..5)
            .map(|r| {
                (0..5)
                    .map(|c| if element.contains(r, c) { '1' } else { '0' })
                    .collect()
            })
            .collect();
        assert_eq!(rows, ["00100", "11111", "11111", "11111", "00100"]);
    }

    #[test]
    fn test_hsv_of_reference_colors() {
        assert_eq!(hsv_from_rgb(255, 255, 255), (0, 0, 255));
        assert_eq!(hsv_from_rgb(0, 0, 0), (0, 0, 0));
        assert_eq!(hsv_from_rgb(255, 0, 0), (0, 255, 255));
        assert_eq!(hsv_from_rgb(0, 255, 0), (60, 255, 255));
        assert_eq!(hsv_from_rgb(0, 0, 255), (120, 255, 255));
        assert_eq!(hsv_from_rgb(128, 128, 128), (0, 0, 128));
    }

    #[test]
    fn test_uniform_background_scores_zero() {
        let img = RgbImage::from_pixel(100, 100, Rgb([120, 110, 100]));
        let buffer = ImageBuffer::from_rgb(img).expect("buffer");
        let result = detect_specular_reflections(&buffer, &SpecularConfig::default());

        assert!(result.is_valid);
        assert_eq!(result.specular_score, Some(0.0));
        assert!(result.is_correct_specular_reflections);
    }

    #[test]
    fn test_bright_disc_is_detected() {
        let (buffer, disc_pixels) = disc_image(200, 20.0, [250, 250, 250], [110, 110, 110]);
        let analysis =
            SpecularAnalysis::analyze(&buffer, &SpecularConfig::default()).expect("analysis");

        assert_eq!(analysis.regions, 1);
        let diff = analysis.specular_pixels.abs_diff(disc_pixels);
        assert!(
            diff * 20 <= disc_pixels,
            "mask {} should track disc {disc_pixels}",
            analysis.specular_pixels
        );

        let result = detect_specular_reflections(&buffer, &SpecularConfig::default());
        assert!(result.specular_score.expect("score") > 0.0);
        assert!(!result.is_correct_specular_reflections);
    }

    #[test]
    fn test_small_disc_is_filtered_out() {
        let (buffer, disc_pixels) = disc_image(200, 5.0, [255, 255, 255], [110, 110, 110]);
        assert!(disc_pixels < 200);

        let result = detect_specular_reflections(&buffer, &SpecularConfig::default());
        assert_eq!(result.specular_score, Some(0.0));
        assert!(result.is_correct_specular_reflections);
    }

    #[test]
    fn test_saturated_highlight_is_ignored() {
        let (buffer, _) = disc_image(200, 30.0, [255, 40, 40], [110, 110, 110]);
        let result = detect_specular_reflections(&buffer, &SpecularConfig::default());
        assert_eq!(result.specular_score, Some(0.0));
    }

    #[test]
    fn test_gray_buffer_glare_is_detected() {
        let img = GrayImage::from_fn(100, 100, |x, y| {
            if (30..60).contains(&x) && (30..60).contains(&y) {
                Luma([250])
            } else {
                Luma([100])
            }
        });
        let buffer = ImageBuffer::from_gray(img).expect("buffer");
        let result = detect_specular_reflections(&buffer, &SpecularConfig::default());
        assert_eq!(result.specular_score, Some(9.0));
    }

    #[test]
    fn test_closing_bridges_narrow_gap() {
        // Two 10x15 blocks split by a one-pixel column; each alone is under 200.
        let mask = GrayImage::from_fn(120, 100, |x, y| {
            let in_rows = (50..65).contains(&y);
            let left = (50..60).contains(&x);
            let right = (61..71).contains(&x);
            Luma([if in_rows && (left || right) { 255 } else { 0 }])
        });

        let (unclosed, regions) = filter_regions(&mask, 200);
        assert_eq!(regions, 0);
        assert!(unclosed.pixels().all(|p| p.0[0] == 0));

        let closed = close(&mask, &StructuringElement::default());
        let (filtered, regions) = filter_regions(&closed, 200);
        assert_eq!(regions, 1);
        assert!(filtered.pixels().filter(|p| p.0[0] != 0).count() >= 300);
    }

    #[test]
    fn test_closing_keeps_isolated_pixel_count_stable() {
        let mask = GrayImage::from_fn(20, 20, |x, y| Luma([if x == 10 && y == 10 { 255 } else { 0 }]));
        let closed = close(&mask, &StructuringElement::default());
        assert_eq!(closed.pixels().filter(|p| p.0[0] != 0).count(), 1);
    }

    #[test]
    fn test_closing_keeps_regions_on_the_border() {
        let mask = GrayImage::from_fn(30, 30, |x, y| Luma([if x < 10 && y < 10 { 255 } else { 0 }]));
        let closed = close(&mask, &StructuringElement::default());
        assert_eq!(closed, mask);
    }

    #[test]
    fn test_ellipse_degenerate_sizes() {
        let dot = StructuringElement::ellipse(1, 1);
        assert!(dot.contains(0, 0));
        assert!(!dot.contains(1, 0));

        let line = StructuringElement::ellipse(0, 3);
        assert!((0..3).all(|row| line.contains(row, 0)));
    }

    #[test]
    fn test_regions_use_eight_connectivity() {
        // Two 10x10 squares touching only at a corner form one 200-pixel region.
        let mask = GrayImage::from_fn(40, 40, |x, y| {
            let a = (5..15).contains(&x) && (5..15).contains(&y);
            let b = (15..25).contains(&x) && (15..25).contains(&y);
            Luma([if a || b { 255 } else { 0 }])
        });
        let (filtered, regions) = filter_regions(&mask, 200);
        assert_eq!(regions, 1);
        assert_eq!(filtered.pixels().filter(|p| p.0[0] != 0).count(), 200);
    }

    #[test]
    fn test_non_finite_sensitivity_yields_invalid() {
        let (buffer, _) = disc_image(50, 10.0, [255, 255, 255], [0, 0, 0]);
        let config = SpecularConfig {
            sensitivity: f64::INFINITY,
            ..SpecularConfig::default()
        };
        assert_eq!(
            detect_specular_reflections(&buffer, &config),
            SpecularResult::invalid()
        );
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let (buffer, _) = disc_image(120, 15.0, [250, 250, 245], [90, 100, 110]);
        let config = SpecularConfig::default();
        let first = detect_specular_reflections(&buffer, &config);
        let second = detect_specular_reflections(&buffer, &config);
        assert_eq!(
            first.specular_score.map(f64::to_bits),
            second.specular_score.map(f64::to_bits)
        );
    }
}
