//! Block-variance quality scorer.
//!
//! Splits the grayscale image into square blocks and averages the standard
//! deviation of each block, in 0-255 units. Edge blocks may be smaller than
//! the nominal size. Lower scores indicate flatter, cleaner images.

#![allow(clippy::cast_precision_loss)]

use anyhow::{ensure, Context, Result};
use candle_core::Tensor;

use crate::modules::AdvancedConfig;
use crate::ports::QualityModel;

/// Built-in [`QualityModel`] based on mean per-block standard deviation.
///
/// The block edge length comes from [`AdvancedConfig::block_size`] on every
/// call, clamped to at least 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockVarianceModel;

impl BlockVarianceModel {
    fn gray_plane(input: &Tensor) -> Result<Vec<Vec<f64>>> {
        let planes = input
            .squeeze(0)
            .and_then(|t| t.to_vec3::<f32>())
            .context("Expected a (1, 3, H, W) f32 tensor")?;
        ensure!(planes.len() == 3, "expected 3 channels, got {}", planes.len());

        let gray = planes[0]
            .iter()
            .zip(&planes[1])
            .zip(&planes[2])
            .map(|((r, g), b)| {
                r.iter()
                    .zip(g)
                    .zip(b)
                    .map(|((&r, &g), &b)| {
                        255.0 * (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b))
                    })
                    .collect()
            })
            .collect();
        Ok(gray)
    }
}

impl QualityModel for BlockVarianceModel {
    fn name(&self) -> &str {
        "block-variance"
    }

    fn score(&self, input: &Tensor, config: &AdvancedConfig) -> Result<f64> {
        let block_size = config.block_size.max(1);
        let gray = Self::gray_plane(input)?;
        let height = gray.len();
        let width = gray.first().map_or(0, Vec::len);
        ensure!(width > 0 && height > 0, "empty image");

        let mut total = 0.0;
        let mut blocks = 0usize;
        for y0 in (0..height).step_by(block_size) {
            for x0 in (0..width).step_by(block_size) {
                let rows = &gray[y0..(y0 + block_size).min(height)];
                let x1 = (x0 + block_size).min(width);
                let values = rows.iter().flat_map(|row| &row[x0..x1]);

                let n = ((x1 - x0) * rows.len()) as f64;
                let mean = values.clone().sum::<f64>() / n;
                let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                total += variance.sqrt();
                blocks += 1;
            }
        }

        Ok(total / blocks as f64)
    }
}
