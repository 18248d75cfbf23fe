//! Adaptive thresholding: grayscale, median blur, then binarization against a
//! local neighbourhood statistic.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{box_filter, median_filter, separable_filter_equal};
use serde::Deserialize;

use crate::error::{Result, ViewerError};

/// Level written for foreground pixels.
pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Neighbourhood statistic the threshold is taken relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalStatistic {
    Mean,
    /// Gaussian-weighted mean.
    #[default]
    Gaussian,
}

/// Which side of the local threshold becomes foreground.
///
/// `Inverted`: a pixel is foreground iff `pixel <= local - bias`, so dark
/// features on a lighter surround light up. `Normal` swaps the two levels.
/// With `bias <= 0` a flat region meets the `Inverted` condition and comes out
/// entirely foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Polarity {
    #[default]
    Inverted,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ThresholdParams {
    /// Odd median kernel width.
    pub median_kernel: u32,
    /// Odd neighbourhood width for the local statistic.
    pub block_size: u32,
    /// Constant subtracted from the local statistic.
    pub bias: i32,
    pub statistic: LocalStatistic,
    pub polarity: Polarity,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            median_kernel: 17,
            block_size: 5,
            bias: 1,
            statistic: LocalStatistic::Gaussian,
            polarity: Polarity::Inverted,
        }
    }
}

impl ThresholdParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("median-kernel", self.median_kernel),
            ("block-size", self.block_size),
        ] {
            if value < 3 || value % 2 == 0 {
                return Err(ViewerError::InvalidConfig(format!(
                    "{name} must be an odd number >= 3, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Sigma matching a Gaussian kernel of `block_size` taps.
    fn gaussian_sigma(&self) -> f32 {
        0.3 * ((self.block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }

    /// Normalized 1-D Gaussian with exactly `block_size` taps.
    fn gaussian_kernel(&self) -> Vec<f32> {
        let sigma = self.gaussian_sigma();
        let center = (self.block_size as f32 - 1.0) * 0.5;
        let weights: Vec<f32> = (0..self.block_size)
            .map(|i| {
                let d = i as f32 - center;
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let total: f32 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }
}

/// Runs the full threshold stage. The result is a two-level single-channel
/// mask with the input's dimensions.
pub fn apply_threshold(buffer: &DynamicImage, params: &ThresholdParams) -> GrayImage {
    let gray = buffer.to_luma8();
    let radius = params.median_kernel / 2;
    let blurred = median_filter(&gray, radius, radius);
    adaptive_binarize(&blurred, params)
}

/// Binarizes `image` against its local statistic, without any pre-filtering.
pub fn adaptive_binarize(image: &GrayImage, params: &ThresholdParams) -> GrayImage {
    let local = match params.statistic {
        LocalStatistic::Mean => {
            let radius = params.block_size / 2;
            box_filter(image, radius, radius)
        }
        LocalStatistic::Gaussian => separable_filter_equal(image, &params.gaussian_kernel()),
    };

    let (on, off) = match params.polarity {
        Polarity::Inverted => (FOREGROUND, BACKGROUND),
        Polarity::Normal => (BACKGROUND, FOREGROUND),
    };

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = i32::from(image.get_pixel(x, y)[0]);
        let threshold = i32::from(local.get_pixel(x, y)[0]) - params.bias;
        Luma([if pixel <= threshold { on } else { off }])
    })
}
