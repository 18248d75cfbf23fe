//! Contour overlay stage: threshold, trace region boundaries, and stroke them
//! onto a color copy of the source.

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::{
    contours::{Contour, find_contours},
    drawing::{BresenhamLineIter, draw_filled_circle_mut, draw_line_segment_mut},
};
use num::{Num, NumCast};
use num_traits::AsPrimitive;
use serde::Deserialize;
use tracing::debug;

use crate::colors::generate_stroke_colors;
use crate::error::{Result, ViewerError};
use crate::threshold::{ThresholdParams, apply_threshold};

/// How strokes are colored when several contours are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrokeColoring {
    /// Every contour uses the style's color.
    #[default]
    Uniform,
    /// One hue per contour, longest perimeter first.
    Distinct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContourStyle {
    pub color: Rgb<u8>,
    /// Stroke width in pixels.
    pub width: u32,
    pub coloring: StrokeColoring,
}

impl Default for ContourStyle {
    fn default() -> Self {
        Self {
            color: Rgb([0, 255, 0]),
            width: 3,
            coloring: StrokeColoring::Uniform,
        }
    }
}

/// Calculates the perimeter of each contour and sorts them in descending order.
///
/// The perimeter is the sum of Euclidean distances between consecutive points,
/// closing the loop from the last point back to the first. Contours with 0 or 1
/// point have a perimeter of `0.0`. Takes ownership so contours are moved, not
/// cloned, into the result.
pub fn sort_by_perimeters_owned<T>(contours: Vec<Contour<T>>) -> Vec<(Contour<T>, f64)>
where
    T: Num + NumCast + Copy + PartialEq + Eq + AsPrimitive<f64>,
{
    let mut contours_with_perimeters: Vec<(Contour<T>, f64)> = contours
        .into_iter()
        .map(|contour| {
            let perimeter: f64 = contour
                .points
                .iter()
                .zip(contour.points.iter().cycle().skip(1))
                .map(|(p1, p2)| {
                    let dx: f64 = p2.x.as_() - p1.x.as_();
                    let dy: f64 = p2.y.as_() - p1.y.as_();
                    dx.hypot(dy)
                })
                .sum();
            (contour, perimeter)
        })
        .collect();

    contours_with_perimeters.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));

    contours_with_perimeters
}

/// Traces every foreground/background boundary in a binary mask.
///
/// The list is flat: nesting is discarded and `parent` is always `None`. Every
/// border pixel is kept as a vertex.
pub fn find_overlay_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(mask)
        .into_iter()
        .map(|mut contour| {
            contour.parent = None;
            contour
        })
        .collect()
}

fn stroke_contour(canvas: &mut RgbImage, contour: &Contour<i32>, color: Rgb<u8>, width: u32) {
    let radius = (width / 2) as i32;
    for (p1, p2) in contour
        .points
        .iter()
        .zip(contour.points.iter().cycle().skip(1))
    {
        let start = (p1.x as f32, p1.y as f32);
        let end = (p2.x as f32, p2.y as f32);
        if radius == 0 {
            draw_line_segment_mut(canvas, start, end, color);
        } else {
            for center in BresenhamLineIter::new(start, end) {
                draw_filled_circle_mut(canvas, center, radius, color);
            }
        }
    }
}

/// Strokes each contour onto `canvas` in place.
pub fn draw_contours_mut(canvas: &mut RgbImage, contours: &[Contour<i32>], style: &ContourStyle) {
    let palette = match style.coloring {
        StrokeColoring::Uniform => vec![style.color; contours.len()],
        StrokeColoring::Distinct => generate_stroke_colors(contours.len()),
    };
    for (contour, color) in contours.iter().zip(palette) {
        stroke_contour(canvas, contour, color, style.width);
    }
}

/// Draws contours onto `image`, which must already be three-channel.
pub fn overlay_onto(
    image: DynamicImage,
    contours: &[Contour<i32>],
    style: &ContourStyle,
) -> Result<RgbImage> {
    let mut canvas = match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other if other.color().channel_count() == 3 => other.to_rgb8(),
        other => {
            return Err(ViewerError::ChannelMismatch {
                channels: other.color().channel_count(),
            });
        }
    };
    draw_contours_mut(&mut canvas, contours, style);
    Ok(canvas)
}

/// Runs the full contour stage.
///
/// The mask always comes from the threshold stage, whatever the threshold
/// overlay's own toggle state. Strokes land on a color copy of `buffer`, so the
/// result is three-channel for any input.
pub fn apply_contours(
    buffer: &DynamicImage,
    threshold: &ThresholdParams,
    style: &ContourStyle,
) -> Result<RgbImage> {
    let mask = apply_threshold(buffer, threshold);
    let ranked = sort_by_perimeters_owned(find_overlay_contours(&mask));
    let longest_perimeter = ranked.first().map_or(0.0, |(_, perimeter)| *perimeter);
    let contours: Vec<Contour<i32>> = ranked.into_iter().map(|(contour, _)| contour).collect();
    debug!(count = contours.len(), longest_perimeter, "contours extracted");

    let canvas = DynamicImage::ImageRgb8(buffer.to_rgb8());
    overlay_onto(canvas, &contours, style)
}
