use image::Rgb;
use palette::{FromColor, Hsl, Srgb};

/// Generates `n` visually distinct stroke colors spread evenly around the hue wheel.
pub(crate) fn generate_stroke_colors(n: usize) -> Vec<Rgb<u8>> {
    (0..n)
        .map(|i| {
            let hue = (i as f32 * 360.0) / n as f32;
            let hsl_color = Hsl::new(hue, 0.9, 0.5);
            let srgb_linear = Srgb::from_color(hsl_color);
            let srgb: Srgb<u8> = srgb_linear.into_format();
            Rgb([srgb.red, srgb.green, srgb.blue])
        })
        .collect()
}
