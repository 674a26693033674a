use super::pixel::clamp_u8;
use crate::core::types::{HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH};
use image::{Rgba, RgbaImage};

const SCALE_TARGET: u32 = 25_600;

/// Render per-channel value counts as stacked columns, one column per value.
///
/// Column `x` is filled bottom-up with the scaled count of value `x`,
/// 256 units per row, so each channel saturates row by row.
pub(super) fn render(source: &RgbaImage) -> RgbaImage {
    let mut counts = [[0u32; 256]; 3];
    for px in source.pixels() {
        for (channel, bins) in counts.iter_mut().enumerate() {
            bins[px.0[channel] as usize] += 1;
        }
    }

    let mut max = counts.iter().flatten().copied().max().unwrap_or(0);
    if max < SCALE_TARGET {
        max *= 100;
        counts.iter_mut().flatten().for_each(|count| *count *= 100);
    }
    let mut divisor = max / SCALE_TARGET;
    if divisor < 10 {
        divisor += 1;
    }

    let mut output = RgbaImage::new(HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT);
    for x in 0..HISTOGRAM_WIDTH {
        let mut levels = counts.map(|bins| (bins[x as usize] / divisor) as i64);
        for row in 0..HISTOGRAM_HEIGHT {
            let [r, g, b] = levels.map(|level| clamp_u8(level as f32));
            output.put_pixel(x, HISTOGRAM_HEIGHT - 1 - row, Rgba([r, g, b, 255]));
            levels.iter_mut().for_each(|level| *level -= 256);
        }
    }
    output
}
