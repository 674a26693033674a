//! Square-kernel convolution with clamp-to-edge sampling.

use super::pixel::clamp_u8;
use super::Kernel;
use image::RgbaImage;
use rayon::prelude::*;

/// Convolve the color channels of `source`. Alpha is copied from the source pixel.
pub(super) fn apply(source: &RgbaImage, kernel: &Kernel) -> RgbaImage {
    let (width, height) = source.dimensions();
    let size = kernel.size as i64;
    let offset = -(size / 2);
    let src = source.as_raw();
    let row_bytes = width as usize * 4;

    let mut data = vec![0u8; src.len()];
    data.par_chunks_exact_mut(row_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width as i64 {
                // 255x255 cells of i32::MAX * 255 still fit in i64.
                let mut sum = [0i64; 3];
                for ky in 0..size {
                    let sy = (y as i64 + ky + offset).clamp(0, height as i64 - 1) as usize;
                    for kx in 0..size {
                        let sx = (x + kx + offset).clamp(0, width as i64 - 1) as usize;
                        let weight = kernel.weights[(kx + ky * size) as usize] as i64;
                        let at = (sy * width as usize + sx) * 4;
                        for (channel, total) in sum.iter_mut().enumerate() {
                            *total += weight * src[at + channel] as i64;
                        }
                    }
                }

                let out = x as usize * 4;
                for (channel, total) in sum.into_iter().enumerate() {
                    row[out + channel] = if kernel.multiplier == 1.0 {
                        total.clamp(0, 255) as u8
                    } else {
                        clamp_u8((total as f64 * kernel.multiplier as f64) as f32)
                    };
                }
                row[out + 3] = src[y * row_bytes + out + 3];
            }
        });

    // Rows are exact multiples of the image width, so this cannot fail.
    RgbaImage::from_raw(width, height, data).unwrap_or_else(|| RgbaImage::new(width, height))
}
