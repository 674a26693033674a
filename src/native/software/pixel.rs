//! Per-pixel operations.
//!
//! Alpha is carried through unchanged by every operation except pixelate,
//! which averages it with the color channels.

use crate::native::PixelOp;
use image::RgbaImage;
use rayon::prelude::*;

const GS_RED: f32 = 0.2126;
const GS_GREEN: f32 = 0.7152;
const GS_BLUE: f32 = 0.0722;

pub(super) fn apply(op: PixelOp, source: &RgbaImage) -> RgbaImage {
    match op {
        PixelOp::Grayscale => map_pixels(source, |[r, g, b, a]| {
            let luma = (GS_RED * r as f32 + GS_GREEN * g as f32 + GS_BLUE * b as f32) as u8;
            [luma, luma, luma, a]
        }),
        PixelOp::Invert => map_pixels(source, |[r, g, b, a]| [255 - r, 255 - g, 255 - b, a]),
        PixelOp::Threshold { value } => {
            let cut = |c: u8| if c > value { 255 } else { 0 };
            map_pixels(source, |[r, g, b, a]| [cut(r), cut(g), cut(b), a])
        }
        PixelOp::HsvAdjust {
            hue,
            saturation,
            value,
        } => {
            let hue = if hue < 0.0 { hue + 360.0 } else { hue };
            map_pixels(source, |[r, g, b, a]| {
                let (h, s, v) = rgb_to_hsv(r, g, b);
                let h = (h + hue) % 360.0;
                let (r, g, b) = hsv_to_rgb(h, s * saturation, v * value);
                [clamp_u8(r * 255.0), clamp_u8(g * 255.0), clamp_u8(b * 255.0), a]
            })
        }
        PixelOp::LinearBrightness { multiplier } => {
            let scale = |c: u8| clamp_u8(multiplier * c as f32);
            map_pixels(source, |[r, g, b, a]| [scale(r), scale(g), scale(b), a])
        }
        PixelOp::Gamma { gamma } => {
            let lut = gamma_lut(gamma);
            map_pixels(source, |[r, g, b, a]| {
                [lut[r as usize], lut[g as usize], lut[b as usize], a]
            })
        }
        PixelOp::Pixelate { size } => pixelate(source, size.max(1) as u32),
        PixelOp::Bitcrush { bits } => {
            let bits = bits.min(7);
            let floor = 1u8 << bits;
            let fill = !(0xFFu8 << bits);
            let crush = |c: u8| {
                let c = (c >> bits) << bits;
                if c >= floor {
                    c | fill
                } else {
                    c
                }
            };
            map_pixels(source, |[r, g, b, a]| [crush(r), crush(g), crush(b), a])
        }
        PixelOp::Noise { noise, color, seed } => add_noise(source, noise, color, seed),
    }
}

pub(super) fn clamp_u8(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

fn map_pixels<F>(source: &RgbaImage, f: F) -> RgbaImage
where
    F: Fn([u8; 4]) -> [u8; 4] + Sync,
{
    let mut output = source.clone();
    let bytes: &mut [u8] = &mut output;
    bytes.par_chunks_exact_mut(4).for_each(|px| {
        let mapped = f([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&mapped);
    });
    output
}

fn gamma_lut(gamma: f32) -> [u8; 256] {
    let inverse = 1.0 / gamma;
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = clamp_u8((i as f32 / 255.0).powf(inverse) * 255.0 + 0.5);
    }
    lut
}

/// Convert RGB bytes to (hue in degrees, saturation 0..1, value 0..1).
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    if max <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let s = delta / max;
    if delta < 1e-5 {
        return (0.0, s, max);
    }

    let h = if r >= max {
        (g - b) / delta
    } else if g >= max {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    let h = h * 60.0;
    let h = if h < 0.0 { h + 360.0 } else { h };
    (h, s, max)
}

/// Convert (hue in degrees, saturation, value) back to RGB fractions.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let sector = (if h >= 360.0 { 0.0 } else { h }) / 60.0;
    let i = sector.floor();
    let ff = sector - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * ff);
    let t = v * (1.0 - s * (1.0 - ff));

    match i as u32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

fn pixelate(source: &RgbaImage, size: u32) -> RgbaImage {
    let (width, height) = source.dimensions();
    let mut output = RgbaImage::new(width, height);

    for block_y in (0..height).step_by(size as usize) {
        for block_x in (0..width).step_by(size as usize) {
            let end_x = (block_x + size).min(width);
            let end_y = (block_y + size).min(height);
            let count = (end_x - block_x) * (end_y - block_y);

            let mut sum = [0u32; 4];
            for y in block_y..end_y {
                for x in block_x..end_x {
                    for (total, channel) in sum.iter_mut().zip(source.get_pixel(x, y).0) {
                        *total += channel as u32;
                    }
                }
            }
            let average = image::Rgba(sum.map(|total| (total / count) as u8));

            for y in block_y..end_y {
                for x in block_x..end_x {
                    output.put_pixel(x, y, average);
                }
            }
        }
    }
    output
}

const MINSTD_MODULUS: u64 = 2_147_483_647;

/// MINSTD linear congruential generator.
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u32) -> Self {
        // State must stay in 1..MODULUS; zero is a fixed point.
        Self {
            state: seed as u64 % (MINSTD_MODULUS - 1) + 1,
        }
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state * 48271 % MINSTD_MODULUS;
        self.state as u32
    }
}

fn add_noise(source: &RgbaImage, noise: u8, color: bool, seed: u32) -> RgbaImage {
    let mut rng = SimpleRng::new(seed);
    let amplitude = noise.max(1) as u32;
    let offset = (amplitude / 2) as i32;
    let mut next = move || (rng.next_u32() % amplitude) as i32 - offset;
    let shift = |c: u8, n: i32| (c as i32 + n).clamp(0, 255) as u8;

    let mut output = source.clone();
    for px in output.pixels_mut() {
        let [r, g, b, a] = px.0;
        px.0 = if color {
            [shift(r, next()), shift(g, next()), shift(b, next()), a]
        } else {
            let n = next();
            [shift(r, n), shift(g, n), shift(b, n), a]
        };
    }
    output
}
