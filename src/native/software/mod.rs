//! In-process reference engine.
//!
//! Allocations live in a slot table keyed by handle. Images are stored as
//! [`image::RgbaImage`]; operations build a fresh output image and replace
//! the destination slot, so `src == dst` needs no special casing.

mod convolve;
mod histogram;
mod pixel;

use crate::core::types::{HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH};
use crate::native::{PixelEngine, PixelOp, RawHandle, NULL_HANDLE};
use image::RgbaImage;
use std::collections::HashMap;

/// Largest image side the engine addresses (16-bit dimensions).
pub const MAX_IMAGE_SIDE: u32 = u16::MAX as u32;

/// Largest kernel side the engine addresses (8-bit size).
pub const MAX_KERNEL_SIDE: u32 = u8::MAX as u32;

/// Kernel weights as stored in engine memory.
#[derive(Debug, Clone)]
struct Kernel {
    size: u32,
    multiplier: f32,
    weights: Vec<i32>,
}

#[derive(Debug)]
enum Allocation {
    Image(RgbaImage),
    Kernel(Kernel),
}

/// Software implementation of [`PixelEngine`].
#[derive(Debug, Default)]
pub struct SoftwareEngine {
    slots: HashMap<RawHandle, Allocation>,
    last_handle: RawHandle,
}

impl SoftwareEngine {
    /// Create an engine with an empty memory space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocations currently held.
    pub fn allocation_count(&self) -> usize {
        self.slots.len()
    }

    fn insert(&mut self, allocation: Allocation) -> RawHandle {
        loop {
            self.last_handle = self.last_handle.wrapping_add(1);
            if self.last_handle != NULL_HANDLE && !self.slots.contains_key(&self.last_handle) {
                break;
            }
        }
        self.slots.insert(self.last_handle, allocation);
        self.last_handle
    }

    fn image(&self, handle: RawHandle) -> Option<&RgbaImage> {
        match self.slots.get(&handle) {
            Some(Allocation::Image(image)) => Some(image),
            _ => None,
        }
    }

    fn kernel(&self, handle: RawHandle) -> Option<&Kernel> {
        match self.slots.get(&handle) {
            Some(Allocation::Kernel(kernel)) => Some(kernel),
            _ => None,
        }
    }

    /// Source image, provided `dst` is an image of the same size.
    fn matching_source(&self, src: RawHandle, dst: RawHandle) -> Option<&RgbaImage> {
        let source = self.image(src)?;
        let target = self.image(dst)?;
        (source.dimensions() == target.dimensions()).then_some(source)
    }

    fn replace_image(&mut self, handle: RawHandle, image: RgbaImage) {
        self.slots.insert(handle, Allocation::Image(image));
    }
}

impl PixelEngine for SoftwareEngine {
    fn allocate_image(&mut self, width: u32, height: u32) -> RawHandle {
        if !(1..=MAX_IMAGE_SIDE).contains(&width) || !(1..=MAX_IMAGE_SIDE).contains(&height) {
            return NULL_HANDLE;
        }
        let handle = self.insert(Allocation::Image(RgbaImage::new(width, height)));
        log::trace!("[img_alloc] {width}x{height} -> {handle}");
        handle
    }

    fn allocate_kernel(&mut self, size: u32) -> RawHandle {
        // Kernels need a center cell.
        if size == 0 || size % 2 == 0 || size > MAX_KERNEL_SIDE {
            return NULL_HANDLE;
        }
        let cells = (size * size) as usize;
        let handle = self.insert(Allocation::Kernel(Kernel {
            size,
            multiplier: 1.0,
            weights: vec![0; cells],
        }));
        log::trace!("[krn_alloc] {size}x{size} -> {handle}");
        handle
    }

    fn free(&mut self, handle: RawHandle) {
        if self.slots.remove(&handle).is_some() {
            log::trace!("[f_free] {handle}");
        }
    }

    fn write_pixels(&mut self, image: RawHandle, data: &[u8]) -> bool {
        match self.slots.get_mut(&image) {
            Some(Allocation::Image(target)) if target.len() == data.len() => {
                target.copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    fn read_pixels(&self, image: RawHandle, out: &mut [u8]) -> bool {
        match self.image(image) {
            Some(source) if source.len() == out.len() => {
                out.copy_from_slice(source.as_raw());
                true
            }
            _ => false,
        }
    }

    fn load_kernel(&mut self, kernel: RawHandle, multiplier: f32, weights: &[i32]) -> bool {
        match self.slots.get_mut(&kernel) {
            Some(Allocation::Kernel(target)) if target.weights.len() == weights.len() => {
                target.multiplier = multiplier;
                target.weights.copy_from_slice(weights);
                true
            }
            _ => false,
        }
    }

    fn apply(&mut self, op: PixelOp, src: RawHandle, dst: RawHandle) -> bool {
        let Some(source) = self.matching_source(src, dst) else {
            return false;
        };
        let output = pixel::apply(op, source);
        self.replace_image(dst, output);
        true
    }

    fn convolve(&mut self, src: RawHandle, dst: RawHandle, kernel: RawHandle) -> bool {
        if src == dst {
            return false;
        }
        let (Some(source), Some(kernel)) = (self.matching_source(src, dst), self.kernel(kernel))
        else {
            return false;
        };
        let output = convolve::apply(source, kernel);
        self.replace_image(dst, output);
        true
    }

    fn histogram(&mut self, src: RawHandle, dst: RawHandle) -> bool {
        if src == dst {
            return false;
        }
        let (Some(source), Some(target)) = (self.image(src), self.image(dst)) else {
            return false;
        };
        if target.dimensions() != (HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT) {
            return false;
        }
        let output = histogram::render(source);
        self.replace_image(dst, output);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(engine: &mut SoftwareEngine, width: u32, height: u32, rgba: [u8; 4]) -> RawHandle {
        let handle = engine.allocate_image(width, height);
        let data: Vec<u8> = rgba.iter().copied().cycle().take((width * height * 4) as usize).collect();
        assert!(engine.write_pixels(handle, &data));
        handle
    }

    fn read(engine: &SoftwareEngine, handle: RawHandle, len: usize) -> Vec<u8> {
        let mut out = vec![0; len];
        assert!(engine.read_pixels(handle, &mut out));
        out
    }

    #[test]
    fn test_allocation_limits() {
        let mut engine = SoftwareEngine::new();
        assert_eq!(engine.allocate_image(0, 10), NULL_HANDLE);
        assert_eq!(engine.allocate_image(MAX_IMAGE_SIDE + 1, 1), NULL_HANDLE);
        assert_eq!(engine.allocate_kernel(4), NULL_HANDLE);
        assert_eq!(engine.allocate_kernel(0), NULL_HANDLE);
        assert_ne!(engine.allocate_kernel(3), NULL_HANDLE);
        assert_ne!(engine.allocate_image(2, 2), NULL_HANDLE);
        assert_eq!(engine.allocation_count(), 2);
    }

    #[test]
    fn test_handles_are_unique_and_freed() {
        let mut engine = SoftwareEngine::new();
        let a = engine.allocate_image(1, 1);
        let b = engine.allocate_image(1, 1);
        assert_ne!(a, b);

        engine.free(a);
        engine.free(b);
        assert_eq!(engine.allocation_count(), 0);
    }

    #[test]
    fn test_transfer_rejects_wrong_length() {
        let mut engine = SoftwareEngine::new();
        let image = engine.allocate_image(2, 2);
        assert!(!engine.write_pixels(image, &[0; 15]));
        assert!(!engine.read_pixels(image, &mut [0; 17]));

        let kernel = engine.allocate_kernel(3);
        assert!(!engine.write_pixels(kernel, &[0; 36]));
        assert!(!engine.load_kernel(kernel, 1.0, &[1; 8]));
        assert!(engine.load_kernel(kernel, 1.0, &[1; 9]));
    }

    #[test]
    fn test_in_place_apply() {
        let mut engine = SoftwareEngine::new();
        let image = loaded(&mut engine, 1, 1, [10, 20, 30, 255]);
        assert!(engine.apply(PixelOp::Invert, image, image));
        assert_eq!(read(&engine, image, 4), vec![245, 235, 225, 255]);
    }

    #[test]
    fn test_apply_requires_matching_sizes() {
        let mut engine = SoftwareEngine::new();
        let a = engine.allocate_image(2, 2);
        let b = engine.allocate_image(3, 2);
        assert!(!engine.apply(PixelOp::Grayscale, a, b));
    }

    #[test]
    fn test_convolve_rejects_aliasing() {
        let mut engine = SoftwareEngine::new();
        let a = engine.allocate_image(2, 2);
        let kernel = engine.allocate_kernel(1);
        let missing = engine.last_handle + 7;
        assert!(!engine.convolve(a, a, kernel));
        assert!(!engine.convolve(a, missing, kernel));
    }

    #[test]
    fn test_histogram_target_size() {
        let mut engine = SoftwareEngine::new();
        let source = loaded(&mut engine, 4, 4, [0, 0, 0, 255]);
        let wrong = engine.allocate_image(128, 100);
        assert!(!engine.histogram(source, wrong));

        let target = engine.allocate_image(HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT);
        assert!(engine.histogram(source, target));
    }
}
