//! Safe ownership of engine allocations.
//!
//! [`ResourceManager`] is the only holder of raw engine handles. It hands out
//! [`ImageHandle`] and [`KernelHandle`] values which are move-only, carry a
//! validity flag, and release their allocation exactly once: either through
//! an explicit `free` (which reports a double free) or when dropped.

use crate::core::error::{HandleKind, ResourceError, ResourceResult};
use crate::core::types::{PixelBuffer, HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH};
use crate::filters::kernels::KernelDescriptor;
use crate::native::{PixelEngine, PixelOp, RawHandle};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::num::NonZeroU32;

/// Owner of the engine and bookkeeping for outstanding handles.
pub struct ResourceManager<E: PixelEngine> {
    engine: RefCell<E>,
    live: Cell<usize>,
}

impl<E: PixelEngine> ResourceManager<E> {
    /// Take ownership of an engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine: RefCell::new(engine),
            live: Cell::new(0),
        }
    }

    /// Number of handles allocated and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.get()
    }

    /// Borrow the engine, e.g. to inspect its state between runs.
    pub fn engine(&self) -> std::cell::Ref<'_, E> {
        self.engine.borrow()
    }

    /// Give the engine back.
    pub fn into_engine(self) -> E {
        self.engine.into_inner()
    }

    /// Allocate an uninitialised `width x height` image.
    pub fn allocate_image(&self, width: u32, height: u32) -> ResourceResult<ImageHandle<'_, E>> {
        let raw = self.engine.borrow_mut().allocate_image(width, height);
        let raw = NonZeroU32::new(raw).ok_or_else(|| ResourceError::Allocation {
            kind: HandleKind::Image,
            detail: format!("{width}x{height}"),
        })?;
        self.live.set(self.live.get() + 1);
        Ok(ImageHandle {
            manager: self,
            raw,
            width,
            height,
            valid: true,
        })
    }

    /// Allocate an image shaped like `buffer` and import its pixels.
    pub fn load_image(&self, buffer: &PixelBuffer) -> ResourceResult<ImageHandle<'_, E>> {
        let image = self.allocate_image(buffer.width, buffer.height)?;
        image.import_pixels(buffer)?;
        Ok(image)
    }

    /// Allocate an empty `size x size` kernel.
    pub fn allocate_kernel(&self, size: u32) -> ResourceResult<KernelHandle<'_, E>> {
        let raw = self.engine.borrow_mut().allocate_kernel(size);
        let raw = NonZeroU32::new(raw).ok_or_else(|| ResourceError::Allocation {
            kind: HandleKind::Kernel,
            detail: format!("{size}x{size}"),
        })?;
        self.live.set(self.live.get() + 1);
        Ok(KernelHandle {
            manager: self,
            raw,
            size,
            valid: true,
        })
    }

    /// Allocate a kernel and load a descriptor into it.
    pub fn create_kernel(&self, descriptor: &KernelDescriptor) -> ResourceResult<KernelHandle<'_, E>> {
        log::trace!("{descriptor}");
        debug_assert!(descriptor.is_square(), "kernel matrix must be {0}x{0}", descriptor.size);
        let kernel = self.allocate_kernel(descriptor.size)?;
        kernel.load(descriptor.multiplier, &descriptor.matrix)?;
        Ok(kernel)
    }

    /// Run a per-pixel operation. `src` and `dst` may be the same handle.
    pub fn apply(&self, op: PixelOp, src: &ImageHandle<'_, E>, dst: &ImageHandle<'_, E>) -> ResourceResult<()> {
        src.ensure_valid()?;
        dst.ensure_valid()?;
        src.ensure_same_size(dst)?;
        let ok = self.engine.borrow_mut().apply(op, src.raw(), dst.raw());
        succeeded(ok, op.name())
    }

    /// Convolve `src` into `dst`, which must be a different image of the same size.
    pub fn convolve(
        &self,
        src: &ImageHandle<'_, E>,
        dst: &ImageHandle<'_, E>,
        kernel: &KernelHandle<'_, E>,
    ) -> ResourceResult<()> {
        src.ensure_valid()?;
        dst.ensure_valid()?;
        kernel.ensure_valid()?;
        src.ensure_same_size(dst)?;
        if src.raw == dst.raw {
            return Err(ResourceError::OperationFailed {
                operation: "convolve (in place)",
            });
        }
        let ok = self.engine.borrow_mut().convolve(src.raw(), dst.raw(), kernel.raw());
        succeeded(ok, "convolve")
    }

    /// Render the histogram of `src` into `dst`, which must be 256x100.
    pub fn histogram(&self, src: &ImageHandle<'_, E>, dst: &ImageHandle<'_, E>) -> ResourceResult<()> {
        src.ensure_valid()?;
        dst.ensure_valid()?;
        if (dst.width, dst.height) != (HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT) {
            return Err(ResourceError::DimensionMismatch {
                expected_width: HISTOGRAM_WIDTH,
                expected_height: HISTOGRAM_HEIGHT,
                width: dst.width,
                height: dst.height,
            });
        }
        let ok = self.engine.borrow_mut().histogram(src.raw(), dst.raw());
        succeeded(ok, "histogram")
    }

    fn release(&self, raw: RawHandle) {
        self.engine.borrow_mut().free(raw);
        self.live.set(self.live.get().saturating_sub(1));
    }

    /// Release from a destructor. Never panics, even if the engine is borrowed.
    fn release_on_drop(&self, raw: RawHandle, kind: HandleKind) {
        match self.engine.try_borrow_mut() {
            Ok(mut engine) => {
                engine.free(raw);
                self.live.set(self.live.get().saturating_sub(1));
                log::warn!("Released {kind} handle {raw} on drop");
            }
            Err(_) => log::error!("Leaked {kind} handle {raw}: engine busy during drop"),
        }
    }
}

impl<E: PixelEngine> fmt::Debug for ResourceManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("live", &self.live.get())
            .finish_non_exhaustive()
    }
}

fn succeeded(ok: bool, operation: &'static str) -> ResourceResult<()> {
    if ok {
        Ok(())
    } else {
        Err(ResourceError::OperationFailed { operation })
    }
}

/// An RGBA image living in engine memory.
pub struct ImageHandle<'m, E: PixelEngine> {
    manager: &'m ResourceManager<E>,
    raw: NonZeroU32,
    width: u32,
    height: u32,
    valid: bool,
}

impl<'m, E: PixelEngine> ImageHandle<'m, E> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the handle still owns its allocation.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    fn raw(&self) -> RawHandle {
        self.raw.get()
    }

    fn ensure_valid(&self) -> ResourceResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(ResourceError::UseAfterFree(HandleKind::Image))
        }
    }

    fn ensure_dimensions(&self, width: u32, height: u32) -> ResourceResult<()> {
        if (width, height) == (self.width, self.height) {
            Ok(())
        } else {
            Err(ResourceError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width,
                height,
            })
        }
    }

    fn ensure_same_size(&self, other: &ImageHandle<'_, E>) -> ResourceResult<()> {
        self.ensure_dimensions(other.width, other.height)
    }

    /// Copy a caller buffer into the image.
    pub fn import_pixels(&self, buffer: &PixelBuffer) -> ResourceResult<()> {
        self.ensure_valid()?;
        self.ensure_dimensions(buffer.width, buffer.height)?;
        let ok = self.manager.engine.borrow_mut().write_pixels(self.raw(), &buffer.data);
        succeeded(ok, "import pixels")
    }

    /// Copy the image into a caller buffer of the same size.
    pub fn export_pixels(&self, buffer: &mut PixelBuffer) -> ResourceResult<()> {
        self.ensure_valid()?;
        self.ensure_dimensions(buffer.width, buffer.height)?;
        let ok = self.manager.engine.borrow().read_pixels(self.raw(), &mut buffer.data);
        succeeded(ok, "export pixels")
    }

    /// Release the allocation. A second call is a [`ResourceError::DoubleFree`].
    pub fn free(&mut self) -> ResourceResult<()> {
        if !self.valid {
            return Err(ResourceError::DoubleFree(HandleKind::Image));
        }
        self.valid = false;
        self.manager.release(self.raw());
        Ok(())
    }
}

impl<E: PixelEngine> Drop for ImageHandle<'_, E> {
    fn drop(&mut self) {
        if self.valid {
            self.valid = false;
            self.manager.release_on_drop(self.raw(), HandleKind::Image);
        }
    }
}

impl<E: PixelEngine> fmt::Debug for ImageHandle<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("raw", &self.raw)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("valid", &self.valid)
            .finish()
    }
}

/// A square convolution kernel living in engine memory.
pub struct KernelHandle<'m, E: PixelEngine> {
    manager: &'m ResourceManager<E>,
    raw: NonZeroU32,
    size: u32,
    valid: bool,
}

impl<'m, E: PixelEngine> KernelHandle<'m, E> {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    fn raw(&self) -> RawHandle {
        self.raw.get()
    }

    fn ensure_valid(&self) -> ResourceResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(ResourceError::UseAfterFree(HandleKind::Kernel))
        }
    }

    /// Load a multiplier and a `size x size` matrix.
    ///
    /// Weights are truncated toward zero; the engine only stores integers.
    pub fn load(&self, multiplier: f32, matrix: &[Vec<f64>]) -> ResourceResult<()> {
        self.ensure_valid()?;
        let size = self.size as usize;
        if matrix.len() != size || matrix.iter().any(|row| row.len() != size) {
            return Err(ResourceError::Shape {
                size: self.size,
                rows: matrix.len(),
                cells: matrix.iter().map(Vec::len).sum(),
            });
        }
        let weights: Vec<i32> = matrix.iter().flatten().map(|&w| w as i32).collect();
        let ok = self
            .manager
            .engine
            .borrow_mut()
            .load_kernel(self.raw(), multiplier, &weights);
        succeeded(ok, "load kernel")
    }

    /// Release the allocation. A second call is a [`ResourceError::DoubleFree`].
    pub fn free(&mut self) -> ResourceResult<()> {
        if !self.valid {
            return Err(ResourceError::DoubleFree(HandleKind::Kernel));
        }
        self.valid = false;
        self.manager.release(self.raw());
        Ok(())
    }
}

impl<E: PixelEngine> Drop for KernelHandle<'_, E> {
    fn drop(&mut self) {
        if self.valid {
            self.valid = false;
            self.manager.release_on_drop(self.raw(), HandleKind::Kernel);
        }
    }
}

impl<E: PixelEngine> fmt::Debug for KernelHandle<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelHandle")
            .field("raw", &self.raw)
            .field("size", &self.size)
            .field("valid", &self.valid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::kernels;
    use crate::native::SoftwareEngine;

    fn manager() -> ResourceManager<SoftwareEngine> {
        ResourceManager::new(SoftwareEngine::new())
    }

    #[test]
    fn test_allocation_failure() {
        let resources = manager();
        let error = resources.allocate_image(0, 4).unwrap_err();
        assert!(matches!(error, ResourceError::Allocation { kind: HandleKind::Image, .. }));

        let error = resources.allocate_kernel(4).unwrap_err();
        assert!(matches!(error, ResourceError::Allocation { kind: HandleKind::Kernel, .. }));
        assert_eq!(resources.live_handles(), 0);
    }

    #[test]
    fn test_import_export_round_trip() {
        let resources = manager();
        let source = PixelBuffer::filled(3, 2, [1, 2, 3, 4]);
        let image = resources.load_image(&source).unwrap();

        let mut out = PixelBuffer::new(3, 2);
        image.export_pixels(&mut out).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_transfer_dimension_mismatch() {
        let resources = manager();
        let image = resources.allocate_image(3, 2).unwrap();

        let error = image.import_pixels(&PixelBuffer::new(2, 3)).unwrap_err();
        assert_eq!(
            error,
            ResourceError::DimensionMismatch {
                expected_width: 3,
                expected_height: 2,
                width: 2,
                height: 3,
            }
        );
        assert!(image.export_pixels(&mut PixelBuffer::new(4, 2)).is_err());
    }

    #[test]
    fn test_double_free_and_use_after_free() {
        let resources = manager();
        let mut image = resources.allocate_image(2, 2).unwrap();
        image.free().unwrap();
        assert!(!image.is_valid());
        assert_eq!(resources.live_handles(), 0);

        assert_eq!(image.free(), Err(ResourceError::DoubleFree(HandleKind::Image)));
        assert_eq!(
            image.import_pixels(&PixelBuffer::new(2, 2)),
            Err(ResourceError::UseAfterFree(HandleKind::Image))
        );
        assert_eq!(
            image.export_pixels(&mut PixelBuffer::new(2, 2)),
            Err(ResourceError::UseAfterFree(HandleKind::Image))
        );

        let mut kernel = resources.allocate_kernel(3).unwrap();
        kernel.free().unwrap();
        assert_eq!(kernel.free(), Err(ResourceError::DoubleFree(HandleKind::Kernel)));
        assert_eq!(
            kernel.load(1.0, &[vec![0.0; 3], vec![0.0; 3], vec![0.0; 3]]),
            Err(ResourceError::UseAfterFree(HandleKind::Kernel))
        );
    }

    #[test]
    fn test_operations_on_freed_images() {
        let resources = manager();
        let live = resources.allocate_image(2, 2).unwrap();
        let mut freed = resources.allocate_image(2, 2).unwrap();
        freed.free().unwrap();

        assert_eq!(
            resources.apply(PixelOp::Invert, &freed, &freed),
            Err(ResourceError::UseAfterFree(HandleKind::Image))
        );
        let kernel = resources.create_kernel(&kernels::laplace_kernel()).unwrap();
        assert_eq!(
            resources.convolve(&live, &freed, &kernel),
            Err(ResourceError::UseAfterFree(HandleKind::Image))
        );
    }

    #[test]
    fn test_drop_releases() {
        let resources = manager();
        {
            let _image = resources.allocate_image(4, 4).unwrap();
            let _kernel = resources.allocate_kernel(5).unwrap();
            assert_eq!(resources.live_handles(), 2);
        }
        assert_eq!(resources.live_handles(), 0);
        assert_eq!(resources.engine().allocation_count(), 0);
    }

    #[test]
    fn test_kernel_shape_is_checked() {
        let resources = manager();
        let kernel = resources.allocate_kernel(3).unwrap();
        let error = kernel.load(1.0, &[vec![1.0; 3], vec![1.0; 2], vec![1.0; 3]]).unwrap_err();
        assert_eq!(
            error,
            ResourceError::Shape {
                size: 3,
                rows: 3,
                cells: 8
            }
        );
        assert!(kernel.load(1.0, &vec![vec![1.0; 3]; 2]).is_err());
        assert!(kernel.load(0.5, &[vec![1.9; 3], vec![-1.9; 3], vec![0.0; 3]]).is_ok());
    }

    #[test]
    fn test_kernel_weights_are_truncated() {
        let resources = manager();
        let source = resources.load_image(&PixelBuffer::filled(1, 1, [100, 100, 100, 255])).unwrap();
        let target = resources.allocate_image(1, 1).unwrap();
        let kernel = resources.allocate_kernel(1).unwrap();
        kernel.load(1.0, &[vec![1.9]]).unwrap();

        resources.convolve(&source, &target, &kernel).unwrap();
        let mut out = PixelBuffer::new(1, 1);
        target.export_pixels(&mut out).unwrap();
        assert_eq!(out.data, vec![100, 100, 100, 255]);
    }

    #[test]
    fn test_pairwise_dimension_checks() {
        let resources = manager();
        let small = resources.allocate_image(2, 2).unwrap();
        let large = resources.allocate_image(3, 3).unwrap();
        let kernel = resources.create_kernel(&kernels::box_kernel(3)).unwrap();

        assert!(matches!(
            resources.apply(PixelOp::Grayscale, &small, &large),
            Err(ResourceError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            resources.convolve(&small, &large, &kernel),
            Err(ResourceError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            resources.convolve(&small, &small, &kernel),
            Err(ResourceError::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_histogram_target_must_be_fixed_size() {
        let resources = manager();
        let source = resources.load_image(&PixelBuffer::filled(8, 8, [9, 9, 9, 255])).unwrap();
        let wrong = resources.allocate_image(128, 100).unwrap();
        assert_eq!(
            resources.histogram(&source, &wrong),
            Err(ResourceError::DimensionMismatch {
                expected_width: HISTOGRAM_WIDTH,
                expected_height: HISTOGRAM_HEIGHT,
                width: 128,
                height: 100,
            })
        );

        let target = resources.allocate_image(HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT).unwrap();
        resources.histogram(&source, &target).unwrap();
        let mut out = PixelBuffer::histogram();
        target.export_pixels(&mut out).unwrap();
        assert!(out.pixels().all(|px| px[3] == 255));
    }
}
