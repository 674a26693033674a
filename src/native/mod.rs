//! Boundary to the pixel-processing engine.
//!
//! The engine owns a private memory space and hands out raw numeric handles.
//! A handle of `0` means the allocation failed. Every operation reports
//! success as a plain `bool`; the engine gives no further diagnostics.
//!
//! Nothing outside [`crate::execution::resources`] should call these methods
//! directly: the resource manager is what guarantees that handles are live,
//! correctly shaped, and freed exactly once.

pub mod software;

pub use software::SoftwareEngine;

/// Raw engine handle. `0` is the null handle.
pub type RawHandle = u32;

/// The null handle returned by a failed allocation.
pub const NULL_HANDLE: RawHandle = 0;

/// Per-pixel operations the engine can run from one image into another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelOp {
    /// Rec. 709 luma into R, G and B
    Grayscale,
    /// `255 - c` per color channel
    Invert,
    /// Per channel: `c > value` becomes 255, otherwise 0
    Threshold { value: u8 },
    /// Hue shift in degrees, saturation and value multipliers
    HsvAdjust { hue: f32, saturation: f32, value: f32 },
    /// Color channels multiplied by `multiplier`
    LinearBrightness { multiplier: f32 },
    /// Gamma correction
    Gamma { gamma: f32 },
    /// Average blocks of `size x size` pixels
    Pixelate { size: u8 },
    /// Drop the lowest `bits` bits of each color channel
    Bitcrush { bits: u8 },
    /// Uniform noise of amplitude `noise`, per channel when `color` is set
    Noise { noise: u8, color: bool, seed: u32 },
}

impl PixelOp {
    /// Name used when reporting a failed call.
    pub fn name(&self) -> &'static str {
        match self {
            PixelOp::Grayscale => "grayscale",
            PixelOp::Invert => "invert",
            PixelOp::Threshold { .. } => "threshold",
            PixelOp::HsvAdjust { .. } => "hsv-adjust",
            PixelOp::LinearBrightness { .. } => "linear-brightness",
            PixelOp::Gamma { .. } => "gamma",
            PixelOp::Pixelate { .. } => "pixelate",
            PixelOp::Bitcrush { .. } => "bitcrush",
            PixelOp::Noise { .. } => "noise",
        }
    }
}

/// Handle-based pixel engine.
///
/// Implementations need not validate their inputs beyond returning `false`
/// or a null handle; the resource manager performs all contract checks
/// before calling in.
pub trait PixelEngine {
    /// Allocate an RGBA image of `width x height`. Returns [`NULL_HANDLE`] on failure.
    fn allocate_image(&mut self, width: u32, height: u32) -> RawHandle;

    /// Allocate a `size x size` kernel. Returns [`NULL_HANDLE`] on failure.
    fn allocate_kernel(&mut self, size: u32) -> RawHandle;

    /// Release an image or kernel.
    fn free(&mut self, handle: RawHandle);

    /// Copy RGBA bytes into an image.
    fn write_pixels(&mut self, image: RawHandle, data: &[u8]) -> bool;

    /// Copy an image's RGBA bytes out.
    fn read_pixels(&self, image: RawHandle, out: &mut [u8]) -> bool;

    /// Store a kernel's multiplier and row-major integer weights.
    fn load_kernel(&mut self, kernel: RawHandle, multiplier: f32, weights: &[i32]) -> bool;

    /// Run a per-pixel operation. `src` and `dst` may be the same image.
    fn apply(&mut self, op: PixelOp, src: RawHandle, dst: RawHandle) -> bool;

    /// Convolve `src` into `dst`, which must be different images.
    fn convolve(&mut self, src: RawHandle, dst: RawHandle, kernel: RawHandle) -> bool;

    /// Render the color histogram of `src` into the 256x100 image `dst`.
    fn histogram(&mut self, src: RawHandle, dst: RawHandle) -> bool;
}
