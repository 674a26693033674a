//! Kernel catalog: named convolution kernels and parametric generators.
//!
//! Pure lookup and generation; nothing here touches the engine. Bounds on
//! sizes are enforced when descriptors are parsed, not here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A square weight matrix plus scalar multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelDescriptor {
    /// Side length of the matrix
    pub size: u32,
    /// Scalar applied to the weighted sum
    pub multiplier: f32,
    /// Row-major weights; entries are truncated to integers on load
    pub matrix: Vec<Vec<f64>>,
}

impl KernelDescriptor {
    /// Build a descriptor from a static integer table.
    fn from_table<const N: usize>(multiplier: f32, table: &[[i32; N]; N]) -> Self {
        Self {
            size: N as u32,
            multiplier,
            matrix: table
                .iter()
                .map(|row| row.iter().map(|&w| f64::from(w)).collect())
                .collect(),
        }
    }

    /// Whether the matrix is exactly `size x size`.
    pub fn is_square(&self) -> bool {
        self.matrix.len() == self.size as usize
            && self.matrix.iter().all(|row| row.len() == self.size as usize)
    }
}

impl fmt::Display for KernelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Kernel ({}) multiplier: {:.3}", self.size, self.multiplier)?;
        for row in &self.matrix {
            let cells: Vec<String> = row.iter().map(|w| format!("{}", *w as i32)).collect();
            writeln!(f, "  {}", cells.join(", "))?;
        }
        Ok(())
    }
}

/// Direction of a Sobel edge kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SobelDirection {
    /// Horizontal gradient
    X,
    /// Vertical gradient
    Y,
}

const GAUSSIAN_3: [[i32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];

const GAUSSIAN_5: [[i32; 5]; 5] = [
    [1, 4, 7, 4, 1],
    [4, 16, 26, 16, 4],
    [7, 26, 41, 26, 7],
    [4, 16, 26, 16, 4],
    [1, 4, 7, 4, 1],
];

const GAUSSIAN_7: [[i32; 7]; 7] = [
    [0, 0, 1, 2, 1, 0, 0],
    [0, 3, 13, 22, 13, 3, 0],
    [1, 13, 59, 97, 59, 13, 1],
    [2, 22, 97, 159, 97, 22, 2],
    [1, 13, 59, 97, 59, 13, 1],
    [0, 3, 13, 22, 13, 3, 0],
    [0, 0, 1, 2, 1, 0, 0],
];

const SOBEL_X: [[i32; 3]; 3] = [[1, 0, -1], [2, 0, -2], [1, 0, -1]];

const SOBEL_Y: [[i32; 3]; 3] = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

const LAPLACE: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 8, -1], [-1, -1, -1]];

const UNSHARP_MASK: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]];

/// Sizes with a precomputed gaussian table.
pub const GAUSSIAN_SIZES: [i64; 3] = [3, 5, 7];

/// Box blur of arbitrary size: all ones, multiplier `1 / size²`.
pub fn box_kernel(size: u32) -> KernelDescriptor {
    let n = size as usize;
    KernelDescriptor {
        size,
        multiplier: 1.0 / (size as f32 * size as f32),
        matrix: vec![vec![1.0; n]; n],
    }
}

/// Gaussian blur for sizes 3, 5 and 7.
///
/// Any other size resolves to the 3x3 kernel.
pub fn gaussian_kernel(size: i64) -> KernelDescriptor {
    match size {
        5 => KernelDescriptor::from_table(1.0 / 273.0, &GAUSSIAN_5),
        7 => KernelDescriptor::from_table(1.0 / 1003.0, &GAUSSIAN_7),
        3 => KernelDescriptor::from_table(1.0 / 16.0, &GAUSSIAN_3),
        other => {
            log::debug!("No gaussian kernel of size {other}, using 3");
            KernelDescriptor::from_table(1.0 / 16.0, &GAUSSIAN_3)
        }
    }
}

/// Sobel edge detection in the given direction.
pub fn sobel_kernel(direction: SobelDirection) -> KernelDescriptor {
    match direction {
        SobelDirection::X => KernelDescriptor::from_table(1.0, &SOBEL_X),
        SobelDirection::Y => KernelDescriptor::from_table(1.0, &SOBEL_Y),
    }
}

/// Laplace edge detection.
pub fn laplace_kernel() -> KernelDescriptor {
    KernelDescriptor::from_table(1.0, &LAPLACE)
}

/// Sharpening kernel; `scale` becomes the multiplier.
pub fn unsharp_mask_kernel(scale: f32) -> KernelDescriptor {
    KernelDescriptor::from_table(scale, &UNSHARP_MASK)
}

/// User-supplied kernel with multiplier `numerator / denumerator`.
///
/// The division is performed as-is; a zero denumerator is rejected when the
/// descriptor is parsed, not here.
pub fn custom_kernel(
    size: u32,
    numerator: f64,
    denumerator: f64,
    matrix: Vec<Vec<f64>>,
) -> KernelDescriptor {
    KernelDescriptor {
        size,
        multiplier: (numerator / denumerator) as f32,
        matrix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_kernel() {
        let kernel = box_kernel(4);
        assert_eq!(kernel.size, 4);
        assert_eq!(kernel.multiplier, 1.0 / 16.0);
        assert!(kernel.is_square());
        assert!(kernel.matrix.iter().flatten().all(|&w| w == 1.0));
    }

    #[test]
    fn test_gaussian_table() {
        assert_eq!(gaussian_kernel(3).multiplier, 1.0 / 16.0);
        assert_eq!(gaussian_kernel(5).multiplier, 1.0 / 273.0);
        assert_eq!(gaussian_kernel(7).multiplier, 1.0 / 1003.0);
        assert_eq!(gaussian_kernel(7).matrix[3][3], 159.0);
        for size in GAUSSIAN_SIZES {
            assert!(gaussian_kernel(size).is_square());
        }
    }

    #[test]
    fn test_gaussian_fallback_to_three() {
        for size in [-1, 0, 1, 4, 9, 100] {
            assert_eq!(gaussian_kernel(size), gaussian_kernel(3));
        }
    }

    #[test]
    fn test_sobel_directions() {
        let x = sobel_kernel(SobelDirection::X);
        let y = sobel_kernel(SobelDirection::Y);
        assert_eq!(x.matrix[0], vec![1.0, 0.0, -1.0]);
        assert_eq!(y.matrix[0], vec![1.0, 2.0, 1.0]);
        assert_eq!(x.multiplier, 1.0);
    }

    #[test]
    fn test_unsharp_mask_uses_scale() {
        let kernel = unsharp_mask_kernel(0.5);
        assert_eq!(kernel.multiplier, 0.5);
        assert_eq!(kernel.matrix[1][1], 9.0);
        assert_eq!(laplace_kernel().matrix[1][1], 8.0);
    }

    #[test]
    fn test_custom_kernel_multiplier() {
        let kernel = custom_kernel(1, 3.0, 4.0, vec![vec![1.0]]);
        assert_eq!(kernel.multiplier, 0.75);
    }

    #[test]
    fn test_display_dump() {
        let dump = laplace_kernel().to_string();
        assert!(dump.starts_with("Kernel (3) multiplier: 1.000"));
        assert!(dump.contains("-1, 8, -1"));
    }
}
