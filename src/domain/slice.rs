// ============================================================
// Layer 3 — MriSlice Domain Type
// ============================================================
// One 2-D image taken from an MRI volume.
//
// Pixels are stored row-major:
//   pixels[row * width + col]
//
// A keras-slices file of the HipMRI study holds a single
// 256 x 128 slice, but a volume with several z-planes simply
// becomes several MriSlice values with the same source.

use serde::{Deserialize, Serialize};

/// A single grayscale slice, independent of the file format it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MriSlice {
    /// File name the slice was read from (kept for log messages)
    pub source: String,

    /// Number of rows
    pub height: usize,

    /// Number of columns
    pub width: usize,

    /// Row-major intensities, `height * width` values
    pub pixels: Vec<f32>,
}

impl MriSlice {
    /// # Panics
    /// Panics if `pixels.len() != height * width`.
    pub fn new(
        source: impl Into<String>,
        height: usize,
        width:  usize,
        pixels: Vec<f32>,
    ) -> Self {
        assert_eq!(
            pixels.len(),
            height * width,
            "pixel count does not match {}x{}",
            height,
            width
        );
        Self { source: source.into(), height, width, pixels }
    }

    pub fn pixel(&self, row: usize, col: usize) -> f32 {
        self.pixels[row * self.width + col]
    }

    /// Smallest and largest finite intensity, or `None` if there are none.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.pixels
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None             => Some((v, v)),
                Some((lo, hi))   => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_is_row_major() {
        let s = MriSlice::new("a.nii", 2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(s.pixel(0, 2), 2.0);
        assert_eq!(s.pixel(1, 0), 3.0);
    }

    #[test]
    fn test_value_range_skips_non_finite() {
        let s = MriSlice::new("a.nii", 1, 4, vec![f32::NAN, -2.0, 7.5, f32::INFINITY]);
        assert_eq!(s.value_range(), Some((-2.0, 7.5)));
    }

    #[test]
    #[should_panic]
    fn test_mismatched_pixel_count_panics() {
        let _ = MriSlice::new("a.nii", 2, 2, vec![0.0; 3]);
    }
}
