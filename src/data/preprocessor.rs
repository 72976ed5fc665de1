// ============================================================
// Layer 4 — Slice Preprocessor
// ============================================================
// Turns raw MRI intensities into model-ready images.
//
// Why do we need this?
//   - Scanner intensities are arbitrary (often 0..~1500), but the
//     decoder ends in a sigmoid and SSIM assumes a data range of 1
//   - A handful of slices in the study are 256x144 instead of
//     256x128, and the batcher needs one fixed shape
//
// Steps (applied in order):
//   1. Replace non-finite values with 0
//   2. Min-max normalise each slice to [0, 1]
//      (a constant slice becomes all zeros)
//   3. Crop from the top-left corner, or zero-pad on the
//      bottom/right, to the target height x width

use crate::domain::slice::MriSlice;

pub struct SlicePreprocessor {
    height: usize,
    width:  usize,
}

impl SlicePreprocessor {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn target_shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Normalise and resize a slice in one go.
    pub fn prepare(&self, slice: &MriSlice) -> MriSlice {
        self.fit(&self.normalise(slice))
    }

    /// Min-max normalise to [0, 1].
    pub fn normalise(&self, slice: &MriSlice) -> MriSlice {
        let pixels = match slice.value_range() {
            Some((lo, hi)) if hi > lo => {
                let span = hi - lo;
                slice.pixels
                    .iter()
                    .map(|&v| if v.is_finite() { (v - lo) / span } else { 0.0 })
                    .collect()
            }
            _ => vec![0.0; slice.pixels.len()],
        };
        MriSlice::new(slice.source.clone(), slice.height, slice.width, pixels)
    }

    /// Top-left crop / zero-pad to the target shape.
    pub fn fit(&self, slice: &MriSlice) -> MriSlice {
        if slice.shape() == self.target_shape() {
            return slice.clone();
        }

        let mut pixels = vec![0.0f32; self.height * self.width];
        let rows = slice.height.min(self.height);
        let cols = slice.width.min(self.width);

        for r in 0..rows {
            let src = &slice.pixels[r * slice.width..r * slice.width + cols];
            pixels[r * self.width..r * self.width + cols].copy_from_slice(src);
        }

        tracing::trace!(
            "Resized '{}' from {}x{} to {}x{}",
            slice.source, slice.height, slice.width, self.height, self.width
        );
        MriSlice::new(slice.source.clone(), self.height, self.width, pixels)
    }
}
