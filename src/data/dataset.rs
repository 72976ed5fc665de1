use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::preprocessor::SlicePreprocessor;
use crate::domain::slice::MriSlice;

/// One preprocessed slice at the fixed training shape, values in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceSample {
    pub pixels: Vec<f32>,
    pub height: usize,
    pub width:  usize,
}

impl SliceSample {
    pub fn from_slice(slice: &MriSlice, preprocessor: &SlicePreprocessor) -> Self {
        let prepared = preprocessor.prepare(slice);
        Self {
            pixels: prepared.pixels,
            height: prepared.height,
            width:  prepared.width,
        }
    }
}

pub struct SliceDataset {
    samples: Vec<SliceSample>,
}

impl SliceDataset {
    pub fn new(samples: Vec<SliceSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Number of batches a loader with `batch_size` will yield.
    pub fn batch_count(&self, batch_size: usize) -> usize {
        self.samples.len().div_ceil(batch_size.max(1))
    }
}

impl Dataset<SliceSample> for SliceDataset {
    fn get(&self, index: usize) -> Option<SliceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_uses_target_shape() {
        let p      = SlicePreprocessor::new(4, 2);
        let slice  = MriSlice::new("s.nii", 2, 2, vec![0.0, 2.0, 4.0, 8.0]);
        let sample = SliceSample::from_slice(&slice, &p);
        assert_eq!((sample.height, sample.width), (4, 2));
        assert_eq!(sample.pixels.len(), 8);
        assert_eq!(sample.pixels[3], 1.0);
    }

    #[test]
    fn test_batch_count_rounds_up() {
        let sample = SliceSample { pixels: vec![0.0], height: 1, width: 1 };
        let ds     = SliceDataset::new(vec![sample; 33]);
        assert_eq!(ds.batch_count(16), 3);
        assert_eq!(ds.len(), 33);
        assert_eq!(SliceDataset::new(Vec::new()).batch_count(16), 0);
    }
}
