// ============================================================
// Layer 4 — Slice Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SliceSamples into
// one image tensor.
//
// How batching works here:
//   Input:  Vec of N SliceSamples, each H x W pixels
//   Output: SliceBatch with a tensor of shape [N, 1, H, W]
//
//   All pixels are flattened into one Vec in sample order and
//   reshaped; the single channel axis is what the first conv
//   layer of the encoder expects.
//
// Every sample already has the same shape (the preprocessor
// crops/pads), so no dynamic padding is needed here.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SliceSample;

// ─── SliceBatch ───────────────────────────────────────────────────────────────
/// A batch of grayscale slices ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SliceBatch<B: Backend> {
    /// Images — shape: [batch_size, 1, height, width], values in [0, 1]
    pub images: Tensor<B, 4>,
}

// ─── SliceBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct SliceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SliceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SliceSample, SliceBatch<B>> for SliceBatcher<B> {
    fn batch(&self, items: Vec<SliceSample>) -> SliceBatch<B> {
        let batch_size = items.len();
        let height     = items[0].height;
        let width      = items[0].width;

        let flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let images = Tensor::<B, 1>::from_floats(flat.as_slice(), &self.device)
            .reshape([batch_size, 1, height, width]);

        SliceBatch { images }
    }
}
