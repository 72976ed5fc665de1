// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the network, its losses and metrics,
// and the loops that train and evaluate it.
//
// What's in this layer:
//
//   quantizer.rs — Vector quantizer
//                  Learned codebook, nearest-code lookup,
//                  codebook + commitment loss, straight-through
//                  gradient
//
//   model.rs     — The VQ-VAE
//                  • Strided conv encoder + residual stack
//                  • 1x1 pre-quantization projection
//                  • Transposed conv decoder, sigmoid output
//
//   ssim.rs      — Structural similarity metric
//                  Gaussian-window SSIM via depthwise conv
//
//   trainer.rs   — The training loop
//                  Forward pass, loss, backward pass, Adam
//                  step, validation, checkpoints, metrics
//
//   evaluator.rs — Gradient-free evaluation
//                  Shared by per-epoch validation and the
//                  test-set evaluation of a saved checkpoint
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            van den Oord et al. (2017) VQ-VAE

/// Codebook lookup and quantization loss
pub mod quantizer;

/// Encoder / decoder VQ-VAE architecture
pub mod model;

/// SSIM between reconstructions and inputs
pub mod ssim;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Loss, SSIM and codebook usage over a dataset
pub mod evaluator;
