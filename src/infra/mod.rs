// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs — Saving and loading model weights
//                   Uses Burn's CompactRecorder to
//                   serialise model parameters to disk.
//                   Also saves/loads TrainConfig as JSON
//                   so evaluation can rebuild the model.
//
//   metrics.rs    — Training metrics
//                   Running averages, codebook usage and
//                   the per-epoch CSV log.
//
//   plot.rs       — Loss / SSIM chart
//                   Renders the run's history as an SVG
//                   with loss and SSIM on separate axes.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Running averages, codebook usage and the metrics CSV
pub mod metrics;

/// Loss and SSIM curves as SVG
pub mod plot;
