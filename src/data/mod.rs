// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from NIfTI files on disk to tensor batches.
//
// The pipeline flows in this order:
//
//   .nii / .nii.gz files
//       │
//       ▼
//   nifti             → decodes header + voxels
//       │
//       ▼
//   NiftiSliceLoader  → one MriSlice per z-plane
//       │
//       ▼
//   SlicePreprocessor → [0, 1] intensities, fixed H x W
//       │
//       ▼
//   SliceDataset      → implements Burn's Dataset trait
//       │
//       ▼
//   SliceBatcher      → stacks samples into [N, 1, H, W]
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// NIfTI-1 codec (.nii, .nii.gz)
pub mod nifti;

/// Loads every NIfTI file in a directory as MRI slices
pub mod loader;

/// Normalises intensities and fixes the slice shape
pub mod preprocessor;

/// Implements Burn's Dataset trait for slice samples
pub mod dataset;

/// Implements Burn's Batcher trait to create image batches
pub mod batcher;

/// Seeded shuffle + train/validation split
pub mod splitter;
