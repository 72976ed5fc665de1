// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only talks to image sources through
// this trait, so the NIfTI reader can be swapped for another
// format without touching the training workflow.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::slice::MriSlice;

// ─── SliceSource ──────────────────────────────────────────────────────────────
/// Any component that can produce MRI slices.
///
/// Implementations:
///   - NiftiSliceLoader → a directory of .nii / .nii.gz files
pub trait SliceSource {
    /// Load every slice available from this source.
    fn load_all(&self) -> Result<Vec<MriSlice>>;
}
