// ============================================================
// Layer 4 — Slice Loader
// ============================================================
// Loads every NIfTI file in a directory and turns each
// z-plane into an MriSlice.
//
// Axis convention:
//   NIfTI stores x fastest. Array libraries expose a 2-D file as
//   an (x, y) array, so voxel (x, y) becomes row x, column y.
//   A 256 x 128 keras slice therefore has height 256, width 128.
//
// Files are visited in sorted order so runs are reproducible
// regardless of directory iteration order.

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::data::nifti::{read_nifti, NiftiImage};
use crate::domain::slice::MriSlice;
use crate::domain::traits::SliceSource;

/// Loads all .nii / .nii.gz files from a given directory.
/// Implements the SliceSource trait from Layer 3.
pub struct NiftiSliceLoader {
    dir: PathBuf,
}

impl NiftiSliceLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SliceSource for NiftiSliceLoader {
    fn load_all(&self) -> Result<Vec<MriSlice>> {
        // A missing directory is reported but not fatal; the caller
        // decides whether an empty set is acceptable.
        if !self.dir.exists() {
            tracing::warn!(
                "Slice directory '{}' does not exist — returning no slices",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_nifti_path(p))
            .collect();
        paths.sort();

        let mut slices = Vec::new();
        for path in &paths {
            let source = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string();

            let decoded = read_nifti(path)
                .map_err(anyhow::Error::from)
                .and_then(|img| image_to_slices(&img, &source));

            match decoded {
                Ok(mut s) => {
                    tracing::debug!("Loaded: {} ({} slice(s))", source, s.len());
                    slices.append(&mut s);
                }
                // One corrupt file should not abort a 10k-file run
                Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
            }
        }

        tracing::info!(
            "Loaded {} slices from {} files in '{}'",
            slices.len(),
            paths.len(),
            self.dir.display()
        );
        Ok(slices)
    }
}

/// True for `*.nii` and `*.nii.gz` (case-insensitive).
pub fn is_nifti_path(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_ascii_lowercase(),
        None    => return false,
    };
    path.is_file() && (name.ends_with(".nii") || name.ends_with(".nii.gz"))
}

/// Split a decoded image into one slice per z-plane.
pub fn image_to_slices(image: &NiftiImage, source: &str) -> Result<Vec<MriSlice>> {
    if image.dims.len() < 2 {
        bail!("'{}' has rank {}, expected at least 2 axes", source, image.dims.len());
    }

    let nx     = image.dims[0];
    let ny     = image.dims[1];
    let plane  = nx * ny;
    let planes = image.voxel_count() / plane;

    let slices = (0..planes)
        .map(|z| {
            let base = z * plane;
            let mut pixels = vec![0.0f32; plane];
            // file index = x + y * nx  →  pixel (row = x, col = y)
            for y in 0..ny {
                for x in 0..nx {
                    pixels[x * ny + y] = image.data[base + y * nx + x];
                }
            }
            MriSlice::new(source, nx, ny, pixels)
        })
        .collect();

    Ok(slices)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::nifti::tests::{f32_voxels, synthetic_nifti};
    use crate::data::nifti::Datatype;
    use byteorder::LittleEndian;

    #[test]
    fn test_image_to_slices_transposes_axes() {
        // nx = 3, ny = 2; file order x fastest
        let img = NiftiImage {
            dims:     vec![3, 2],
            datatype: Datatype::F32,
            data:     vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0],
        };
        let slices = image_to_slices(&img, "a.nii").unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].shape(), (3, 2));
        // row x=1: (x=1,y=0)=1.0, (x=1,y=1)=11.0
        assert_eq!(slices[0].pixel(1, 0), 1.0);
        assert_eq!(slices[0].pixel(1, 1), 11.0);
    }

    #[test]
    fn test_volume_yields_one_slice_per_plane() {
        let img = NiftiImage {
            dims:     vec![2, 2, 3],
            datatype: Datatype::F32,
            data:     (0..12).map(|v| v as f32).collect(),
        };
        let slices = image_to_slices(&img, "vol.nii").unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[2].pixel(0, 0), 8.0);
    }

    #[test]
    fn test_rank_one_is_rejected() {
        let img = NiftiImage { dims: vec![4], datatype: Datatype::U8, data: vec![0.0; 4] };
        assert!(image_to_slices(&img, "line.nii").is_err());
    }

    #[test]
    fn test_missing_directory_gives_empty_set() {
        let loader = NiftiSliceLoader::new("/definitely/not/here");
        assert!(loader.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_loads_sorted_and_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = synthetic_nifti::<LittleEndian>(&[2, 2], 16, 0.0, 0.0, &f32_voxels(&[1.0; 4]));
        fs::write(dir.path().join("b_slice.nii"), &good).unwrap();
        fs::write(dir.path().join("a_slice.nii"), &good).unwrap();
        fs::write(dir.path().join("broken.nii"), b"not a nifti file").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let slices = NiftiSliceLoader::new(dir.path()).load_all().unwrap();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].source, "a_slice.nii");
        assert_eq!(slices[1].source, "b_slice.nii");
    }

    #[test]
    fn test_is_nifti_path_checks_extension() {
        let dir = tempfile::tempdir().unwrap();
        let gz  = dir.path().join("x.NII.GZ");
        let txt = dir.path().join("x.txt");
        fs::write(&gz, b"").unwrap();
        fs::write(&txt, b"").unwrap();
        assert!(is_nifti_path(&gz));
        assert!(!is_nifti_path(&txt));
    }
}
