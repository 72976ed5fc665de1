// ============================================================
// Layer 4 — NIfTI-1 Reader
// ============================================================
// Decodes the single-file NIfTI-1 format used by the HipMRI
// "keras slices" data (.nii and .nii.gz).
//
// File layout:
//   bytes 0..348    header (fixed offsets, see below)
//   bytes 348..352  extension flag (ignored)
//   vox_offset..    voxel data, x varies fastest
//
// Header fields we need:
//   @0    i32      sizeof_hdr — always 348, also tells us the byte order
//   @40   i16[8]   dim[0] = rank, dim[1..=rank] = extent per axis
//   @70   i16      datatype code
//   @108  f32      vox_offset
//   @112  f32      scl_slope
//   @116  f32      scl_inter
//   @344  [u8;4]   magic "n+1\0"
//
// Reference: NIfTI-1 data format (nifti1.h)

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::MultiGzDecoder;
use std::{fs, io::Read, path::Path};
use thiserror::Error;

const HEADER_SIZE:     usize   = 348;
const MIN_VOX_OFFSET:  usize   = 352;
const SINGLE_FILE_MAGIC: [u8; 4] = *b"n+1\0";
const GZIP_MAGIC:      [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum NiftiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is {0} bytes, too short for a NIfTI-1 header")]
    Truncated(usize),

    #[error("unrecognised sizeof_hdr {0}; only NIfTI-1 is supported")]
    BadHeaderSize(i32),

    #[error("unsupported magic {0:?}; only single-file (n+1) NIfTI is supported")]
    BadMagic([u8; 4]),

    #[error("unsupported datatype code {0}")]
    UnsupportedDatatype(i16),

    #[error("invalid dim field {0:?}")]
    BadDimensions(Vec<i16>),

    #[error("voxel data truncated: need {needed} bytes at offset {offset}, file has {available}")]
    DataTruncated { needed: usize, offset: usize, available: usize },
}

/// Voxel storage types we can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    U8,
    I8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl Datatype {
    pub fn from_code(code: i16) -> Result<Self, NiftiError> {
        Ok(match code {
            2    => Datatype::U8,
            4    => Datatype::I16,
            8    => Datatype::I32,
            16   => Datatype::F32,
            64   => Datatype::F64,
            256  => Datatype::I8,
            512  => Datatype::U16,
            768  => Datatype::U32,
            1024 => Datatype::I64,
            1280 => Datatype::U64,
            other => return Err(NiftiError::UnsupportedDatatype(other)),
        })
    }

    pub fn byte_size(self) -> usize {
        match self {
            Datatype::U8  | Datatype::I8                   => 1,
            Datatype::I16 | Datatype::U16                  => 2,
            Datatype::I32 | Datatype::U32 | Datatype::F32  => 4,
            Datatype::I64 | Datatype::U64 | Datatype::F64  => 8,
        }
    }
}

/// A decoded image: extents per axis and scaled voxel values.
#[derive(Debug, Clone)]
pub struct NiftiImage {
    /// Extent of each axis, `dims[0]` is x (fastest varying)
    pub dims:     Vec<usize>,
    pub datatype: Datatype,
    /// Voxel values in file order after `scl_slope` / `scl_inter`
    pub data:     Vec<f32>,
}

impl NiftiImage {
    pub fn voxel_count(&self) -> usize {
        self.dims.iter().product()
    }
}

/// Read a `.nii` or `.nii.gz` file. Gzip is detected from the
/// content, not the extension.
pub fn read_nifti(path: &Path) -> Result<NiftiImage, NiftiError> {
    let raw = fs::read(path)?;

    let bytes = if raw.starts_with(&GZIP_MAGIC) {
        let mut out = Vec::with_capacity(raw.len() * 4);
        MultiGzDecoder::new(raw.as_slice()).read_to_end(&mut out)?;
        out
    } else {
        raw
    };

    parse_nifti(&bytes)
}

/// Decode an uncompressed NIfTI-1 byte buffer.
pub fn parse_nifti(bytes: &[u8]) -> Result<NiftiImage, NiftiError> {
    if bytes.len() < HEADER_SIZE {
        return Err(NiftiError::Truncated(bytes.len()));
    }

    // sizeof_hdr must read as 348 in the file's own byte order
    let little = LittleEndian::read_i32(&bytes[0..4]);
    if little == HEADER_SIZE as i32 {
        return parse_with::<LittleEndian>(bytes);
    }
    if BigEndian::read_i32(&bytes[0..4]) == HEADER_SIZE as i32 {
        return parse_with::<BigEndian>(bytes);
    }
    Err(NiftiError::BadHeaderSize(little))
}

fn parse_with<E: ByteOrder>(bytes: &[u8]) -> Result<NiftiImage, NiftiError> {
    let magic = [bytes[344], bytes[345], bytes[346], bytes[347]];
    if magic != SINGLE_FILE_MAGIC {
        return Err(NiftiError::BadMagic(magic));
    }

    let raw_dims: Vec<i16> = (0..8)
        .map(|i| E::read_i16(&bytes[40 + 2 * i..42 + 2 * i]))
        .collect();
    let rank = raw_dims[0];
    if !(1..=7).contains(&rank) || raw_dims[1..=rank as usize].iter().any(|&d| d < 1) {
        return Err(NiftiError::BadDimensions(raw_dims));
    }
    let dims: Vec<usize> = raw_dims[1..=rank as usize]
        .iter()
        .map(|&d| d as usize)
        .collect();

    let datatype = Datatype::from_code(E::read_i16(&bytes[70..72]))?;

    let vox_offset = E::read_f32(&bytes[108..112]);
    let offset = if vox_offset.is_finite() && vox_offset >= 0.0 {
        (vox_offset as usize).max(MIN_VOX_OFFSET)
    } else {
        MIN_VOX_OFFSET
    };

    // Header fields are untrusted: every size computation is checked
    let needed = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .and_then(|count| count.checked_mul(datatype.byte_size()))
        .ok_or_else(|| NiftiError::BadDimensions(raw_dims.clone()))?;
    let end = offset.checked_add(needed);
    if end.map_or(true, |end| end > bytes.len()) {
        return Err(NiftiError::DataTruncated {
            needed,
            offset,
            available: bytes.len(),
        });
    }

    let mut data = decode_voxels::<E>(&bytes[offset..offset + needed], datatype);

    let slope = E::read_f32(&bytes[112..116]);
    let inter = E::read_f32(&bytes[116..120]);
    if slope.is_finite() && slope != 0.0 {
        let inter = if inter.is_finite() { inter } else { 0.0 };
        data.iter_mut().for_each(|v| *v = *v * slope + inter);
    }

    Ok(NiftiImage { dims, datatype, data })
}

fn decode_voxels<E: ByteOrder>(raw: &[u8], datatype: Datatype) -> Vec<f32> {
    raw.chunks_exact(datatype.byte_size())
        .map(|c| match datatype {
            Datatype::U8  => c[0] as f32,
            Datatype::I8  => c[0] as i8 as f32,
            Datatype::I16 => E::read_i16(c) as f32,
            Datatype::U16 => E::read_u16(c) as f32,
            Datatype::I32 => E::read_i32(c) as f32,
            Datatype::U32 => E::read_u32(c) as f32,
            Datatype::I64 => E::read_i64(c) as f32,
            Datatype::U64 => E::read_u64(c) as f32,
            Datatype::F32 => E::read_f32(c),
            Datatype::F64 => E::read_f64(c) as f32,
        })
        .collect()
}
