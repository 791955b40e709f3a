//! Fixed, versioned, little-endian records carried inside metadata blobs.
//!
//! All multi-byte integers in these structs are **little-endian** on the wire.
//! We store them pre-LE with `.to_le()` and decode with `.from_le()`; floats
//! travel as their IEEE-754 bit patterns.

use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

/// Bump when the blob layout or semantics change in incompatible ways.
pub const WIRE_VERSION: u16 = 1;

/// Leading tag of every metadata blob ("MTMD").
pub const WIRE_MAGIC: u32 = u32::from_le_bytes(*b"MTMD");

/// Record kinds that can head a blob.
pub const KIND_MESH_METADATA: u16 = 1;

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Decode a record from an unaligned byte slice of exactly its size.
pub fn read_record<T: Pod>(bytes: &[u8]) -> Result<T, String> {
    expect_exact_len(bytes.len(), size_of::<T>())?;
    Ok(bytemuck::pod_read_unaligned(bytes))
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireHdr {
    pub magic_le: u32,
    pub version_le: u16, // = WIRE_VERSION.to_le()
    pub kind_le: u16,
}

impl WireHdr {
    pub fn new(kind: u16) -> Self {
        Self {
            magic_le: WIRE_MAGIC.to_le(),
            version_le: WIRE_VERSION.to_le(),
            kind_le: kind.to_le(),
        }
    }
    pub fn magic(&self) -> u32 {
        u32::from_le(self.magic_le)
    }
    pub fn version(&self) -> u16 {
        u16::from_le(self.version_le)
    }
    pub fn kind(&self) -> u16 {
        u16::from_le(self.kind_le)
    }

    /// Check magic, version and kind against what the caller expects.
    pub fn check(&self, kind: u16) -> Result<(), String> {
        if self.magic() != WIRE_MAGIC {
            return Err(format!("bad blob magic {:#010x}", self.magic()));
        }
        if self.version() != WIRE_VERSION {
            return Err(format!(
                "blob version {} (expected {WIRE_VERSION})",
                self.version()
            ));
        }
        if self.kind() != kind {
            return Err(format!("blob kind {} (expected {kind})", self.kind()));
        }
        Ok(())
    }
}

/// Per-block shape record of a mesh metadata blob.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireBlock {
    pub id_le: u64,
    pub owner_le: u64,
    pub num_points_le: u64,
    pub num_cells_le: u64,
    pub cell_array_size_le: u64,
    pub extent_le: [i32; 6],
    pub bounds_bits_le: [u64; 6],
}

impl WireBlock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        owner: usize,
        num_points: u64,
        num_cells: u64,
        cell_array_size: u64,
        extent: [i32; 6],
        bounds: [f64; 6],
    ) -> Self {
        Self {
            id_le: (id as u64).to_le(),
            owner_le: (owner as u64).to_le(),
            num_points_le: num_points.to_le(),
            num_cells_le: num_cells.to_le(),
            cell_array_size_le: cell_array_size.to_le(),
            extent_le: extent.map(i32::to_le),
            bounds_bits_le: bounds.map(|b| b.to_bits().to_le()),
        }
    }
    pub fn id(&self) -> usize {
        u64::from_le(self.id_le) as usize
    }
    pub fn owner(&self) -> usize {
        u64::from_le(self.owner_le) as usize
    }
    pub fn num_points(&self) -> u64 {
        u64::from_le(self.num_points_le)
    }
    pub fn num_cells(&self) -> u64 {
        u64::from_le(self.num_cells_le)
    }
    pub fn cell_array_size(&self) -> u64 {
        u64::from_le(self.cell_array_size_le)
    }
    pub fn extent(&self) -> [i32; 6] {
        self.extent_le.map(i32::from_le)
    }
    pub fn bounds(&self) -> [f64; 6] {
        self.bounds_bits_le.map(|b| f64::from_bits(u64::from_le(b)))
    }
}

/// Descriptor of one data array in a mesh metadata blob; the name follows it.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireArray {
    pub components_le: u32,
    pub centering: u8,
    pub scalar: u8,
    pub reserved_le: u16, // keep zero
}

impl WireArray {
    pub fn new(components: usize, centering: u8, scalar: u8) -> Self {
        Self {
            components_le: (components as u32).to_le(),
            centering,
            scalar,
            reserved_le: 0,
        }
    }
    pub fn components(&self) -> usize {
        u32::from_le(self.components_le) as usize
    }
}

static_assertions::const_assert_eq!(size_of::<WireHdr>(), 8);
static_assertions::const_assert_eq!(size_of::<WireBlock>(), 112);
static_assertions::const_assert_eq!(size_of::<WireArray>(), 8);
