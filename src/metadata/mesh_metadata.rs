//! Description of one named mesh at one point in time.
//!
//! A `MeshMetadata` with `global_view == true` lists every block of the mesh
//! across all processes, in global block order. That is what the codecs need to
//! compute wire offsets, so it is what travels in each object's metadata blob.

use crate::blob::BinaryBlob;
use crate::data::{Centering, GeometryKind, ScalarType};
use crate::schema_error::SchemaError;
use crate::wire::{KIND_MESH_METADATA, WireArray, WireBlock, WireHdr};
use serde::{Deserialize, Serialize};

/// Name of the reserved ghost-marker arrays.
pub const GHOST_ARRAY_NAME: &str = "vtkGhostType";

/// Extent of a block with no index space.
pub const EMPTY_EXTENT: [i32; 6] = [0, -1, 0, -1, 0, -1];

/// Bounds of a block with no geometry.
pub const EMPTY_BOUNDS: [f64; 6] = [f64::MAX, f64::MIN, f64::MAX, f64::MIN, f64::MAX, f64::MIN];

/// Descriptor of one named data array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayMetadata {
    pub name: String,
    pub centering: Centering,
    pub components: usize,
    pub scalar: ScalarType,
}

impl ArrayMetadata {
    pub fn new(
        name: impl Into<String>,
        centering: Centering,
        components: usize,
        scalar: ScalarType,
    ) -> Self {
        Self {
            name: name.into(),
            centering,
            components,
            scalar,
        }
    }
}

/// Layout of one mesh: its blocks, their owners and sizes, and its arrays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshMetadata {
    pub mesh_name: String,
    pub block_type: GeometryKind,
    pub coordinate_type: ScalarType,
    pub num_blocks: usize,
    /// Number of blocks held by each rank of the group.
    pub num_blocks_local: Vec<usize>,
    pub block_ids: Vec<usize>,
    pub block_owner: Vec<usize>,
    pub block_num_points: Vec<u64>,
    pub block_num_cells: Vec<u64>,
    /// Length of each block's count-prefixed connectivity.
    pub block_cell_array_size: Vec<u64>,
    /// Cell extents `[i0, i1, j0, j1, k0, k1]`, inclusive.
    pub block_extents: Vec<[i32; 6]>,
    pub block_bounds: Vec<[f64; 6]>,
    pub extent: [i32; 6],
    pub bounds: [f64; 6],
    pub arrays: Vec<ArrayMetadata>,
    pub num_ghost_cells: u32,
    pub num_ghost_nodes: u32,
    pub global_view: bool,
}

impl MeshMetadata {
    /// Metadata for a mesh with no blocks yet.
    pub fn new(mesh_name: impl Into<String>, block_type: GeometryKind) -> Self {
        Self {
            mesh_name: mesh_name.into(),
            block_type,
            coordinate_type: ScalarType::F64,
            num_blocks: 0,
            num_blocks_local: Vec::new(),
            block_ids: Vec::new(),
            block_owner: Vec::new(),
            block_num_points: Vec::new(),
            block_num_cells: Vec::new(),
            block_cell_array_size: Vec::new(),
            block_extents: Vec::new(),
            block_bounds: Vec::new(),
            extent: EMPTY_EXTENT,
            bounds: EMPTY_BOUNDS,
            arrays: Vec::new(),
            num_ghost_cells: 0,
            num_ghost_nodes: 0,
            global_view: false,
        }
    }

    pub fn num_arrays(&self) -> usize {
        self.arrays.len()
    }

    /// Slot index of the named array with the given centering.
    pub fn array_index(&self, name: &str, centering: Centering) -> Option<usize> {
        self.arrays
            .iter()
            .position(|a| a.name == name && a.centering == centering)
    }

    /// Number of ghost arrays present, each flag counted on its own.
    pub fn num_ghost_arrays(&self) -> usize {
        usize::from(self.num_ghost_cells > 0) + usize::from(self.num_ghost_nodes > 0)
    }

    /// Wire slot of the cell ghost array; the first slot after the data arrays.
    pub fn cell_ghost_slot(&self) -> usize {
        self.arrays.len()
    }

    /// Wire slot of the node ghost array; always one past the cell ghost slot.
    pub fn node_ghost_slot(&self) -> usize {
        self.arrays.len() + 1
    }

    /// Wire slot for an array, ghost arrays included.
    pub fn slot_of(&self, name: &str, centering: Centering) -> Option<usize> {
        if name == GHOST_ARRAY_NAME {
            return match centering {
                Centering::Cell if self.num_ghost_cells > 0 => Some(self.cell_ghost_slot()),
                Centering::Point if self.num_ghost_nodes > 0 => Some(self.node_ghost_slot()),
                _ => None,
            };
        }
        self.array_index(name, centering)
    }

    /// Descriptor for every slot that carries data: arrays, then present ghosts.
    pub fn slots(&self) -> Vec<(usize, ArrayMetadata)> {
        let mut out: Vec<_> = self.arrays.iter().cloned().enumerate().collect();
        if self.num_ghost_cells > 0 {
            out.push((
                self.cell_ghost_slot(),
                ArrayMetadata::new(GHOST_ARRAY_NAME, Centering::Cell, 1, ScalarType::U8),
            ));
        }
        if self.num_ghost_nodes > 0 {
            out.push((
                self.node_ghost_slot(),
                ArrayMetadata::new(GHOST_ARRAY_NAME, Centering::Point, 1, ScalarType::U8),
            ));
        }
        out
    }

    /// Tuples of `centering` held by block `j`.
    pub fn block_tuples(&self, j: usize, centering: Centering) -> u64 {
        match centering {
            Centering::Point => self.block_num_points[j],
            Centering::Cell => self.block_num_cells[j],
        }
    }

    /// Point extent of block `j`, converted back from the stored cell extent.
    pub fn block_point_extent(&self, j: usize) -> [i32; 6] {
        let c = self.block_extents[j];
        [c[0], c[1] + 1, c[2], c[3] + 1, c[4], c[5] + 1]
    }

    /// Blocks owned by `rank`, in global order.
    pub fn blocks_of(&self, rank: usize) -> impl Iterator<Item = usize> + '_ {
        self.block_owner
            .iter()
            .enumerate()
            .filter(move |&(_, &o)| o == rank)
            .map(|(j, _)| j)
    }

    /// Check the per-block tables against each other and against a group of `group_size`.
    pub fn validate(&self, group_size: usize) -> Result<(), SchemaError> {
        let n = self.num_blocks;
        let lens = [
            ("block_ids", self.block_ids.len()),
            ("block_owner", self.block_owner.len()),
            ("block_num_points", self.block_num_points.len()),
            ("block_num_cells", self.block_num_cells.len()),
            ("block_cell_array_size", self.block_cell_array_size.len()),
            ("block_extents", self.block_extents.len()),
            ("block_bounds", self.block_bounds.len()),
        ];
        for (field, len) in lens {
            if len != n {
                return Err(SchemaError::InvalidMetadata(format!(
                    "mesh \"{}\": {field} has {len} entries for {n} blocks",
                    self.mesh_name
                )));
            }
        }
        if let Some((j, &o)) = self
            .block_owner
            .iter()
            .enumerate()
            .find(|&(_, &o)| o >= group_size)
        {
            return Err(SchemaError::InvalidMetadata(format!(
                "mesh \"{}\": block {j} owned by rank {o} outside a group of {group_size}",
                self.mesh_name
            )));
        }
        if !self.num_blocks_local.is_empty() {
            if self.num_blocks_local.len() != group_size {
                return Err(SchemaError::InvalidMetadata(format!(
                    "mesh \"{}\": num_blocks_local has {} entries for a group of {group_size}",
                    self.mesh_name,
                    self.num_blocks_local.len()
                )));
            }
            let total: usize = self.num_blocks_local.iter().sum();
            if total != n {
                return Err(SchemaError::InvalidMetadata(format!(
                    "mesh \"{}\": local block counts sum to {total}, expected {n}",
                    self.mesh_name
                )));
            }
        }
        Ok(())
    }

    /// Serialize into `blob`.
    pub fn to_blob(&self, blob: &mut BinaryBlob) {
        blob.pack_record(&WireHdr::new(KIND_MESH_METADATA));
        blob.pack_str(&self.mesh_name);
        blob.pack_u8(self.block_type.code());
        blob.pack_u8(self.coordinate_type.code());
        blob.pack_usize(self.num_blocks);
        let local: Vec<u64> = self.num_blocks_local.iter().map(|&n| n as u64).collect();
        blob.pack_u64_slice(&local);
        for e in self.extent {
            blob.pack_i32(e);
        }
        for b in self.bounds {
            blob.pack_f64(b);
        }
        blob.pack_u32(self.num_ghost_cells);
        blob.pack_u32(self.num_ghost_nodes);
        blob.pack_bool(self.global_view);
        blob.pack_u32(self.arrays.len() as u32);
        for a in &self.arrays {
            blob.pack_record(&WireArray::new(
                a.components,
                a.centering.code(),
                a.scalar.code(),
            ));
            blob.pack_str(&a.name);
        }
        for j in 0..self.num_blocks {
            blob.pack_record(&WireBlock::new(
                self.block_ids[j],
                self.block_owner[j],
                self.block_num_points[j],
                self.block_num_cells[j],
                self.block_cell_array_size[j],
                self.block_extents[j],
                self.block_bounds[j],
            ));
        }
    }

    /// Deserialize from `blob`'s read cursor.
    pub fn from_blob(blob: &mut BinaryBlob) -> Result<Self, SchemaError> {
        let hdr: WireHdr = blob.unpack_record()?;
        hdr.check(KIND_MESH_METADATA)
            .map_err(SchemaError::InvalidMetadata)?;
        let mesh_name = blob.unpack_string()?;
        let kind_code = blob.unpack_u8()?;
        let block_type = GeometryKind::from_code(kind_code).ok_or_else(|| {
            SchemaError::InvalidMetadata(format!("unknown geometry kind code {kind_code}"))
        })?;
        let coord_code = blob.unpack_u8()?;
        let coordinate_type = ScalarType::from_code(coord_code).ok_or_else(|| {
            SchemaError::InvalidMetadata(format!("unknown scalar type code {coord_code}"))
        })?;
        let mut md = MeshMetadata::new(mesh_name, block_type);
        md.coordinate_type = coordinate_type;
        md.num_blocks = blob.unpack_usize()?;
        md.num_blocks_local = blob
            .unpack_u64_vec()?
            .into_iter()
            .map(|n| n as usize)
            .collect();
        for e in md.extent.iter_mut() {
            *e = blob.unpack_i32()?;
        }
        for b in md.bounds.iter_mut() {
            *b = blob.unpack_f64()?;
        }
        md.num_ghost_cells = blob.unpack_u32()?;
        md.num_ghost_nodes = blob.unpack_u32()?;
        md.global_view = blob.unpack_bool()?;
        let n_arrays = blob.unpack_u32()? as usize;
        for _ in 0..n_arrays {
            let rec: WireArray = blob.unpack_record()?;
            let name = blob.unpack_string()?;
            let centering = Centering::from_code(rec.centering).ok_or_else(|| {
                SchemaError::InvalidMetadata(format!(
                    "array \"{name}\": unknown centering code {}",
                    rec.centering
                ))
            })?;
            let scalar = ScalarType::from_code(rec.scalar).ok_or_else(|| {
                SchemaError::InvalidMetadata(format!(
                    "array \"{name}\": unknown scalar type code {}",
                    rec.scalar
                ))
            })?;
            md.arrays
                .push(ArrayMetadata::new(name, centering, rec.components(), scalar));
        }
        let block_bytes = std::mem::size_of::<WireBlock>();
        if md.num_blocks > blob.remaining() / block_bytes {
            return Err(SchemaError::InvalidMetadata(format!(
                "mesh \"{}\" declares {} blocks but the blob holds {} bytes of block records",
                md.mesh_name,
                md.num_blocks,
                blob.remaining()
            )));
        }
        for _ in 0..md.num_blocks {
            let rec: WireBlock = blob.unpack_record()?;
            md.block_ids.push(rec.id());
            md.block_owner.push(rec.owner());
            md.block_num_points.push(rec.num_points());
            md.block_num_cells.push(rec.num_cells());
            md.block_cell_array_size.push(rec.cell_array_size());
            md.block_extents.push(rec.extent());
            md.block_bounds.push(rec.bounds());
        }
        Ok(md)
    }
}
