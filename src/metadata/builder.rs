//! Describing blocks and assembling a global-view [`MeshMetadata`].

use crate::data::{Block, Centering, CompositeMesh, GeometryKind, ScalarType};
use crate::metadata::mesh_metadata::{ArrayMetadata, EMPTY_EXTENT, GHOST_ARRAY_NAME, MeshMetadata};
use crate::schema_error::SchemaError;

/// Shape of a single block as it appears in mesh metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockMetadata {
    pub num_points: u64,
    pub num_cells: u64,
    pub cell_array_size: u64,
    /// Cell extent; [`EMPTY_EXTENT`] for kinds without an index space.
    pub extent: [i32; 6],
    pub bounds: [f64; 6],
}

impl BlockMetadata {
    pub fn describe(block: &Block) -> Self {
        let extent = match block.extent() {
            Some(p) => [p[0], p[1] - 1, p[2], p[3] - 1, p[4], p[5] - 1],
            None => EMPTY_EXTENT,
        };
        Self {
            num_points: block.num_points() as u64,
            num_cells: block.num_cells() as u64,
            cell_array_size: block.cell_array_size() as u64,
            extent,
            bounds: block.bounds(),
        }
    }
}

/// Descriptors of the arrays attached to `block`, ghost arrays excluded.
pub fn arrays_of(block: &Block) -> Vec<ArrayMetadata> {
    let attrs = block.attributes();
    [Centering::Point, Centering::Cell]
        .into_iter()
        .flat_map(|c| {
            attrs
                .get(c)
                .iter()
                .filter(|a| a.name != GHOST_ARRAY_NAME)
                .map(move |a| ArrayMetadata::new(&a.name, c, a.components, a.scalar_type()))
        })
        .collect()
}

/// Accumulates block descriptions from every rank and produces a global view.
///
/// ```
/// use mesh_transit::data::{Block, GeometryKind, ImageData};
/// use mesh_transit::metadata::MeshMetadataBuilder;
///
/// let block = Block::Image(ImageData { extent: [0, 4, 0, 4, 0, 0], ..Default::default() });
/// let md = MeshMetadataBuilder::new("grid", GeometryKind::UniformCartesian)
///     .block(0, 0, &block)
///     .build(1)
///     .unwrap();
/// assert_eq!(md.num_blocks, 1);
/// assert_eq!(md.block_num_cells, vec![16]);
/// assert!(md.global_view);
/// ```
#[derive(Clone, Debug)]
pub struct MeshMetadataBuilder {
    name: String,
    kind: GeometryKind,
    coordinate_type: Option<ScalarType>,
    arrays: Vec<ArrayMetadata>,
    ghost_cells: u32,
    ghost_nodes: u32,
    blocks: Vec<(usize, usize, BlockMetadata)>,
}

impl MeshMetadataBuilder {
    pub fn new(name: impl Into<String>, kind: GeometryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            coordinate_type: None,
            arrays: Vec::new(),
            ghost_cells: 0,
            ghost_nodes: 0,
            blocks: Vec::new(),
        }
    }

    /// Coordinate scalar type; inferred from the first block with points if unset.
    pub fn coordinate_type(mut self, scalar: ScalarType) -> Self {
        self.coordinate_type = Some(scalar);
        self
    }

    pub fn array(
        mut self,
        name: impl Into<String>,
        centering: Centering,
        components: usize,
        scalar: ScalarType,
    ) -> Self {
        self.arrays
            .push(ArrayMetadata::new(name, centering, components, scalar));
        self
    }

    pub fn ghost_cells(mut self, n: u32) -> Self {
        self.ghost_cells = n;
        self
    }

    pub fn ghost_nodes(mut self, n: u32) -> Self {
        self.ghost_nodes = n;
        self
    }

    /// Describe `block` with global id `id`, owned by `owner`.
    pub fn block(mut self, id: usize, owner: usize, block: &Block) -> Self {
        if self.coordinate_type.is_none() {
            self.coordinate_type = coordinate_type_of(block);
        }
        self.blocks.push((id, owner, BlockMetadata::describe(block)));
        self
    }

    pub fn block_metadata(mut self, id: usize, owner: usize, md: BlockMetadata) -> Self {
        self.blocks.push((id, owner, md));
        self
    }

    /// Describe every locally present block of `mesh` as owned by `owner`.
    ///
    /// Array descriptors and ghost flags are taken from the first block if none
    /// were declared explicitly.
    pub fn composite(mut self, owner: usize, mesh: &CompositeMesh) -> Self {
        for (id, block) in mesh.iter() {
            if self.arrays.is_empty() {
                self.arrays = arrays_of(block);
                let attrs = block.attributes();
                if attrs.cell_data.get(GHOST_ARRAY_NAME).is_some() {
                    self.ghost_cells = self.ghost_cells.max(1);
                }
                if attrs.point_data.get(GHOST_ARRAY_NAME).is_some() {
                    self.ghost_nodes = self.ghost_nodes.max(1);
                }
            }
            self = self.block(id, owner, block);
        }
        self
    }

    /// Assemble the global view for a group of `group_size` ranks.
    ///
    /// Block ids must cover `0..n` exactly once.
    pub fn build(mut self, group_size: usize) -> Result<MeshMetadata, SchemaError> {
        self.blocks.sort_by_key(|(id, _, _)| *id);
        for (expect, (id, _, _)) in self.blocks.iter().enumerate() {
            if *id != expect {
                return Err(SchemaError::InvalidMetadata(format!(
                    "mesh \"{}\": block ids are not contiguous (expected {expect}, found {id})",
                    self.name
                )));
            }
        }

        let mut md = MeshMetadata::new(self.name, self.kind);
        md.coordinate_type = self.coordinate_type.unwrap_or(ScalarType::F64);
        md.num_blocks = self.blocks.len();
        md.num_blocks_local = vec![0; group_size];
        md.arrays = self.arrays;
        md.num_ghost_cells = self.ghost_cells;
        md.num_ghost_nodes = self.ghost_nodes;

        let mut extent: Option<[i32; 6]> = None;
        for (id, owner, b) in self.blocks {
            if let Some(slot) = md.num_blocks_local.get_mut(owner) {
                *slot += 1;
            }
            md.block_ids.push(id);
            md.block_owner.push(owner);
            md.block_num_points.push(b.num_points);
            md.block_num_cells.push(b.num_cells);
            md.block_cell_array_size.push(b.cell_array_size);
            md.block_extents.push(b.extent);
            md.block_bounds.push(b.bounds);
            grow_bounds(&mut md.bounds, &b.bounds);
            if self.kind.has_extent() {
                extent = Some(match extent {
                    None => b.extent,
                    Some(e) => union_extent(e, b.extent),
                });
            }
        }
        md.extent = extent.unwrap_or(EMPTY_EXTENT);
        md.global_view = true;
        md.validate(group_size)?;
        Ok(md)
    }
}

fn coordinate_type_of(block: &Block) -> Option<ScalarType> {
    match block {
        Block::Rectilinear(r) => r.x_coords.as_ref().map(|c| c.scalar_type()),
        Block::Image(_) => None,
        _ => block.points().map(|p| p.scalar_type()),
    }
}

fn grow_bounds(acc: &mut [f64; 6], b: &[f64; 6]) {
    for axis in 0..3 {
        acc[2 * axis] = acc[2 * axis].min(b[2 * axis]);
        acc[2 * axis + 1] = acc[2 * axis + 1].max(b[2 * axis + 1]);
    }
}

fn union_extent(a: [i32; 6], b: [i32; 6]) -> [i32; 6] {
    [
        a[0].min(b[0]),
        a[1].max(b[1]),
        a[2].min(b[2]),
        a[3].max(b[3]),
        a[4].min(b[4]),
        a[5].max(b[5]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CellArray, DataArray, ImageData, TypedBuffer, UnstructuredGrid};

    fn tri() -> Block {
        let mut g = UnstructuredGrid {
            points: Some(TypedBuffer::F32(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])),
            cells: CellArray::from_cells([&[0i64, 1, 2][..]]),
            cell_types: vec![5],
            ..Default::default()
        };
        g.attributes
            .point_data
            .add(DataArray::new("t", 1, TypedBuffer::F64(vec![1.0, 2.0, 3.0])));
        g.attributes
            .cell_data
            .add(DataArray::new(GHOST_ARRAY_NAME, 1, TypedBuffer::U8(vec![0])));
        Block::Unstructured(g)
    }

    #[test]
    fn describe_unstructured() {
        let b = BlockMetadata::describe(&tri());
        assert_eq!(b.num_points, 3);
        assert_eq!(b.num_cells, 1);
        assert_eq!(b.cell_array_size, 4);
        assert_eq!(b.extent, EMPTY_EXTENT);
        assert_eq!(b.bounds, [0.0, 1.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn composite_infers_arrays_ghosts_and_coordinates() {
        let mut mesh = CompositeMesh::new(2);
        mesh.set_block(0, tri());
        mesh.set_block(1, tri());
        let md = MeshMetadataBuilder::new("tris", GeometryKind::Unstructured)
            .composite(0, &mesh)
            .build(2)
            .unwrap();
        assert_eq!(md.num_blocks, 2);
        assert_eq!(md.num_blocks_local, vec![2, 0]);
        assert_eq!(md.coordinate_type, ScalarType::F32);
        assert_eq!(md.arrays.len(), 1);
        assert_eq!(md.num_ghost_cells, 1);
        assert_eq!(md.num_ghost_nodes, 0);
    }

    #[test]
    fn image_extents_are_stored_as_cells_and_unioned() {
        let a = Block::Image(ImageData {
            extent: [0, 2, 0, 2, 0, 0],
            ..Default::default()
        });
        let b = Block::Image(ImageData {
            extent: [2, 4, 0, 2, 0, 0],
            ..Default::default()
        });
        let md = MeshMetadataBuilder::new("img", GeometryKind::UniformCartesian)
            .block(1, 1, &b)
            .block(0, 0, &a)
            .build(2)
            .unwrap();
        assert_eq!(md.block_extents[0], [0, 1, 0, 1, 0, -1]);
        assert_eq!(md.extent, [0, 3, 0, 1, 0, -1]);
        assert_eq!(md.block_point_extent(1), [2, 4, 0, 2, 0, 0]);
    }

    #[test]
    fn gaps_in_block_ids_are_rejected() {
        let r = MeshMetadataBuilder::new("x", GeometryKind::Unstructured)
            .block(1, 0, &tri())
            .build(1);
        assert!(matches!(r, Err(SchemaError::InvalidMetadata(_))));
    }
}
