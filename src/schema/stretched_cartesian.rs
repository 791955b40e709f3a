//! Per-axis coordinates of stretched (rectilinear) grids.
//!
//! Each axis is its own global array. Block `j` contributes
//! `extent[hi] - extent[lo] + 2` values along an axis, where the extent is the
//! cell extent recorded in the metadata.

use crate::data::{CompositeMesh, GeometryKind, TypedBuffer};
use crate::metadata::MeshMetadata;
use crate::schema::{
    Field, GeometryCodec, GetContext, Layout, PutContext, buffer_bytes, rectilinear_block,
    rectilinear_block_mut,
};
use crate::schema_error::SchemaError;

const AXES: [(Field, &str); 3] = [
    (Field::XCoords, "x_coords"),
    (Field::YCoords, "y_coords"),
    (Field::ZCoords, "z_coords"),
];

#[derive(Clone, Copy, Debug, Default)]
pub struct StretchedCartesianCodec;

/// Coordinates along `axis` of block `j`; zero for blocks without points.
pub(crate) fn axis_len(md: &MeshMetadata, j: usize, axis: usize) -> u64 {
    if md.block_num_points[j] == 0 {
        return 0;
    }
    let c = md.block_extents[j];
    (i64::from(c[2 * axis + 1]) - i64::from(c[2 * axis]) + 2).max(0) as u64
}

fn axis_layout(md: &MeshMetadata, axis: usize) -> Layout {
    Layout::from_metadata(md, |j| axis_len(md, j, axis))
}

impl GeometryCodec for StretchedCartesianCodec {
    fn applies_to(&self, kind: GeometryKind) -> bool {
        kind == GeometryKind::StretchedCartesian
    }

    fn define_owned(&self, ctx: &mut PutContext<'_>, md: &MeshMetadata) -> Result<(), SchemaError> {
        for (axis, (field, leaf)) in AXES.into_iter().enumerate() {
            let path = ctx.path(leaf);
            ctx.define_field(field, &path, md.coordinate_type, &axis_layout(md, axis))?;
        }
        Ok(())
    }

    fn write_owned(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        for j in md.blocks_of(ctx.rank) {
            let grid = rectilinear_block(md, mesh, j)?;
            let coords = [&grid.x_coords, &grid.y_coords, &grid.z_coords];
            for (axis, (field, leaf)) in AXES.into_iter().enumerate() {
                let path = ctx.path(leaf);
                let bytes = match coords[axis] {
                    Some(c) => buffer_bytes(c, md.coordinate_type, &format!("block {j} {leaf}"))?,
                    None if axis_len(md, j, axis) == 0 => bytes::Bytes::new(),
                    None => return Err(SchemaError::MissingField(format!("{path} (block {j})"))),
                };
                ctx.put_block(field, &path, j, bytes)?;
            }
        }
        Ok(())
    }

    fn read_owned(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError> {
        for (axis, (_, leaf)) in AXES.into_iter().enumerate() {
            let path = ctx.path(leaf);
            for (j, bytes) in ctx.get_owned(&path, &axis_layout(md, axis))? {
                let coords = TypedBuffer::from_bytes(md.coordinate_type, &bytes)?;
                let grid = rectilinear_block_mut(md, mesh, j)?;
                let slot = match axis {
                    0 => &mut grid.x_coords,
                    1 => &mut grid.y_coords,
                    _ => &mut grid.z_coords,
                };
                *slot = Some(coords);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Block, RectilinearGrid};
    use crate::metadata::MeshMetadataBuilder;

    #[test]
    fn axis_lengths_follow_cell_extents() {
        let grid = RectilinearGrid {
            extent: [0, 3, 0, 1, 0, 0],
            x_coords: Some(TypedBuffer::F64(vec![0.0, 1.0, 3.0, 7.0])),
            y_coords: Some(TypedBuffer::F64(vec![0.0, 1.0])),
            z_coords: Some(TypedBuffer::F64(vec![0.0])),
            ..Default::default()
        };
        let md = MeshMetadataBuilder::new("r", GeometryKind::StretchedCartesian)
            .block(0, 0, &Block::Rectilinear(grid))
            .build(1)
            .unwrap();
        assert_eq!(md.block_extents[0], [0, 2, 0, 0, 0, -1]);
        assert_eq!(
            [axis_len(&md, 0, 0), axis_len(&md, 0, 1), axis_len(&md, 0, 2)],
            [4, 2, 1]
        );
    }
}
