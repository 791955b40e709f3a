//! Explicit point coordinates.

use crate::data::{CompositeMesh, GeometryKind, TypedBuffer};
use crate::metadata::MeshMetadata;
use crate::schema::{
    Field, GeometryCodec, GetContext, Layout, PutContext, buffer_bytes, owned_block,
    owned_block_mut,
};
use crate::schema_error::SchemaError;

const LEAF: &str = "points";

/// Flat xyz coordinates, three values per point in the mesh's coordinate type.
#[derive(Clone, Copy, Debug, Default)]
pub struct PointCodec;

fn layout(md: &MeshMetadata) -> Layout {
    Layout::from_metadata(md, |j| md.block_num_points[j] * 3)
}

impl GeometryCodec for PointCodec {
    fn applies_to(&self, kind: GeometryKind) -> bool {
        kind.has_points()
    }

    fn is_topology(&self) -> bool {
        true
    }

    fn define_owned(&self, ctx: &mut PutContext<'_>, md: &MeshMetadata) -> Result<(), SchemaError> {
        let path = ctx.path(LEAF);
        ctx.define_field(Field::Points, &path, md.coordinate_type, &layout(md))
    }

    fn write_owned(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        let path = ctx.path(LEAF);
        for j in md.blocks_of(ctx.rank) {
            let block = owned_block(md, mesh, j)?;
            let bytes = match block.points() {
                Some(p) => buffer_bytes(p, md.coordinate_type, &format!("block {j} points"))?,
                // a block with no points at all is legitimate when metadata agrees
                None if md.block_num_points[j] == 0 => bytes::Bytes::new(),
                None => return Err(SchemaError::MissingField(format!("{path} (block {j})"))),
            };
            ctx.put_block(Field::Points, &path, j, bytes)?;
        }
        Ok(())
    }

    fn read_owned(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError> {
        let path = ctx.path(LEAF);
        for (j, bytes) in ctx.get_owned(&path, &layout(md))? {
            let points = TypedBuffer::from_bytes(md.coordinate_type, &bytes)?;
            owned_block_mut(md, mesh, j)?.set_points(points);
        }
        Ok(())
    }
}
