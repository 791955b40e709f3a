//! Index-space extents of structured blocks.

use crate::data::{CompositeMesh, GeometryKind, ScalarType};
use crate::metadata::MeshMetadata;
use crate::schema::{
    Field, GeometryCodec, GetContext, Layout, PutContext, owned_block, owned_block_mut, pod_bytes,
};
use crate::schema_error::SchemaError;

const LEAF: &str = "extent";

/// Six `i32` point-extent bounds per block, for every kind addressed by an extent.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogicallyCartesianCodec;

impl GeometryCodec for LogicallyCartesianCodec {
    fn applies_to(&self, kind: GeometryKind) -> bool {
        kind.has_extent()
    }

    fn define_owned(&self, ctx: &mut PutContext<'_>, md: &MeshMetadata) -> Result<(), SchemaError> {
        let path = ctx.path(LEAF);
        ctx.define_field(Field::Extent, &path, ScalarType::I32, &Layout::fixed(md, 6))
    }

    fn write_owned(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        let path = ctx.path(LEAF);
        for j in md.blocks_of(ctx.rank) {
            let extent = owned_block(md, mesh, j)?
                .extent()
                .ok_or_else(|| SchemaError::MissingField(format!("{path} (block {j})")))?;
            ctx.put_block(Field::Extent, &path, j, pod_bytes(&extent))?;
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
        for (j, bytes) in ctx.get_owned(&path, &Layout::fixed(md, 6))? {
            let extent: [i32; 6] = bytemuck::try_pod_read_unaligned(&bytes).map_err(|_| {
                SchemaError::InvalidMetadata(format!(
                    "{path} block {j}: {} bytes is not an extent",
                    bytes.len()
                ))
            })?;
            owned_block_mut(md, mesh, j)?.set_extent(extent);
        }
        Ok(())
    }
}
