//! Origin and spacing of uniform grids.

use crate::data::{CompositeMesh, GeometryKind, ScalarType};
use crate::metadata::MeshMetadata;
use crate::schema::{
    Field, GeometryCodec, GetContext, Layout, PutContext, image_block, image_block_mut, pod_bytes,
};
use crate::schema_error::SchemaError;
use hashbrown::HashMap;

const ORIGIN: &str = "origin";
const SPACING: &str = "spacing";

#[derive(Clone, Copy, Debug, Default)]
pub struct UniformCartesianCodec;

fn triple(path: &str, j: usize, bytes: &[u8]) -> Result<[f64; 3], SchemaError> {
    bytemuck::try_pod_read_unaligned(bytes).map_err(|_| {
        SchemaError::InvalidMetadata(format!("{path} block {j}: {} bytes is not 3 f64", bytes.len()))
    })
}

impl GeometryCodec for UniformCartesianCodec {
    fn applies_to(&self, kind: GeometryKind) -> bool {
        kind == GeometryKind::UniformCartesian
    }

    fn define_owned(&self, ctx: &mut PutContext<'_>, md: &MeshMetadata) -> Result<(), SchemaError> {
        let layout = Layout::fixed(md, 3);
        let origin = ctx.path(ORIGIN);
        ctx.define_field(Field::Origin, &origin, ScalarType::F64, &layout)?;
        let spacing = ctx.path(SPACING);
        ctx.define_field(Field::Spacing, &spacing, ScalarType::F64, &layout)
    }

    fn write_owned(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        let origin = ctx.path(ORIGIN);
        let spacing = ctx.path(SPACING);
        for j in md.blocks_of(ctx.rank) {
            let img = image_block(md, mesh, j)?;
            ctx.put_block(Field::Origin, &origin, j, pod_bytes(&img.origin))?;
            ctx.put_block(Field::Spacing, &spacing, j, pod_bytes(&img.spacing))?;
        }
        Ok(())
    }

    fn read_owned(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError> {
        let layout = Layout::fixed(md, 3);
        let origin = ctx.path(ORIGIN);
        let spacing = ctx.path(SPACING);
        let mut spacings: HashMap<usize, [f64; 3]> = HashMap::new();
        for (j, bytes) in ctx.get_owned(&spacing, &layout)? {
            spacings.insert(j, triple(&spacing, j, &bytes)?);
        }
        for (j, bytes) in ctx.get_owned(&origin, &layout)? {
            let o = triple(&origin, j, &bytes)?;
            let img = image_block_mut(md, mesh, j)?;
            img.origin = o;
            if let Some(s) = spacings.remove(&j) {
                img.spacing = s;
            }
        }
        Ok(())
    }
}
