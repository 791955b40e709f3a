//! Point- and cell-centered data arrays, ghost arrays included.

use crate::data::{Centering, CompositeMesh, DataArray, TypedBuffer};
use crate::metadata::{ArrayMetadata, MeshMetadata};
use crate::schema::{
    Field, GetContext, Layout, PutContext, array_path, buffer_bytes, owned_block,
    owned_block_mut,
};
use crate::schema_error::SchemaError;

/// Maps every array slot of a mesh onto `data_array_<slot>/data`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArrayCodec;

fn layout_of(md: &MeshMetadata, desc: &ArrayMetadata) -> Layout {
    let comps = desc.components as u64;
    Layout::from_metadata(md, |j| md.block_tuples(j, desc.centering) * comps)
}

impl ArrayCodec {
    pub fn define_variables(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
    ) -> Result<(), SchemaError> {
        for (slot, desc) in md.slots() {
            let path = array_path(ctx.object, slot);
            ctx.define_field(Field::Array(slot), &path, desc.scalar, &layout_of(md, &desc))?;
        }
        Ok(())
    }

    pub fn write(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        for (slot, desc) in md.slots() {
            let path = array_path(ctx.object, slot);
            for j in md.blocks_of(ctx.rank) {
                let block = owned_block(md, mesh, j)?;
                let array = block
                    .attributes()
                    .get(desc.centering)
                    .get(&desc.name)
                    .ok_or_else(|| SchemaError::ArrayNotFound {
                        mesh: md.mesh_name.clone(),
                        block: Some(j),
                        array: desc.name.clone(),
                        centering: desc.centering,
                    })?;
                if array.components != desc.components {
                    return Err(SchemaError::InvalidMetadata(format!(
                        "block {j} array \"{}\" has {} components, metadata declares {}",
                        desc.name, array.components, desc.components
                    )));
                }
                let what = format!("block {j} array \"{}\"", desc.name);
                let bytes = buffer_bytes(&array.values, desc.scalar, &what)?;
                ctx.put_block(Field::Array(slot), &path, j, bytes)?;
            }
        }
        Ok(())
    }

    /// Read one named array into every locally present block of `mesh`.
    pub fn read(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        name: &str,
        centering: Centering,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError> {
        let not_found = || SchemaError::ArrayNotFound {
            mesh: md.mesh_name.clone(),
            block: None,
            array: name.to_owned(),
            centering,
        };
        let slot = md.slot_of(name, centering).ok_or_else(not_found)?;
        let desc = md
            .slots()
            .into_iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, d)| d)
            .ok_or_else(not_found)?;
        let path = array_path(ctx.object, slot);
        for (j, bytes) in ctx.get_owned(&path, &layout_of(md, &desc))? {
            let values = TypedBuffer::from_bytes(desc.scalar, &bytes)?;
            let block = owned_block_mut(md, mesh, j)?;
            block
                .attributes_mut()
                .get_mut(centering)
                .add(DataArray::new(name, desc.components, values));
        }
        Ok(())
    }
}
