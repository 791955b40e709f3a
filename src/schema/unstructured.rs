//! Cell types and connectivity of unstructured blocks.

use crate::data::scalar::decode;
use crate::data::{CellArray, CompositeMesh, GeometryKind, ScalarType};
use crate::metadata::MeshMetadata;
use crate::schema::{
    Field, GeometryCodec, GetContext, Layout, PutContext, pod_bytes, unstructured_block,
    unstructured_block_mut,
};
use crate::schema_error::SchemaError;
use hashbrown::HashMap;

pub(crate) const CELL_TYPES: &str = "cell_types";
pub(crate) const CELL_ARRAY: &str = "cell_array";

#[derive(Clone, Copy, Debug, Default)]
pub struct UnstructuredCellCodec;

pub(crate) fn type_layout(md: &MeshMetadata) -> Layout {
    Layout::from_metadata(md, |j| md.block_num_cells[j])
}

pub(crate) fn conn_layout(md: &MeshMetadata) -> Layout {
    Layout::from_metadata(md, |j| md.block_cell_array_size[j])
}

/// Define both cell streams of an object; shared with the polygonal codec.
pub(crate) fn define_cell_streams(
    ctx: &mut PutContext<'_>,
    md: &MeshMetadata,
) -> Result<(), SchemaError> {
    let types = ctx.path(CELL_TYPES);
    ctx.define_field(Field::CellTypes, &types, ScalarType::U8, &type_layout(md))?;
    let conn = ctx.path(CELL_ARRAY);
    ctx.define_field(Field::CellArray, &conn, ScalarType::I64, &conn_layout(md))
}

/// Stage one block's cell streams, checking their lengths against the metadata.
pub(crate) fn put_cell_streams(
    ctx: &mut PutContext<'_>,
    md: &MeshMetadata,
    j: usize,
    types: &[u8],
    conn: &[i64],
) -> Result<(), SchemaError> {
    if types.len() as u64 != md.block_num_cells[j]
        || conn.len() as u64 != md.block_cell_array_size[j]
    {
        return Err(SchemaError::InvalidMetadata(format!(
            "block {j} has {} cells and {} connectivity entries, metadata declares {} and {}",
            types.len(),
            conn.len(),
            md.block_num_cells[j],
            md.block_cell_array_size[j]
        )));
    }
    let types_path = ctx.path(CELL_TYPES);
    ctx.put_block(Field::CellTypes, &types_path, j, pod_bytes(types))?;
    let conn_path = ctx.path(CELL_ARRAY);
    ctx.put_block(Field::CellArray, &conn_path, j, pod_bytes(conn))
}

/// Fetch both cell streams of every owned block, keyed by block.
pub(crate) fn get_cell_streams(
    ctx: &mut GetContext<'_>,
    md: &MeshMetadata,
) -> Result<Vec<(usize, Vec<u8>, Vec<i64>)>, SchemaError> {
    let types_path = ctx.path(CELL_TYPES);
    let types = ctx.get_owned(&types_path, &type_layout(md))?;
    let conn_path = ctx.path(CELL_ARRAY);
    let mut conn: HashMap<usize, Vec<i64>> = ctx
        .get_owned(&conn_path, &conn_layout(md))?
        .into_iter()
        .map(|(j, b)| (j, decode::<i64>(&b)))
        .collect();
    types
        .into_iter()
        .map(|(j, t)| {
            let c = conn
                .remove(&j)
                .ok_or_else(|| SchemaError::MissingField(format!("{conn_path} (block {j})")))?;
            Ok((j, t.to_vec(), c))
        })
        .collect()
}

impl GeometryCodec for UnstructuredCellCodec {
    fn applies_to(&self, kind: GeometryKind) -> bool {
        kind == GeometryKind::Unstructured
    }

    fn is_topology(&self) -> bool {
        true
    }

    fn define_owned(&self, ctx: &mut PutContext<'_>, md: &MeshMetadata) -> Result<(), SchemaError> {
        define_cell_streams(ctx, md)
    }

    fn write_owned(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        for j in md.blocks_of(ctx.rank) {
            let grid = unstructured_block(md, mesh, j)?;
            put_cell_streams(ctx, md, j, &grid.cell_types, grid.cells.data())?;
        }
        Ok(())
    }

    fn read_owned(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError> {
        for (j, types, conn) in get_cell_streams(ctx, md)? {
            let cells = CellArray::from_raw(types.len(), conn)?;
            let grid = unstructured_block_mut(md, mesh, j)?;
            grid.cell_types = types;
            grid.cells = cells;
        }
        Ok(())
    }
}
