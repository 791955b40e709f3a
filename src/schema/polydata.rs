//! Polygonal blocks: four cell groups sent as one cell stream.
//!
//! Vertices, lines, polygons and strips are concatenated in that fixed order and
//! tagged [`CellType::Vertex`], [`CellType::Line`], [`CellType::Polygon`] and
//! [`CellType::TriangleStrip`]. Reading scans the tag stream for a contiguous run
//! of each tag in the same order; an empty group contributes an empty run.

use crate::data::{CellArray, CellType, CompositeMesh, GeometryKind, PolyData};
use crate::metadata::MeshMetadata;
use crate::schema::unstructured::{define_cell_streams, get_cell_streams, put_cell_streams};
use crate::schema::{GeometryCodec, GetContext, PutContext, polydata_block, polydata_block_mut};
use crate::schema_error::SchemaError;

const GROUP_TAGS: [CellType; 4] = [
    CellType::Vertex,
    CellType::Line,
    CellType::Polygon,
    CellType::TriangleStrip,
];

#[derive(Clone, Copy, Debug, Default)]
pub struct PolydataCellCodec;

/// Concatenate the four cell groups into one tag stream and one connectivity stream.
pub fn merge_polydata(pd: &PolyData) -> (Vec<u8>, Vec<i64>) {
    let groups = [&pd.verts, &pd.lines, &pd.polys, &pd.strips];
    let mut types = Vec::with_capacity(pd.num_cells());
    let mut conn = Vec::with_capacity(pd.cell_array_size());
    for (cells, tag) in groups.into_iter().zip(GROUP_TAGS) {
        types.extend(std::iter::repeat_n(tag.tag(), cells.num_cells()));
        conn.extend_from_slice(cells.data());
    }
    (types, conn)
}

/// Undo [`merge_polydata`], returning `[verts, lines, polys, strips]`.
///
/// Fails if the tag stream holds anything other than the four group runs in order.
pub fn split_polydata(types: &[u8], conn: &[i64]) -> Result<[CellArray; 4], SchemaError> {
    let mut groups: [CellArray; 4] = Default::default();
    let mut cell = 0usize;
    let mut pos = 0usize;
    for (group, tag) in groups.iter_mut().zip(GROUP_TAGS) {
        let run = types[cell..].iter().take_while(|&&t| t == tag.tag()).count();
        let start = pos;
        for i in 0..run {
            let count = conn.get(pos).copied().filter(|&n| n >= 0).ok_or_else(|| {
                SchemaError::InvalidMetadata(format!(
                    "polygonal cell {} at {pos} overruns {} connectivity entries",
                    cell + i,
                    conn.len()
                ))
            })?;
            pos += count as usize + 1;
        }
        let data = conn.get(start..pos).ok_or_else(|| {
            SchemaError::InvalidMetadata(format!(
                "polygonal group {tag:?} ends at {pos}, past {} connectivity entries",
                conn.len()
            ))
        })?;
        *group = CellArray::from_raw(run, data.to_vec())?;
        cell += run;
    }
    if cell != types.len() || pos != conn.len() {
        let stray = types.get(cell).copied().unwrap_or_default();
        return Err(SchemaError::InvalidMetadata(format!(
            "polygonal cell stream has {} unread cells (next tag {stray}) and {} unread entries",
            types.len() - cell,
            conn.len() - pos
        )));
    }
    Ok(groups)
}

impl GeometryCodec for PolydataCellCodec {
    fn applies_to(&self, kind: GeometryKind) -> bool {
        kind == GeometryKind::Polydata
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
            let pd = polydata_block(md, mesh, j)?;
            let (types, conn) = merge_polydata(pd);
            put_cell_streams(ctx, md, j, &types, &conn)?;
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
            let [verts, lines, polys, strips] = split_polydata(&types, &conn)?;
            let pd = polydata_block_mut(md, mesh, j)?;
            pd.verts = verts;
            pd.lines = lines;
            pd.polys = polys;
            pd.strips = strips;
        }
        Ok(())
    }
}
