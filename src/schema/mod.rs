//! The wire schema: how composite meshes map onto transport variables.
//!
//! Every object `id` lives under its own namespace:
//!
//! ```text
//! DataObjectSchema                       u32 schema revision
//! time_step                              u64
//! time                                   f64
//! number_of_data_objects                 u32
//! data_object_<id>/metadata              u8 blob, one block per writer
//! data_object_<id>/points                coordinate type, 3 per point
//! data_object_<id>/cell_types            u8, 1 per cell
//! data_object_<id>/cell_array            i64, count-prefixed connectivity
//! data_object_<id>/extent                i32, 6 per block
//! data_object_<id>/origin|spacing        f64, 3 per block
//! data_object_<id>/x_coords|y_coords|z_coords
//! data_object_<id>/data_array_<n>/data
//! ```
//!
//! Per-block variables are global arrays; each block's offset comes from a
//! left-to-right scan over block sizes in global block order (see [`layout`]).

pub mod array;
pub mod binary_blob;
pub mod collection;
pub mod data_object;
pub mod handles;
pub mod input_stream;
pub mod layout;
pub mod logically_cartesian;
pub mod output_stream;
pub mod points;
pub mod polydata;
pub mod stretched_cartesian;
pub mod uniform_cartesian;
pub mod unstructured;
pub mod version;

pub use array::ArrayCodec;
pub use binary_blob::BinaryBlobCodec;
pub use collection::{CollectionCodec, SessionState};
pub use data_object::DataObjectCodec;
pub use handles::{Field, HandleArena};
pub use input_stream::InputStream;
pub use layout::{BlockSpan, Layout, offsets};
pub use logically_cartesian::LogicallyCartesianCodec;
pub use output_stream::OutputStream;
pub use points::PointCodec;
pub use polydata::{PolydataCellCodec, merge_polydata, split_polydata};
pub use stretched_cartesian::StretchedCartesianCodec;
pub use uniform_cartesian::UniformCartesianCodec;
pub use unstructured::UnstructuredCellCodec;
pub use version::{LOWEST_COMPATIBLE_REVISION, REVISION, VersionCodec};

use crate::data::{Block, CompositeMesh, GeometryKind, ScalarType, TypedBuffer};
use crate::metadata::MeshMetadata;
use crate::schema_error::SchemaError;
use crate::transport::{ReadEngine, Selection, VariableDecl, WriteEngine};
use bytemuck::Pod;
use bytes::Bytes;

pub const VERSION_PATH: &str = "DataObjectSchema";
pub const TIME_STEP_PATH: &str = "time_step";
pub const TIME_PATH: &str = "time";
pub const NUM_OBJECTS_PATH: &str = "number_of_data_objects";

/// `data_object_<id>/<leaf>`
pub fn object_path(object: usize, leaf: &str) -> String {
    format!("data_object_{object}/{leaf}")
}

/// `data_object_<id>/data_array_<slot>/data`
pub fn array_path(object: usize, slot: usize) -> String {
    format!("data_object_{object}/data_array_{slot}/data")
}

/// Write-side state a codec works against for one object.
pub struct PutContext<'a> {
    pub engine: &'a mut dyn WriteEngine,
    pub handles: &'a mut HandleArena,
    pub rank: usize,
    pub object: usize,
}

impl PutContext<'_> {
    pub fn path(&self, leaf: &str) -> String {
        object_path(self.object, leaf)
    }

    /// Declare one global array at `path`, one variable per locally owned block.
    pub fn define_field(
        &mut self,
        field: Field,
        path: &str,
        scalar: ScalarType,
        layout: &Layout,
    ) -> Result<(), SchemaError> {
        let mut ids = vec![None; layout.len()];
        for span in layout.owned_by(self.rank) {
            let decl =
                VariableDecl::global(path, scalar, span.len, layout.total(), span.offset);
            let id = self
                .engine
                .define_variable(decl)
                .map_err(|e| SchemaError::write(path, e))?;
            ids[span.block] = Some(id);
        }
        self.handles.insert(self.object, field, ids);
        Ok(())
    }

    /// Stage the bytes of block `block` of `field`.
    pub fn put_block(
        &mut self,
        field: Field,
        path: &str,
        block: usize,
        data: Bytes,
    ) -> Result<(), SchemaError> {
        let id = self
            .handles
            .get(self.object, field, block)
            .ok_or_else(|| SchemaError::MissingField(format!("{path} (block {block})")))?;
        log::trace!("put {path} block {block}: {} bytes", data.len());
        self.engine
            .put_deferred(id, data)
            .map_err(|e| SchemaError::write(path, e))
    }
}

/// Read-side state a codec works against for one object.
pub struct GetContext<'a> {
    pub engine: &'a mut dyn ReadEngine,
    pub rank: usize,
    pub object: usize,
}

impl GetContext<'_> {
    pub fn path(&self, leaf: &str) -> String {
        object_path(self.object, leaf)
    }

    /// Fetch the locally owned spans of `path` in one flush, in block order.
    pub fn get_owned(
        &mut self,
        path: &str,
        layout: &Layout,
    ) -> Result<Vec<(usize, Bytes)>, SchemaError> {
        let mut tickets = Vec::new();
        for span in layout.owned_by(self.rank) {
            let sel = Selection::Range {
                start: span.offset,
                count: span.len,
            };
            let t = self
                .engine
                .get_deferred(path, sel)
                .map_err(|e| SchemaError::read(path, e))?;
            tickets.push((span.block, t));
        }
        if tickets.is_empty() {
            return Ok(Vec::new());
        }
        let mut batch = self
            .engine
            .perform_gets()
            .map_err(|e| SchemaError::read(path, e))?;
        let mut out = Vec::with_capacity(tickets.len());
        for (block, t) in tickets {
            let bytes = batch.take(t).ok_or_else(|| SchemaError::MissingField(path.into()))?;
            log::trace!("get {path} block {block}: {} bytes", bytes.len());
            out.push((block, bytes));
        }
        Ok(out)
    }
}

/// Shape shared by every geometry codec. Operations are no-ops for meshes of
/// kinds the codec does not handle.
pub trait GeometryCodec: Sync {
    fn applies_to(&self, kind: GeometryKind) -> bool;

    /// Points and cell topology, skipped by structure-only reads.
    fn is_topology(&self) -> bool {
        false
    }

    fn define_owned(&self, ctx: &mut PutContext<'_>, md: &MeshMetadata) -> Result<(), SchemaError>;

    fn write_owned(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError>;

    fn read_owned(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError>;

    fn define_variables(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
    ) -> Result<(), SchemaError> {
        if self.applies_to(md.block_type) {
            self.define_owned(ctx, md)?;
        }
        Ok(())
    }

    fn write(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        if self.applies_to(md.block_type) {
            self.write_owned(ctx, md, mesh)?;
        }
        Ok(())
    }

    fn read(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError> {
        if self.applies_to(md.block_type) {
            self.read_owned(ctx, md, mesh)?;
        }
        Ok(())
    }
}

/// Block `j` of `mesh`, which must be present and of the metadata's kind.
pub(crate) fn owned_block<'m>(
    md: &MeshMetadata,
    mesh: &'m CompositeMesh,
    j: usize,
) -> Result<&'m Block, SchemaError> {
    let block = mesh.block(j).ok_or_else(|| SchemaError::MissingBlock {
        mesh: md.mesh_name.clone(),
        block: j,
    })?;
    check_kind(md, j, block)?;
    Ok(block)
}

pub(crate) fn owned_block_mut<'m>(
    md: &MeshMetadata,
    mesh: &'m mut CompositeMesh,
    j: usize,
) -> Result<&'m mut Block, SchemaError> {
    let block = mesh.block_mut(j).ok_or_else(|| SchemaError::MissingBlock {
        mesh: md.mesh_name.clone(),
        block: j,
    })?;
    check_kind(md, j, block)?;
    Ok(block)
}

fn check_kind(md: &MeshMetadata, j: usize, block: &Block) -> Result<(), SchemaError> {
    if block.kind() != md.block_type {
        return Err(kind_mismatch(md, j, md.block_type, block.kind()));
    }
    Ok(())
}

fn kind_mismatch(
    md: &MeshMetadata,
    j: usize,
    expected: GeometryKind,
    found: GeometryKind,
) -> SchemaError {
    SchemaError::BlockKindMismatch {
        mesh: md.mesh_name.clone(),
        block: j,
        expected,
        found,
    }
}

// Owned block `j` as its concrete grid type; any other kind is a mismatch.
macro_rules! typed_block {
    ($get:ident, $get_mut:ident, $variant:ident, $kind:ident, $ty:ty) => {
        pub(crate) fn $get<'m>(
            md: &MeshMetadata,
            mesh: &'m CompositeMesh,
            j: usize,
        ) -> Result<&'m $ty, SchemaError> {
            match owned_block(md, mesh, j)? {
                Block::$variant(b) => Ok(b),
                other => Err(kind_mismatch(md, j, GeometryKind::$kind, other.kind())),
            }
        }

        pub(crate) fn $get_mut<'m>(
            md: &MeshMetadata,
            mesh: &'m mut CompositeMesh,
            j: usize,
        ) -> Result<&'m mut $ty, SchemaError> {
            match owned_block_mut(md, mesh, j)? {
                Block::$variant(b) => Ok(b),
                other => Err(kind_mismatch(md, j, GeometryKind::$kind, other.kind())),
            }
        }
    };
}

typed_block!(
    unstructured_block,
    unstructured_block_mut,
    Unstructured,
    Unstructured,
    crate::data::UnstructuredGrid
);
typed_block!(
    polydata_block,
    polydata_block_mut,
    Polydata,
    Polydata,
    crate::data::PolyData
);
typed_block!(
    image_block,
    image_block_mut,
    Image,
    UniformCartesian,
    crate::data::ImageData
);
typed_block!(
    rectilinear_block,
    rectilinear_block_mut,
    Rectilinear,
    StretchedCartesian,
    crate::data::RectilinearGrid
);

/// Raw bytes of a typed buffer whose element type must be `scalar`.
pub(crate) fn buffer_bytes(
    buf: &TypedBuffer,
    scalar: ScalarType,
    what: &str,
) -> Result<Bytes, SchemaError> {
    if buf.scalar_type() != scalar {
        return Err(SchemaError::InvalidMetadata(format!(
            "{what} holds {} values, metadata declares {}",
            buf.scalar_type().as_str(),
            scalar.as_str()
        )));
    }
    Ok(Bytes::copy_from_slice(buf.as_bytes()))
}

pub(crate) fn pod_bytes<T: Pod>(v: &[T]) -> Bytes {
    Bytes::copy_from_slice(bytemuck::cast_slice(v))
}

/// Stage a put of a single value against an already declared scalar variable.
pub(crate) fn put_value<T: Pod>(
    engine: &mut dyn WriteEngine,
    path: &str,
    value: T,
) -> Result<(), SchemaError> {
    let id = engine
        .inquire_variable(path)
        .ok_or_else(|| SchemaError::MissingField(path.into()))?;
    engine
        .put_deferred(id, Bytes::copy_from_slice(bytemuck::bytes_of(&value)))
        .map_err(|e| SchemaError::write(path, e))
}

/// Read a single value from the current step.
pub(crate) fn get_value<T: Pod>(engine: &mut dyn ReadEngine, path: &str) -> Result<T, SchemaError> {
    if engine.inquire(path).is_none() {
        return Err(SchemaError::MissingField(path.into()));
    }
    let t = engine
        .get_deferred(path, Selection::All)
        .map_err(|e| SchemaError::read(path, e))?;
    let mut batch = engine
        .perform_gets()
        .map_err(|e| SchemaError::read(path, e))?;
    let bytes = batch
        .take(t)
        .ok_or_else(|| SchemaError::MissingField(path.into()))?;
    if bytes.len() != std::mem::size_of::<T>() {
        return Err(SchemaError::InvalidMetadata(format!(
            "\"{path}\" holds {} bytes, expected {}",
            bytes.len(),
            std::mem::size_of::<T>()
        )));
    }
    Ok(bytemuck::pod_read_unaligned(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ImageData;
    use crate::metadata::MeshMetadataBuilder;

    #[test]
    fn typed_blocks_check_presence_and_kind() {
        let img = Block::Image(ImageData {
            extent: [0, 2, 0, 1, 0, 1],
            ..Default::default()
        });
        let md = MeshMetadataBuilder::new("m", GeometryKind::UniformCartesian)
            .block(0, 0, &img)
            .block(1, 0, &img)
            .build(1)
            .unwrap();
        let mut mesh = CompositeMesh::new(2);
        mesh.set_block(0, img);

        image_block_mut(&md, &mut mesh, 0).unwrap().origin = [1.0, 2.0, 3.0];
        assert_eq!(image_block(&md, &mesh, 0).unwrap().origin, [1.0, 2.0, 3.0]);
        assert!(matches!(
            image_block(&md, &mesh, 1),
            Err(SchemaError::MissingBlock { block: 1, .. })
        ));
        assert!(matches!(
            rectilinear_block(&md, &mesh, 0),
            Err(SchemaError::BlockKindMismatch {
                block: 0,
                expected: GeometryKind::StretchedCartesian,
                found: GeometryKind::UniformCartesian,
                ..
            })
        ));
    }
}
