//! One named mesh: metadata blob, geometry, then data arrays.

use crate::blob::BinaryBlob;
use crate::data::{Block, Centering, CompositeMesh};
use crate::metadata::MeshMetadata;
use crate::schema::{
    ArrayCodec, BinaryBlobCodec, GeometryCodec, GetContext, LogicallyCartesianCodec, PointCodec,
    PolydataCellCodec, PutContext, StretchedCartesianCodec, UniformCartesianCodec,
    UnstructuredCellCodec, object_path,
};
use crate::schema_error::SchemaError;
use crate::transport::{ReadEngine, Selection};

const METADATA: &str = "metadata";

/// Geometry codecs in wire order; each is a no-op for kinds it does not handle.
static GEOMETRY: [&dyn GeometryCodec; 6] = [
    &PointCodec,
    &UnstructuredCellCodec,
    &PolydataCellCodec,
    &UniformCartesianCodec,
    &StretchedCartesianCodec,
    &LogicallyCartesianCodec,
];

/// Composes the blob, geometry and array codecs for one object.
///
/// Any sub-codec failure aborts the object and comes back wrapped in
/// [`SchemaError::Object`] with the object id and mesh name.
#[derive(Clone, Copy, Debug, Default)]
pub struct DataObjectCodec {
    blob: BinaryBlobCodec,
    arrays: ArrayCodec,
}

impl DataObjectCodec {
    pub fn define_variables(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
    ) -> Result<(), SchemaError> {
        log::debug!("define object {} \"{}\"", ctx.object, md.mesh_name);
        let object = ctx.object;
        self.define_inner(ctx, md)
            .map_err(|e| e.in_object(object, &md.mesh_name))
    }

    fn define_inner(&self, ctx: &mut PutContext<'_>, md: &MeshMetadata) -> Result<(), SchemaError> {
        let path = ctx.path(METADATA);
        self.blob.define_variables(&mut *ctx.engine, &path)?;
        for codec in GEOMETRY {
            codec.define_variables(ctx, md)?;
        }
        self.arrays.define_variables(ctx, md)
    }

    pub fn write(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        log::debug!("write object {} \"{}\"", ctx.object, md.mesh_name);
        let object = ctx.object;
        self.write_inner(ctx, md, mesh)
            .map_err(|e| e.in_object(object, &md.mesh_name))
    }

    fn write_inner(
        &self,
        ctx: &mut PutContext<'_>,
        md: &MeshMetadata,
        mesh: &CompositeMesh,
    ) -> Result<(), SchemaError> {
        let mut blob = BinaryBlob::new();
        md.to_blob(&mut blob);
        let path = ctx.path(METADATA);
        self.blob.write(&mut *ctx.engine, &path, &blob)?;
        for codec in GEOMETRY {
            codec.write(ctx, md, mesh)?;
        }
        self.arrays.write(ctx, md, mesh)
    }

    /// Read the sender metadata of `object`.
    ///
    /// File engines hand back any writer's copy; streaming engines deliver
    /// writer blocks per reader, so rank `r` takes block `r % writers`.
    pub fn read_metadata(
        &self,
        engine: &mut dyn ReadEngine,
        object: usize,
        rank: usize,
    ) -> Result<MeshMetadata, SchemaError> {
        let path = object_path(object, METADATA);
        let selection = if engine.is_file_based() {
            Selection::All
        } else {
            let writers = engine
                .inquire(&path)
                .ok_or_else(|| SchemaError::MissingField(path.clone()))?
                .write_blocks()
                .max(1);
            Selection::WriteBlock(rank % writers)
        };
        let mut blob = self.blob.read(engine, &path, selection)?;
        MeshMetadata::from_blob(&mut blob)
    }

    /// An object with one empty block of the metadata's kind per block owned by
    /// `rank`; every other slot stays empty.
    pub fn initialize(&self, md: &MeshMetadata, rank: usize) -> CompositeMesh {
        let mut mesh = CompositeMesh::new(md.num_blocks);
        for j in md.blocks_of(rank) {
            mesh.set_block(j, Block::empty(md.block_type));
        }
        mesh
    }

    /// Materialize the locally owned blocks of an object and read its geometry.
    ///
    /// With `structure_only`, points and cell topology are skipped while extents,
    /// origins, spacings and axis coordinates are still read.
    pub fn read_mesh(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        structure_only: bool,
    ) -> Result<CompositeMesh, SchemaError> {
        log::debug!(
            "read object {} \"{}\" (structure only: {structure_only})",
            ctx.object,
            md.mesh_name
        );
        let mut mesh = self.initialize(md, ctx.rank);
        for codec in GEOMETRY {
            if structure_only && codec.is_topology() {
                continue;
            }
            codec
                .read(ctx, md, &mut mesh)
                .map_err(|e| e.in_object(ctx.object, &md.mesh_name))?;
        }
        Ok(mesh)
    }

    pub fn read_array(
        &self,
        ctx: &mut GetContext<'_>,
        md: &MeshMetadata,
        name: &str,
        centering: Centering,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError> {
        log::debug!(
            "read {centering} array \"{name}\" of object {} \"{}\"",
            ctx.object,
            md.mesh_name
        );
        let object = ctx.object;
        self.arrays
            .read(ctx, md, name, centering, mesh)
            .map_err(|e| e.in_object(object, &md.mesh_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeometryKind;
    use crate::metadata::BlockMetadata;
    use crate::metadata::MeshMetadataBuilder;

    #[test]
    fn initialize_allocates_owned_blocks_only() {
        let desc = BlockMetadata::describe(&Block::empty(GeometryKind::Polydata));
        let md = MeshMetadataBuilder::new("p", GeometryKind::Polydata)
            .block_metadata(0, 0, desc.clone())
            .block_metadata(1, 1, desc.clone())
            .block_metadata(2, 0, desc)
            .build(2)
            .unwrap();
        let mesh = DataObjectCodec::default().initialize(&md, 0);
        assert_eq!(mesh.len(), 3);
        assert!(mesh.block(0).is_some());
        assert!(mesh.block(1).is_none());
        assert_eq!(mesh.block(2).map(Block::kind), Some(GeometryKind::Polydata));
    }
}
