//! Top-level per-step schema: time, object count and every data object.

use crate::comm::Communicator;
use crate::data::{Centering, CompositeMesh, DataArray, ScalarType, TypedBuffer};
use crate::metadata::{MeshMetadata, MeshMetadataMap};
use crate::partition::{BlockPartitioner, Partitioner};
use crate::schema::{
    DataObjectCodec, GetContext, HandleArena, NUM_OBJECTS_PATH, PutContext, TIME_PATH,
    TIME_STEP_PATH, VersionCodec, get_value, put_value,
};
use crate::schema_error::SchemaError;
use crate::transport::{ReadEngine, VariableDecl, WriteEngine};

/// Substring marking a synthesized block-ownership array.
pub const BLOCK_OWNER_TAG: &str = "BlockOwner";

/// Prefix selecting the sender's ownership for a block-ownership array.
pub const SENDER_PREFIX: &str = "Sender";

/// Where a codec session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    MetadataKnown,
    Streaming,
    Closed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Unopened => "unopened",
            SessionState::MetadataKnown => "metadata-known",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
        }
    }
}

/// Session-scoped codec for a whole step of a stream.
///
/// Holds the sender metadata read from the stream, the receiver metadata the
/// consumer reads with, and the variable handles of the current definitions.
pub struct CollectionCodec {
    version: VersionCodec,
    objects: DataObjectCodec,
    sender: MeshMetadataMap,
    receiver: MeshMetadataMap,
    partitioner: Box<dyn Partitioner>,
    handles: HandleArena,
    state: SessionState,
}

impl Default for CollectionCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CollectionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionCodec")
            .field("state", &self.state)
            .field("objects", &self.sender.len())
            .field("partitioner", &self.partitioner.name())
            .finish()
    }
}

impl CollectionCodec {
    pub fn new() -> Self {
        Self {
            version: VersionCodec::default(),
            objects: DataObjectCodec::default(),
            sender: MeshMetadataMap::new(),
            receiver: MeshMetadataMap::new(),
            partitioner: Box::new(BlockPartitioner),
            handles: HandleArena::new(),
            state: SessionState::Unopened,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn require_open(&self, op: &'static str) -> Result<(), SchemaError> {
        if self.state == SessionState::Closed {
            return Err(SchemaError::InvalidState {
                op,
                state: self.state.as_str(),
            });
        }
        Ok(())
    }

    fn require_metadata(&self, op: &'static str) -> Result<(), SchemaError> {
        match self.state {
            SessionState::MetadataKnown | SessionState::Streaming => Ok(()),
            s => Err(SchemaError::InvalidState {
                op,
                state: s.as_str(),
            }),
        }
    }

    /// Strategy used when no receiver metadata was set for an object.
    pub fn set_partitioner(&mut self, partitioner: Box<dyn Partitioner>) {
        self.partitioner = partitioner;
    }

    pub fn partitioner(&self) -> &dyn Partitioner {
        self.partitioner.as_ref()
    }

    /// Declare every variable of a step. Collective: all ranks call it with the
    /// same metadata.
    pub fn define_variables(
        &mut self,
        engine: &mut dyn WriteEngine,
        comm: &dyn Communicator,
        metadata: &[MeshMetadata],
    ) -> Result<(), SchemaError> {
        self.require_open("define_variables")?;
        for (object, md) in metadata.iter().enumerate() {
            if !md.global_view {
                return Err(SchemaError::IncompleteMetadata {
                    object,
                    mesh: md.mesh_name.clone(),
                });
            }
            md.validate(comm.size())
                .map_err(|e| e.in_object(object, &md.mesh_name))?;
        }
        log::debug!("define {} objects on rank {}", metadata.len(), comm.rank());

        self.handles.clear();
        self.version.define_variables(&mut *engine)?;
        let scalars = [
            (TIME_STEP_PATH, ScalarType::U64),
            (TIME_PATH, ScalarType::F64),
            (NUM_OBJECTS_PATH, ScalarType::U32),
        ];
        for (path, scalar) in scalars {
            engine
                .define_variable(VariableDecl::scalar(path, scalar))
                .map_err(|e| SchemaError::write(path, e))?;
        }
        for (object, md) in metadata.iter().enumerate() {
            let mut ctx = PutContext {
                engine: &mut *engine,
                handles: &mut self.handles,
                rank: comm.rank(),
                object,
            };
            self.objects.define_variables(&mut ctx, md)?;
        }
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Stage the whole step. The engine flushes it at `end_step`.
    pub fn write(
        &mut self,
        engine: &mut dyn WriteEngine,
        comm: &dyn Communicator,
        time_step: u64,
        time: f64,
        metadata: &[MeshMetadata],
        objects: &[CompositeMesh],
    ) -> Result<(), SchemaError> {
        self.require_open("write")?;
        if metadata.len() != objects.len() {
            return Err(SchemaError::ObjectCountMismatch {
                objects: objects.len(),
                metadata: metadata.len(),
            });
        }
        let count = u32::try_from(objects.len()).map_err(|_| {
            SchemaError::InvalidMetadata(format!("{} objects exceed u32", objects.len()))
        })?;
        log::debug!("write step {time_step} (t = {time}) on rank {}", comm.rank());

        self.version.write(&mut *engine)?;
        put_value(&mut *engine, TIME_STEP_PATH, time_step)?;
        put_value(&mut *engine, TIME_PATH, time)?;
        put_value(&mut *engine, NUM_OBJECTS_PATH, count)?;
        for (object, (md, mesh)) in metadata.iter().zip(objects).enumerate() {
            let mut ctx = PutContext {
                engine: &mut *engine,
                handles: &mut self.handles,
                rank: comm.rank(),
                object,
            };
            self.objects.write(&mut ctx, md, mesh)?;
        }
        Ok(())
    }

    /// Whether the current step carries a version tag this codec accepts.
    pub fn can_read(&self, engine: &mut dyn ReadEngine) -> bool {
        self.version.read(engine).is_ok()
    }

    pub fn read_version(&self, engine: &mut dyn ReadEngine) -> Result<u32, SchemaError> {
        self.version.read(engine)
    }

    /// Read every object's sender metadata for the current step.
    ///
    /// Receiver metadata is reset to one unresolved entry per object.
    pub fn read_mesh_metadata(
        &mut self,
        engine: &mut dyn ReadEngine,
        comm: &dyn Communicator,
    ) -> Result<(), SchemaError> {
        self.require_open("read_mesh_metadata")?;
        let count: u32 = get_value(&mut *engine, NUM_OBJECTS_PATH)?;
        let count = count as usize;
        self.sender.clear();
        self.receiver.clear();
        for object in 0..count {
            let md = self.objects.read_metadata(&mut *engine, object, comm.rank())?;
            log::debug!(
                "object {object} \"{}\": {} blocks, {} arrays",
                md.mesh_name,
                md.num_blocks,
                md.num_arrays()
            );
            self.sender.push(md);
        }
        self.receiver.resize(count);
        self.state = SessionState::MetadataKnown;
        Ok(())
    }

    pub fn number_of_objects(&self) -> usize {
        self.sender.len()
    }

    pub fn object_id(&self, name: &str) -> Result<usize, SchemaError> {
        self.sender
            .mesh_id(name)
            .ok_or_else(|| SchemaError::UnknownMesh(name.to_owned()))
    }

    pub fn sender_mesh_metadata(&self, object: usize) -> Result<&MeshMetadata, SchemaError> {
        self.sender
            .get(object)
            .ok_or(SchemaError::UnknownObject(object))
    }

    /// Receiver metadata for `object`, if it has been set or computed.
    pub fn receiver_mesh_metadata(&self, object: usize) -> Result<&MeshMetadata, SchemaError> {
        if object >= self.receiver.len() {
            return Err(SchemaError::UnknownObject(object));
        }
        self.receiver
            .get(object)
            .ok_or(SchemaError::ReceiverMetadataUnset(object))
    }

    /// Dictate the receiver layout of `object` instead of partitioning.
    ///
    /// Only ownership may differ from the sender: owners must be ranks of
    /// `comm`, and every table the wire offsets are computed from must match
    /// what was written.
    pub fn set_receiver_mesh_metadata(
        &mut self,
        object: usize,
        md: MeshMetadata,
        comm: &dyn Communicator,
    ) -> Result<(), SchemaError> {
        let sender = self.sender_mesh_metadata(object)?;
        if md.num_blocks != sender.num_blocks {
            return Err(SchemaError::InvalidMetadata(format!(
                "receiver layout of \"{}\" has {} blocks, the sender wrote {}",
                sender.mesh_name, md.num_blocks, sender.num_blocks
            )));
        }
        md.validate(comm.size())?;
        check_same_shape(sender, &md)?;
        self.receiver.set(object, md)
    }

    /// Receiver metadata for `object`, partitioning the sender layout on first use.
    pub fn mesh_metadata(
        &mut self,
        object: usize,
        comm: &dyn Communicator,
    ) -> Result<&MeshMetadata, SchemaError> {
        if self.receiver.get(object).is_none() {
            let sender = self.sender_mesh_metadata(object)?;
            log::warn!(
                "no receiver layout for object {object} \"{}\", using the {} partitioner over {} ranks",
                sender.mesh_name,
                self.partitioner.name(),
                comm.size()
            );
            let md = self.partitioner.partition(sender, comm.size())?;
            self.receiver.set(object, md)?;
        }
        self.receiver
            .get(object)
            .ok_or(SchemaError::ReceiverMetadataUnset(object))
    }

    /// Read the geometry of mesh `name` under its receiver layout.
    pub fn read_object(
        &mut self,
        engine: &mut dyn ReadEngine,
        comm: &dyn Communicator,
        name: &str,
        structure_only: bool,
    ) -> Result<CompositeMesh, SchemaError> {
        self.require_metadata("read_object")?;
        let object = self.object_id(name)?;
        let md = self.mesh_metadata(object, comm)?.clone();
        let mut ctx = GetContext {
            engine,
            rank: comm.rank(),
            object,
        };
        let mesh = self.objects.read_mesh(&mut ctx, &md, structure_only)?;
        self.state = SessionState::Streaming;
        Ok(mesh)
    }

    /// Read array `array` of mesh `name` into `mesh`.
    ///
    /// Names containing [`BLOCK_OWNER_TAG`] are synthesized from metadata: each
    /// present block gets an `i32` array filled with its owner rank, taken from
    /// the sender layout when the name starts with [`SENDER_PREFIX`] and from
    /// the receiver layout otherwise.
    pub fn read_array(
        &mut self,
        engine: &mut dyn ReadEngine,
        comm: &dyn Communicator,
        name: &str,
        centering: Centering,
        array: &str,
        mesh: &mut CompositeMesh,
    ) -> Result<(), SchemaError> {
        self.require_metadata("read_array")?;
        let object = self.object_id(name)?;
        if array.contains(BLOCK_OWNER_TAG) {
            let md = if array.starts_with(SENDER_PREFIX) {
                self.sender_mesh_metadata(object)?
            } else {
                self.mesh_metadata(object, comm)?
            };
            return add_block_owner(md, centering, array, mesh);
        }
        let md = self.mesh_metadata(object, comm)?.clone();
        let mut ctx = GetContext {
            engine,
            rank: comm.rank(),
            object,
        };
        self.objects
            .read_array(&mut ctx, &md, array, centering, mesh)?;
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// `(time_step, time)` of the current step.
    pub fn read_time_step(&self, engine: &mut dyn ReadEngine) -> Result<(u64, f64), SchemaError> {
        let step: u64 = get_value(&mut *engine, TIME_STEP_PATH)?;
        let time: f64 = get_value(&mut *engine, TIME_PATH)?;
        Ok((step, time))
    }

    /// Forget every receiver layout of the current step.
    pub fn clear_receiver_metadata(&mut self) {
        let n = self.receiver.len();
        self.receiver.clear();
        self.receiver.resize(n);
    }

    /// Start a fresh session, keeping the partitioner.
    pub fn reset(&mut self) {
        self.handles.clear();
        self.sender.clear();
        self.receiver.clear();
        self.state = SessionState::Unopened;
    }

    /// Drop every handle and metadata table; the session cannot be used until reset.
    pub fn close(&mut self) {
        self.handles.clear();
        self.sender.clear();
        self.receiver.clear();
        self.state = SessionState::Closed;
    }
}

fn add_block_owner(
    md: &MeshMetadata,
    centering: Centering,
    array: &str,
    mesh: &mut CompositeMesh,
) -> Result<(), SchemaError> {
    for (j, block) in mesh.iter_mut() {
        let owner = *md.block_owner.get(j).ok_or_else(|| SchemaError::MissingBlock {
            mesh: md.mesh_name.clone(),
            block: j,
        })?;
        let tuples = md.block_tuples(j, centering) as usize;
        let owner = i32::try_from(owner).map_err(|_| {
            SchemaError::InvalidMetadata(format!("owner rank {owner} exceeds i32"))
        })?;
        block
            .attributes_mut()
            .get_mut(centering)
            .add(DataArray::new(array, 1, TypedBuffer::I32(vec![owner; tuples])));
    }
    Ok(())
}

/// Fields a receiver layout must share with the sender's.
fn check_same_shape(sender: &MeshMetadata, md: &MeshMetadata) -> Result<(), SchemaError> {
    let differs = |field: &str| {
        SchemaError::InvalidMetadata(format!(
            "receiver layout of \"{}\" changes {field}",
            sender.mesh_name
        ))
    };
    if md.block_type != sender.block_type {
        return Err(differs("the block type"));
    }
    if md.coordinate_type != sender.coordinate_type {
        return Err(differs("the coordinate type"));
    }
    if md.block_num_points != sender.block_num_points {
        return Err(differs("block_num_points"));
    }
    if md.block_num_cells != sender.block_num_cells {
        return Err(differs("block_num_cells"));
    }
    if md.block_cell_array_size != sender.block_cell_array_size {
        return Err(differs("block_cell_array_size"));
    }
    if md.block_extents != sender.block_extents {
        return Err(differs("block_extents"));
    }
    if md.arrays != sender.arrays
        || md.num_ghost_cells != sender.num_ghost_cells
        || md.num_ghost_nodes != sender.num_ghost_nodes
    {
        return Err(differs("the array list"));
    }
    Ok(())
}
