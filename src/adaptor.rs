//! Consumer façade: one stream, one codec session, read step by step.
//!
//! ```
//! use std::sync::Arc;
//! use mesh_transit::adaptor::InTransitDataAdaptor;
//! use mesh_transit::comm::NoComm;
//! use mesh_transit::transport::MemoryHub;
//!
//! let hub = Arc::new(MemoryHub::new());
//! let mut adaptor = InTransitDataAdaptor::new(hub, Arc::new(NoComm));
//! adaptor.set_file_name("nothing-here.bp");
//! // no writer ever opened the stream
//! assert!(adaptor.open_stream().is_err());
//! assert!(!adaptor.stream_good());
//! ```

use crate::comm::Communicator;
use crate::config::StreamConfig;
use crate::data::{Centering, CompositeMesh};
use crate::metadata::{GHOST_ARRAY_NAME, MeshMetadata};
use crate::partition::Partitioner;
use crate::schema::{CollectionCodec, InputStream};
use crate::schema_error::SchemaError;
use crate::transport::TransportFactory;
use std::sync::Arc;

fn logged<T>(op: &str, r: Result<T, SchemaError>) -> Result<T, SchemaError> {
    r.inspect_err(|e| log::error!("{op} failed: {e}"))
}

/// Reads meshes and arrays from a stream written by an
/// [`OutputStream`](crate::schema::OutputStream).
pub struct InTransitDataAdaptor {
    comm: Arc<dyn Communicator>,
    stream: InputStream,
    codec: CollectionCodec,
    file_name: String,
    time: f64,
    time_step: u64,
}

impl std::fmt::Debug for InTransitDataAdaptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InTransitDataAdaptor")
            .field("stream", &self.stream)
            .field("codec", &self.codec)
            .field("time_step", &self.time_step)
            .finish()
    }
}

impl InTransitDataAdaptor {
    pub fn new(factory: Arc<dyn TransportFactory>, comm: Arc<dyn Communicator>) -> Self {
        Self {
            comm,
            stream: InputStream::new(factory),
            codec: CollectionCodec::new(),
            file_name: String::new(),
            time: 0.0,
            time_step: 0,
        }
    }

    /// Apply a stream configuration: file name, engine and partitioner.
    pub fn configure(&mut self, cfg: &StreamConfig) -> Result<(), SchemaError> {
        logged("configure", self.stream.set_read_engine(&cfg.engine))?;
        self.file_name.clone_from(&cfg.file_name);
        self.codec.set_partitioner(cfg.partitioner.build());
        Ok(())
    }

    pub fn set_file_name(&mut self, file_name: impl Into<String>) {
        self.file_name = file_name.into();
    }

    pub fn set_read_engine(&mut self, engine: &str) -> Result<(), SchemaError> {
        logged("set_read_engine", self.stream.set_read_engine(engine))
    }

    pub fn set_partitioner(&mut self, partitioner: Box<dyn Partitioner>) {
        self.codec.set_partitioner(partitioner);
    }

    /// Open the stream, check its schema revision and read the first step's
    /// time and metadata.
    pub fn open_stream(&mut self) -> Result<(), SchemaError> {
        let r = self.open_inner();
        if r.is_err() {
            self.stream.close();
        }
        logged("open_stream", r)
    }

    fn open_inner(&mut self) -> Result<(), SchemaError> {
        self.codec.reset();
        self.stream.open(&*self.comm, &self.file_name)?;
        let engine = self.stream.engine_mut("open_stream")?;
        let revision = self.codec.read_version(engine)?;
        log::debug!("\"{}\" carries schema revision {revision}", self.file_name);
        self.read_step()
    }

    fn read_step(&mut self) -> Result<(), SchemaError> {
        let engine = self.stream.engine_mut("read_step")?;
        let (time_step, time) = self.codec.read_time_step(&mut *engine)?;
        self.codec.read_mesh_metadata(engine, &*self.comm)?;
        self.time_step = time_step;
        self.time = time;
        Ok(())
    }

    /// Move to the next step and read its time and metadata. Any failure
    /// closes the stream.
    pub fn advance_stream(&mut self) -> Result<(), SchemaError> {
        logged("advance_stream", self.stream.advance_time_step())?;
        let r = self.read_step();
        if r.is_err() {
            self.stream.close();
        }
        logged("advance_stream", r)
    }

    pub fn close_stream(&mut self) {
        self.stream.close();
        self.codec.close();
    }

    pub fn stream_good(&self) -> bool {
        self.stream.good()
    }

    pub fn data_time(&self) -> f64 {
        self.time
    }

    pub fn data_time_step(&self) -> u64 {
        self.time_step
    }

    pub fn number_of_meshes(&self) -> usize {
        self.codec.number_of_objects()
    }

    /// Receiver metadata of mesh `id`, partitioned on first use.
    pub fn mesh_metadata(&mut self, id: usize) -> Result<&MeshMetadata, SchemaError> {
        let comm = Arc::clone(&self.comm);
        logged("mesh_metadata", self.codec.mesh_metadata(id, &*comm))
    }

    pub fn mesh_metadata_by_name(&mut self, name: &str) -> Result<&MeshMetadata, SchemaError> {
        let id = logged("mesh_metadata_by_name", self.codec.object_id(name))?;
        self.mesh_metadata(id)
    }

    pub fn sender_mesh_metadata(&self, id: usize) -> Result<&MeshMetadata, SchemaError> {
        logged("sender_mesh_metadata", self.codec.sender_mesh_metadata(id))
    }

    pub fn set_receiver_mesh_metadata(
        &mut self,
        id: usize,
        md: MeshMetadata,
    ) -> Result<(), SchemaError> {
        logged(
            "set_receiver_mesh_metadata",
            self.codec.set_receiver_mesh_metadata(id, md, &*self.comm),
        )
    }

    /// Read the locally owned blocks of mesh `name`.
    pub fn mesh(&mut self, name: &str, structure_only: bool) -> Result<CompositeMesh, SchemaError> {
        let engine = logged("mesh", self.stream.engine_mut("mesh"))?;
        logged(
            "mesh",
            self.codec
                .read_object(engine, &*self.comm, name, structure_only),
        )
    }

    /// Read array `array` of mesh `name` into `mesh`.
    pub fn add_array(
        &mut self,
        mesh: &mut CompositeMesh,
        name: &str,
        centering: Centering,
        array: &str,
    ) -> Result<(), SchemaError> {
        let engine = logged("add_array", self.stream.engine_mut("add_array"))?;
        logged(
            "add_array",
            self.codec
                .read_array(engine, &*self.comm, name, centering, array, mesh),
        )
    }

    pub fn add_arrays(
        &mut self,
        mesh: &mut CompositeMesh,
        name: &str,
        centering: Centering,
        arrays: &[&str],
    ) -> Result<(), SchemaError> {
        for array in arrays {
            self.add_array(mesh, name, centering, array)?;
        }
        Ok(())
    }

    pub fn add_ghost_cells_array(
        &mut self,
        mesh: &mut CompositeMesh,
        name: &str,
    ) -> Result<(), SchemaError> {
        self.add_array(mesh, name, Centering::Cell, GHOST_ARRAY_NAME)
    }

    pub fn add_ghost_nodes_array(
        &mut self,
        mesh: &mut CompositeMesh,
        name: &str,
    ) -> Result<(), SchemaError> {
        self.add_array(mesh, name, Centering::Point, GHOST_ARRAY_NAME)
    }

    /// Forget the receiver layouts of the current step; the next read lays the
    /// meshes out again.
    pub fn release_data(&mut self) {
        self.codec.clear_receiver_metadata();
    }
}
