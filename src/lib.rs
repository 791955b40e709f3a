#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-transit
//!
//! mesh-transit moves block-structured meshes between a producer process group and
//! a consumer process group through a step-based transport. Every step carries a
//! schema revision tag, the simulation time, and one self-describing data object
//! per named mesh: a serialized metadata blob followed by geometry and arrays laid
//! out as global arrays addressed by per-block offsets.
//!
//! ## Features
//! - Five geometry kinds: unstructured, polygonal, uniform, stretched and
//!   logically Cartesian blocks
//! - Point and cell arrays of any [`ScalarType`](data::ScalarType), plus ghost arrays
//! - Receiver-side repartitioning through pluggable [`Partitioner`](partition::Partitioner)s
//! - An in-process [`MemoryHub`](transport::MemoryHub) transport with file-based and
//!   streaming engine semantics, so multi-rank sessions can be tested in one process
//! - MPI process groups behind the `mpi-support` feature
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use mesh_transit::prelude::*;
//!
//! let hub = Arc::new(MemoryHub::new());
//! let block = Block::Image(ImageData { extent: [0, 2, 0, 2, 0, 0], ..Default::default() });
//! let mesh = CompositeMesh::from_blocks(vec![Some(block)]);
//! let md = MeshMetadataBuilder::new("grid", GeometryKind::UniformCartesian)
//!     .composite(0, &mesh)
//!     .build(1)
//!     .unwrap();
//!
//! let mut out = OutputStream::new(hub.clone());
//! out.open(&NoComm, "sim").unwrap();
//! out.write_step(&NoComm, 7, 0.5, &[md], &[mesh]).unwrap();
//! out.close().unwrap();
//!
//! let mut adaptor = InTransitDataAdaptor::new(hub, Arc::new(NoComm));
//! adaptor.set_file_name("sim");
//! adaptor.open_stream().unwrap();
//! assert_eq!(adaptor.data_time_step(), 7);
//! let back = adaptor.mesh("grid", false).unwrap();
//! assert_eq!(back.block(0).and_then(Block::extent), Some([0, 2, 0, 2, 0, 0]));
//! ```

pub mod adaptor;
pub mod blob;
pub mod comm;
pub mod config;
pub mod data;
pub mod metadata;
pub mod partition;
pub mod schema;
pub mod schema_error;
pub mod transport;
pub mod wire;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::adaptor::InTransitDataAdaptor;
    pub use crate::blob::BinaryBlob;
    pub use crate::comm::{Communicator, LocalComm, NoComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::config::{PartitionerKind, StreamConfig};
    pub use crate::data::{
        Block, CellArray, CellType, Centering, CompositeMesh, DataArray, GeometryKind,
        ImageData, PolyData, RectilinearGrid, ScalarType, StructuredGrid, TypedBuffer,
        UnstructuredGrid,
    };
    pub use crate::metadata::{MeshMetadata, MeshMetadataBuilder};
    pub use crate::partition::{BlockPartitioner, Partitioner};
    pub use crate::schema::{CollectionCodec, InputStream, OutputStream};
    pub use crate::schema_error::SchemaError;
    pub use crate::transport::{MemoryHub, ReadEngine, TransportFactory, WriteEngine};
}
