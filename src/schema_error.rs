//! SchemaError: unified error type for the mesh-transit public APIs.
//!
//! Every codec operation returns a `Result<_, SchemaError>`; nothing in the
//! library panics on malformed streams or inconsistent metadata.

use crate::data::{Centering, GeometryKind};
use crate::partition::PartitionError;
use crate::transport::TransportError;
use thiserror::Error;

/// Unified error type for schema, codec and stream operations.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The stream carries no schema version tag; it was not produced by this schema.
    #[error("stream was not produced by this schema (no version tag)")]
    NotThisFormat,
    /// The version tag is present but older than the oldest revision we can interpret.
    #[error("schema revision {found} is older than the lowest compatible revision {lowest}")]
    IncompatibleSchema { found: u32, lowest: u32 },
    /// Wire variables cannot be declared without a global view of the metadata.
    #[error("object {object} \"{mesh}\": a global view of the metadata is required")]
    IncompleteMetadata { object: usize, mesh: String },
    /// The object list and metadata list handed to a write differ in length.
    #[error("{objects} data objects but {metadata} metadata entries")]
    ObjectCountMismatch { objects: usize, metadata: usize },
    /// No object with this mesh name is present in the sender metadata.
    #[error("no mesh named \"{0}\" in the stream")]
    UnknownMesh(String),
    /// No object with this id is present in the sender metadata.
    #[error("no data object with id {0}")]
    UnknownObject(usize),
    /// A block lacks a data array, or the metadata does not describe it at all.
    #[error(
        "mesh \"{mesh}\"{}: no {centering} data array \"{array}\"",
        .block.map(|b| format!(" block {b}")).unwrap_or_default()
    )]
    ArrayNotFound {
        mesh: String,
        block: Option<usize>,
        array: String,
        centering: Centering,
    },
    /// The transport failed to deliver data for `path`.
    #[error("failed to read \"{path}\"")]
    TransportRead {
        path: String,
        #[source]
        source: TransportError,
    },
    /// The transport refused data for `path`.
    #[error("failed to write \"{path}\"")]
    TransportWrite {
        path: String,
        #[source]
        source: TransportError,
    },
    /// An expected variable is absent from the stream.
    #[error("stream is missing \"{0}\"")]
    MissingField(String),
    /// A locally owned block is absent from the composite object.
    #[error("mesh \"{mesh}\": locally owned block {block} is missing")]
    MissingBlock { mesh: String, block: usize },
    /// A block has a different geometry kind than its metadata declares.
    #[error("mesh \"{mesh}\" block {block}: expected {expected:?}, found {found:?}")]
    BlockKindMismatch {
        mesh: String,
        block: usize,
        expected: GeometryKind,
        found: GeometryKind,
    },
    /// Metadata is malformed, inconsistent, or failed to decode.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    /// A stream configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Receiver metadata for this object has not been set or computed yet.
    #[error("receiver metadata for object {0} has not been resolved")]
    ReceiverMetadataUnset(usize),
    /// The operation is not allowed in the current session state.
    #[error("{op} is not allowed while the session is {state}")]
    InvalidState { op: &'static str, state: &'static str },
    /// The partitioner could not compute a receiver layout.
    #[error(transparent)]
    Partition(#[from] PartitionError),
    /// A sub-codec failed while processing one data object.
    #[error("object {object} \"{mesh}\"")]
    Object {
        object: usize,
        mesh: String,
        #[source]
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    /// Attach object id and mesh name to a failure from a sub-codec.
    pub fn in_object(self, object: usize, mesh: &str) -> Self {
        SchemaError::Object {
            object,
            mesh: mesh.to_owned(),
            source: Box::new(self),
        }
    }

    /// Strip any `Object` context layers, returning the underlying failure.
    pub fn root_cause(&self) -> &SchemaError {
        match self {
            SchemaError::Object { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub(crate) fn read(path: impl Into<String>, source: TransportError) -> Self {
        SchemaError::TransportRead {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<String>, source: TransportError) -> Self {
        SchemaError::TransportWrite {
            path: path.into(),
            source,
        }
    }
}
