//! Streaming I/O seam: variable declaration, deferred put/get, step control.
//!
//! The schema codecs are written against [`WriteEngine`] and [`ReadEngine`]
//! only. [`MemoryHub`] is an in-process implementation that lets a group of
//! writer ranks and a differently sized group of reader ranks share streams
//! inside one process.

pub mod error;
pub mod memory;
pub mod staging;

pub use error::TransportError;
pub use memory::{MemoryHub, MemoryReader, MemoryWriter};
pub use staging::{GetBatch, GetTicket, PutBatch};

use crate::comm::Communicator;
use crate::data::ScalarType;
use bytes::Bytes;

/// Engine used when none is configured.
pub const DEFAULT_ENGINE: &str = "BP4";

/// Engines backed by random-access files.
pub const FILE_ENGINES: &[&str] = &["BP3", "BP4", "BPFile", "HDF5"];

/// Engines backed by a strictly sequential live feed.
pub const STREAMING_ENGINES: &[&str] = &["SST", "InSituMPI", "DataMan"];

/// Whether `engine` names a file-based engine (case-insensitive).
pub fn stream_is_file_based(engine: &str) -> bool {
    FILE_ENGINES.iter().any(|e| e.eq_ignore_ascii_case(engine))
}

/// Canonical spelling of a known engine name.
pub fn canonical_engine(engine: &str) -> Option<&'static str> {
    FILE_ENGINES
        .iter()
        .chain(STREAMING_ENGINES)
        .find(|e| e.eq_ignore_ascii_case(engine))
        .copied()
}

/// How a variable's elements are laid out across writers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// A single value; every writer writes the same one.
    Scalar,
    /// This writer's `local` elements at `offset` within a `global` array.
    Global { local: u64, global: u64, offset: u64 },
    /// One independent block per writer, sized at write time.
    Variable,
}

/// Declaration of one variable on a write engine.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDecl {
    pub path: String,
    pub scalar: ScalarType,
    pub shape: Shape,
}

impl VariableDecl {
    pub fn scalar(path: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            path: path.into(),
            scalar,
            shape: Shape::Scalar,
        }
    }

    pub fn global(
        path: impl Into<String>,
        scalar: ScalarType,
        local: u64,
        global: u64,
        offset: u64,
    ) -> Self {
        Self {
            path: path.into(),
            scalar,
            shape: Shape::Global {
                local,
                global,
                offset,
            },
        }
    }

    pub fn variable(path: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            path: path.into(),
            scalar,
            shape: Shape::Variable,
        }
    }

    /// Bytes a put against this declaration must carry, if fixed.
    pub fn expected_bytes(&self) -> Option<u64> {
        let size = self.scalar.size() as u64;
        match self.shape {
            Shape::Scalar => Some(size),
            Shape::Global { local, .. } => Some(local * size),
            Shape::Variable => None,
        }
    }
}

/// Handle to a declared variable, valid until the engine's variables are removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VarId {
    index: u32,
    generation: u32,
}

impl VarId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

/// Which part of a stored variable a get reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// The whole variable. For per-writer variables, the lowest writer's block.
    All,
    /// `count` elements starting at element `start` of a global array.
    Range { start: u64, count: u64 },
    /// The block written by one writer rank.
    WriteBlock(usize),
}

/// What a reader can learn about a variable in the current step.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableInfo {
    pub scalar: ScalarType,
    pub shape: StoredShape,
}

/// Shape of a variable as stored, seen from the read side.
#[derive(Clone, Debug, PartialEq)]
pub enum StoredShape {
    Scalar,
    Global { len: u64 },
    /// Element count of each writer block, in writer-rank order.
    Blocks { lens: Vec<(usize, u64)> },
}

impl VariableInfo {
    /// Element count a [`Selection::All`] get would return.
    pub fn len(&self) -> u64 {
        match &self.shape {
            StoredShape::Scalar => 1,
            StoredShape::Global { len } => *len,
            StoredShape::Blocks { lens } => lens.first().map_or(0, |&(_, n)| n),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of writer blocks (one for scalars and global arrays).
    pub fn write_blocks(&self) -> usize {
        match &self.shape {
            StoredShape::Blocks { lens } => lens.len(),
            _ => 1,
        }
    }
}

/// Producer side of a stream.
pub trait WriteEngine: Send {
    fn define_variable(&mut self, decl: VariableDecl) -> Result<VarId, TransportError>;

    fn inquire_variable(&self, path: &str) -> Option<VarId>;

    /// Set the element count of a [`Shape::Variable`] variable for the next put.
    fn set_extent(&mut self, var: VarId, len: u64) -> Result<(), TransportError>;

    /// Stage a put; the data is taken over now and stored at the next flush.
    fn put_deferred(&mut self, var: VarId, data: Bytes) -> Result<(), TransportError>;

    /// Flush every staged put.
    fn perform_puts(&mut self) -> Result<(), TransportError>;

    fn begin_step(&mut self) -> Result<(), TransportError>;

    /// Flush and commit the current step for this writer.
    fn end_step(&mut self) -> Result<(), TransportError>;

    /// Drop the open step, if any, without committing it. Staged puts are discarded.
    fn abort_step(&mut self);

    /// Forget every declaration; outstanding handles become stale.
    fn remove_all_variables(&mut self);

    fn close(&mut self) -> Result<(), TransportError>;
}

/// Consumer side of a stream.
pub trait ReadEngine: Send {
    fn inquire(&self, path: &str) -> Option<VariableInfo>;

    /// Stage a get; the bytes are delivered by the next [`ReadEngine::perform_gets`].
    fn get_deferred(&mut self, path: &str, selection: Selection)
    -> Result<GetTicket, TransportError>;

    fn perform_gets(&mut self) -> Result<GetBatch, TransportError>;

    /// Move to the next committed step.
    fn advance(&mut self) -> Result<(), TransportError>;

    fn current_step(&self) -> usize;

    fn is_file_based(&self) -> bool;

    fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens engines on named streams.
pub trait TransportFactory: Send + Sync {
    fn open_writer(
        &self,
        stream: &str,
        engine: &str,
        comm: &dyn Communicator,
    ) -> Result<Box<dyn WriteEngine>, TransportError>;

    fn open_reader(
        &self,
        stream: &str,
        engine: &str,
        comm: &dyn Communicator,
    ) -> Result<Box<dyn ReadEngine>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_classification() {
        assert!(stream_is_file_based("bp4"));
        assert!(stream_is_file_based("HDF5"));
        assert!(!stream_is_file_based("SST"));
        assert_eq!(canonical_engine("insitumpi"), Some("InSituMPI"));
        assert_eq!(canonical_engine("Null"), None);
    }

    #[test]
    fn expected_bytes_by_shape() {
        assert_eq!(VariableDecl::scalar("t", ScalarType::F64).expected_bytes(), Some(8));
        assert_eq!(
            VariableDecl::global("a", ScalarType::I32, 3, 10, 2).expected_bytes(),
            Some(12)
        );
        assert_eq!(VariableDecl::variable("b", ScalarType::U8).expected_bytes(), None);
    }
}
