//! Partitioning errors for mesh-transit

use thiserror::Error;

/// Errors from computing a receiver layout.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// The consumer group has no ranks to assign blocks to
    #[error("cannot partition over an empty process group")]
    EmptyGroup,
    /// Plane partitioning needs at least one block per plane
    #[error("plane size must be at least 1")]
    ZeroPlaneSize,
    /// Mapped partitioning got block and process lists of different lengths
    #[error("block map has {blocks} block ids but {procs} process ids")]
    MapLengthMismatch { blocks: usize, procs: usize },
    /// A block has no entry in the explicit block map
    #[error("block {0} is not mapped to any process")]
    UnmappedBlock(usize),
    /// The explicit block map sends a block to a rank outside the group
    #[error("block {block} mapped to rank {rank} outside a group of {size}")]
    RankOutOfRange {
        block: usize,
        rank: usize,
        size: usize,
    },
}
