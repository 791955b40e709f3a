//! Thin façade over the process group a codec session runs in.
//!
//! The schema only needs to know who it is (`rank`) and how many peers take part
//! (`size`). Collective data movement is the transport's business, so the trait
//! stays deliberately small.

/// Process-group identity used to decide block ownership.
pub trait Communicator: Send + Sync {
    /// Rank of the calling process within the group.
    fn rank(&self) -> usize;
    /// Number of processes in the group.
    fn size(&self) -> usize;
}

/// Compile-time single-process comm for pure serial use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
}

/// One member of a process group simulated inside a single OS process.
///
/// Each simulated rank holds its own `LocalComm` and its own transport engine;
/// engines opened on the same [`MemoryHub`](crate::transport::MemoryHub) see each
/// other's data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalComm {
    rank: usize,
    size: usize,
}

impl LocalComm {
    pub fn new(rank: usize, size: usize) -> Self {
        debug_assert!(rank < size, "rank {rank} outside group of {size}");
        Self { rank, size }
    }

    /// All members of a group of `size`, in rank order.
    pub fn group(size: usize) -> Vec<LocalComm> {
        (0..size).map(|rank| LocalComm { rank, size }).collect()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::Communicator;
    use mpi::topology::{Communicator as _, SimpleCommunicator};

    /// Wraps an MPI communicator; rank and size are cached at construction.
    pub struct MpiComm {
        pub world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new(world: SimpleCommunicator) -> Self {
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self { world, rank, size }
        }
    }

    // SimpleCommunicator is a plain handle; sessions never share it across threads
    // while a collective is in flight.
    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
