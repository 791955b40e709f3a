//! Built-in partitioners.

use super::{PartitionError, Partitioner, with_owners};
use crate::metadata::MeshMetadata;
use serde::{Deserialize, Serialize};

fn check_group(n_ranks: usize) -> Result<(), PartitionError> {
    if n_ranks == 0 {
        Err(PartitionError::EmptyGroup)
    } else {
        Ok(())
    }
}

/// Contiguous runs of blocks per rank; the first `n % ranks` ranks take one extra.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockPartitioner;

impl Partitioner for BlockPartitioner {
    fn partition(
        &self,
        sender: &MeshMetadata,
        n_ranks: usize,
    ) -> Result<MeshMetadata, PartitionError> {
        check_group(n_ranks)?;
        let n = sender.num_blocks;
        let base = n / n_ranks;
        let extra = n % n_ranks;
        let mut owners = Vec::with_capacity(n);
        for rank in 0..n_ranks {
            let count = base + usize::from(rank < extra);
            owners.extend(std::iter::repeat_n(rank, count));
        }
        Ok(with_owners(sender, owners, n_ranks))
    }

    fn name(&self) -> &'static str {
        "block"
    }
}

/// Blocks dealt round robin: block `j` goes to rank `j % ranks`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CyclicPartitioner;

impl Partitioner for CyclicPartitioner {
    fn partition(
        &self,
        sender: &MeshMetadata,
        n_ranks: usize,
    ) -> Result<MeshMetadata, PartitionError> {
        check_group(n_ranks)?;
        let owners = (0..sender.num_blocks).map(|j| j % n_ranks).collect();
        Ok(with_owners(sender, owners, n_ranks))
    }

    fn name(&self) -> &'static str {
        "cyclic"
    }
}

/// Runs of `plane_size` consecutive blocks dealt round robin.
#[derive(Clone, Copy, Debug)]
pub struct PlanePartitioner {
    plane_size: usize,
}

impl PlanePartitioner {
    pub fn new(plane_size: usize) -> Self {
        Self { plane_size }
    }

    pub fn plane_size(&self) -> usize {
        self.plane_size
    }
}

impl Partitioner for PlanePartitioner {
    fn partition(
        &self,
        sender: &MeshMetadata,
        n_ranks: usize,
    ) -> Result<MeshMetadata, PartitionError> {
        check_group(n_ranks)?;
        if self.plane_size == 0 {
            return Err(PartitionError::ZeroPlaneSize);
        }
        let owners = (0..sender.num_blocks)
            .map(|j| (j / self.plane_size) % n_ranks)
            .collect();
        Ok(with_owners(sender, owners, n_ranks))
    }

    fn name(&self) -> &'static str {
        "plane"
    }
}

/// Explicit block-to-rank map; every block must be listed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedPartitioner {
    pub blocks: Vec<usize>,
    pub procs: Vec<usize>,
}

impl MappedPartitioner {
    pub fn new(blocks: Vec<usize>, procs: Vec<usize>) -> Self {
        Self { blocks, procs }
    }
}

impl Partitioner for MappedPartitioner {
    fn partition(
        &self,
        sender: &MeshMetadata,
        n_ranks: usize,
    ) -> Result<MeshMetadata, PartitionError> {
        check_group(n_ranks)?;
        if self.blocks.len() != self.procs.len() {
            return Err(PartitionError::MapLengthMismatch {
                blocks: self.blocks.len(),
                procs: self.procs.len(),
            });
        }
        let mut owners: Vec<Option<usize>> = vec![None; sender.num_blocks];
        for (&block, &rank) in self.blocks.iter().zip(&self.procs) {
            if rank >= n_ranks {
                return Err(PartitionError::RankOutOfRange {
                    block,
                    rank,
                    size: n_ranks,
                });
            }
            // entries for blocks the mesh does not have are ignored
            if let Some(slot) = owners.get_mut(block) {
                *slot = Some(rank);
            }
        }
        let owners = itertools::process_results(
            owners
                .into_iter()
                .enumerate()
                .map(|(j, o)| o.ok_or(PartitionError::UnmappedBlock(j))),
            |it| it.collect(),
        )?;
        Ok(with_owners(sender, owners, n_ranks))
    }

    fn name(&self) -> &'static str {
        "mapped"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeometryKind;

    fn sender(n: usize) -> MeshMetadata {
        let mut md = MeshMetadata::new("m", GeometryKind::UniformCartesian);
        md.num_blocks = n;
        md.block_owner = vec![0; n];
        md
    }

    #[test]
    fn block_is_contiguous_with_remainder_first() {
        let out = BlockPartitioner.partition(&sender(7), 3).unwrap();
        assert_eq!(out.block_owner, vec![0, 0, 0, 1, 1, 2, 2]);
        assert_eq!(out.num_blocks_local, vec![3, 2, 2]);
    }

    #[test]
    fn block_with_more_ranks_than_blocks() {
        let out = BlockPartitioner.partition(&sender(2), 4).unwrap();
        assert_eq!(out.block_owner, vec![0, 1]);
        assert_eq!(out.num_blocks_local, vec![1, 1, 0, 0]);
    }

    #[test]
    fn cyclic_and_plane() {
        let c = CyclicPartitioner.partition(&sender(5), 2).unwrap();
        assert_eq!(c.block_owner, vec![0, 1, 0, 1, 0]);
        let p = PlanePartitioner::new(2).partition(&sender(6), 2).unwrap();
        assert_eq!(p.block_owner, vec![0, 0, 1, 1, 0, 0]);
        assert!(matches!(
            PlanePartitioner::new(0).partition(&sender(1), 1),
            Err(PartitionError::ZeroPlaneSize)
        ));
    }

    #[test]
    fn mapped_requires_every_block() {
        let m = MappedPartitioner::new(vec![1, 0], vec![0, 1]);
        assert_eq!(m.partition(&sender(2), 2).unwrap().block_owner, vec![1, 0]);
        assert!(matches!(
            m.partition(&sender(3), 2),
            Err(PartitionError::UnmappedBlock(2))
        ));
        assert!(matches!(
            m.partition(&sender(2), 1),
            Err(PartitionError::RankOutOfRange { rank: 1, .. })
        ));
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(matches!(
            BlockPartitioner.partition(&sender(1), 0),
            Err(PartitionError::EmptyGroup)
        ));
    }
}
