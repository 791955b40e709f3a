//! Receiver-layout strategies.
//!
//! A partitioner is a pure function of the sender's metadata and the consumer
//! group size. It only decides block ownership: block shapes and arrays are
//! copied from the sender unchanged.

pub mod error;
pub mod strategies;

pub use error::PartitionError;
pub use strategies::{BlockPartitioner, CyclicPartitioner, MappedPartitioner, PlanePartitioner};

use crate::metadata::MeshMetadata;

/// Computes the layout a consumer group of `n_ranks` should read `sender` with.
pub trait Partitioner: Send + Sync {
    fn partition(&self, sender: &MeshMetadata, n_ranks: usize)
    -> Result<MeshMetadata, PartitionError>;

    /// Short label for logging.
    fn name(&self) -> &'static str;
}

/// Copy `sender` with new block owners, recounting blocks per rank.
pub(crate) fn with_owners(
    sender: &MeshMetadata,
    owners: Vec<usize>,
    n_ranks: usize,
) -> MeshMetadata {
    let mut md = sender.clone();
    md.num_blocks_local = vec![0; n_ranks];
    for &o in &owners {
        md.num_blocks_local[o] += 1;
    }
    md.block_owner = owners;
    md.global_view = true;
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeometryKind;
    use proptest::prelude::*;

    fn sender(n: usize) -> MeshMetadata {
        let mut md = MeshMetadata::new("m", GeometryKind::Unstructured);
        md.num_blocks = n;
        md.num_blocks_local = vec![n];
        md.block_ids = (0..n).collect();
        md.block_owner = vec![0; n];
        md.block_num_points = vec![4; n];
        md.block_num_cells = vec![1; n];
        md.block_cell_array_size = vec![5; n];
        md.block_extents = vec![crate::metadata::EMPTY_EXTENT; n];
        md.block_bounds = vec![crate::metadata::EMPTY_BOUNDS; n];
        md.global_view = true;
        md
    }

    proptest! {
        #[test]
        fn every_strategy_assigns_every_block_once(n_blocks in 0usize..40, n_ranks in 1usize..9, plane in 1usize..5) {
            let md = sender(n_blocks);
            let strategies: Vec<Box<dyn Partitioner>> = vec![
                Box::new(BlockPartitioner),
                Box::new(CyclicPartitioner),
                Box::new(PlanePartitioner::new(plane)),
            ];
            for p in strategies {
                let out = p.partition(&md, n_ranks).unwrap();
                prop_assert!(out.validate(n_ranks).is_ok());
                prop_assert_eq!(out.block_owner.len(), n_blocks);
                prop_assert_eq!(out.num_blocks_local.iter().sum::<usize>(), n_blocks);
                prop_assert_eq!(&out.block_num_points, &md.block_num_points);
                prop_assert!(out.global_view);
            }
        }
    }
}
