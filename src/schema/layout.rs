//! Block offsets within a global wire array.
//!
//! Writers and readers each compute offsets independently from metadata, so the
//! scan must visit blocks in global index order and nothing else.

use crate::metadata::MeshMetadata;

/// Where one block's elements sit in a global array.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSpan {
    pub block: usize,
    pub owner: usize,
    pub offset: u64,
    pub len: u64,
}

/// Per-block spans of one global array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    spans: Vec<BlockSpan>,
    total: u64,
}

impl Layout {
    /// Scan `(owner, len)` pairs in block order.
    pub fn scan<I>(blocks: I) -> Self
    where
        I: IntoIterator<Item = (usize, u64)>,
    {
        let mut offset = 0u64;
        let spans = blocks
            .into_iter()
            .enumerate()
            .map(|(block, (owner, len))| {
                let span = BlockSpan {
                    block,
                    owner,
                    offset,
                    len,
                };
                offset += len;
                span
            })
            .collect();
        Self {
            spans,
            total: offset,
        }
    }

    /// Scan the blocks of `md`, sizing block `j` with `len(j)`.
    pub fn from_metadata(md: &MeshMetadata, len: impl Fn(usize) -> u64) -> Self {
        Self::scan((0..md.num_blocks).map(|j| (md.block_owner[j], len(j))))
    }

    /// `per_block` elements for every block.
    pub fn fixed(md: &MeshMetadata, per_block: u64) -> Self {
        Self::from_metadata(md, |_| per_block)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn span(&self, block: usize) -> Option<&BlockSpan> {
        self.spans.get(block)
    }

    pub fn spans(&self) -> &[BlockSpan] {
        &self.spans
    }

    pub fn owned_by(&self, rank: usize) -> impl Iterator<Item = &BlockSpan> {
        self.spans.iter().filter(move |s| s.owner == rank)
    }
}

/// Exclusive prefix sums: `offsets(s)[i] == s[..i].iter().sum()`.
pub fn offsets(sizes: &[u64]) -> Vec<u64> {
    sizes
        .iter()
        .scan(0u64, |acc, &s| {
            let o = *acc;
            *acc += s;
            Some(o)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn spans_accumulate_in_block_order() {
        let l = Layout::scan([(0, 3), (1, 0), (0, 5), (1, 2)]);
        let offs: Vec<_> = l.spans().iter().map(|s| s.offset).collect();
        assert_eq!(offs, vec![0, 3, 3, 8]);
        assert_eq!(l.total(), 10);
        let mine: Vec<_> = l.owned_by(1).map(|s| s.block).collect();
        assert_eq!(mine, vec![1, 3]);
    }

    proptest! {
        #[test]
        fn scan_matches_prefix_sums(sizes in proptest::collection::vec(0u64..1000, 0..64), n_ranks in 1usize..6) {
            let l = Layout::scan(sizes.iter().enumerate().map(|(j, &s)| (j % n_ranks, s)));
            let expect = offsets(&sizes);
            for (span, off) in l.spans().iter().zip(&expect) {
                prop_assert_eq!(span.offset, *off);
            }
            prop_assert_eq!(l.total(), sizes.iter().sum::<u64>());
        }
    }
}
