//! Process-local composite of blocks, indexed by global block id.

use crate::data::block::Block;

/// Blocks of one mesh as seen by one process.
///
/// The vector is always as long as the mesh's global block count. Blocks owned
/// elsewhere stay `None` so global indices line up across processes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeMesh {
    blocks: Vec<Option<Block>>,
}

impl CompositeMesh {
    /// A composite of `num_blocks` empty placeholders.
    pub fn new(num_blocks: usize) -> Self {
        Self {
            blocks: vec![None; num_blocks],
        }
    }

    pub fn from_blocks(blocks: Vec<Option<Block>>) -> Self {
        Self { blocks }
    }

    /// Global block count, placeholders included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: usize) -> Option<&Block> {
        self.blocks.get(id).and_then(Option::as_ref)
    }

    pub fn block_mut(&mut self, id: usize) -> Option<&mut Block> {
        self.blocks.get_mut(id).and_then(Option::as_mut)
    }

    /// Install `block` at `id`, growing the composite if needed.
    pub fn set_block(&mut self, id: usize, block: Block) {
        if id >= self.blocks.len() {
            self.blocks.resize(id + 1, None);
        }
        self.blocks[id] = Some(block);
    }

    /// Locally present blocks with their global flat index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|b| (i, b)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Block)> {
        self.blocks
            .iter_mut()
            .enumerate()
            .filter_map(|(i, b)| b.as_mut().map(|b| (i, b)))
    }

    /// Number of locally present blocks.
    pub fn num_local_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::block::GeometryKind;

    #[test]
    fn placeholders_keep_global_indices() {
        let mut c = CompositeMesh::new(4);
        c.set_block(1, Block::empty(GeometryKind::Polydata));
        c.set_block(3, Block::empty(GeometryKind::UniformCartesian));
        let ids: Vec<_> = c.iter().map(|(i, _)| i).collect();
        assert_eq!(ids, [1, 3]);
        assert_eq!(c.len(), 4);
        assert_eq!(c.num_local_blocks(), 2);
        assert!(c.block(0).is_none());
        assert!(c.block(9).is_none());
    }

    #[test]
    fn set_block_grows() {
        let mut c = CompositeMesh::default();
        c.set_block(2, Block::empty(GeometryKind::Unstructured));
        assert_eq!(c.len(), 3);
    }
}
