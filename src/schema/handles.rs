//! Session-scoped variable handles, indexed by object, field and block.

use crate::transport::VarId;
use hashbrown::HashMap;

/// One wire variable family of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Points,
    CellTypes,
    CellArray,
    Extent,
    Origin,
    Spacing,
    XCoords,
    YCoords,
    ZCoords,
    /// Data array slot; ghost arrays follow the declared arrays.
    Array(usize),
}

/// Handles created at define time and consumed at write time.
///
/// Each entry holds one slot per block of the mesh; only locally owned blocks
/// have a handle. The arena is cleared whenever variables are redefined, so a
/// handle never outlives the declarations it came from.
#[derive(Debug, Default)]
pub struct HandleArena {
    handles: HashMap<(usize, Field), Vec<Option<VarId>>>,
}

impl HandleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: usize, field: Field, per_block: Vec<Option<VarId>>) {
        self.handles.insert((object, field), per_block);
    }

    pub fn get(&self, object: usize, field: Field, block: usize) -> Option<VarId> {
        self.handles
            .get(&(object, field))
            .and_then(|v| v.get(block).copied().flatten())
    }

    /// Number of block slots recorded for a field.
    pub fn num_blocks(&self, object: usize, field: Field) -> Option<usize> {
        self.handles.get(&(object, field)).map(Vec::len)
    }

    pub fn clear(&mut self) {
        self.handles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_owned_blocks_have_handles() {
        let mut a = HandleArena::new();
        a.insert(0, Field::Points, vec![None, Some(VarId::new(4, 0)), None]);
        assert_eq!(a.num_blocks(0, Field::Points), Some(3));
        assert_eq!(a.get(0, Field::Points, 0), None);
        assert_eq!(a.get(0, Field::Points, 1), Some(VarId::new(4, 0)));
        assert_eq!(a.get(1, Field::Points, 1), None);
        a.clear();
        assert!(a.is_empty());
    }
}
