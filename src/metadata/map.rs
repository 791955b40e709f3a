//! Per-object metadata tables keyed by object id.

use crate::metadata::mesh_metadata::MeshMetadata;
use crate::schema_error::SchemaError;

/// Metadata for objects `0..len`, some of which may not be resolved yet.
#[derive(Clone, Debug, Default)]
pub struct MeshMetadataMap {
    entries: Vec<Option<MeshMetadata>>,
}

impl MeshMetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Resize to `n` objects; new entries start unresolved.
    pub fn resize(&mut self, n: usize) {
        self.entries.resize(n, None);
    }

    pub fn push(&mut self, md: MeshMetadata) {
        self.entries.push(Some(md));
    }

    pub fn get(&self, id: usize) -> Option<&MeshMetadata> {
        self.entries.get(id).and_then(Option::as_ref)
    }

    pub fn set(&mut self, id: usize, md: MeshMetadata) -> Result<(), SchemaError> {
        let slot = self
            .entries
            .get_mut(id)
            .ok_or(SchemaError::UnknownObject(id))?;
        *slot = Some(md);
        Ok(())
    }

    /// Id of the object whose mesh is called `name`.
    pub fn mesh_id(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.as_ref().is_some_and(|md| md.mesh_name == name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<&MeshMetadata>)> {
        self.entries.iter().enumerate().map(|(i, e)| (i, e.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GeometryKind;

    #[test]
    fn resize_leaves_entries_unresolved() {
        let mut m = MeshMetadataMap::new();
        m.resize(2);
        assert_eq!(m.len(), 2);
        assert!(m.get(0).is_none());
        m.set(1, MeshMetadata::new("b", GeometryKind::Polydata)).unwrap();
        assert_eq!(m.mesh_id("b"), Some(1));
        assert_eq!(m.mesh_id("a"), None);
        assert!(matches!(
            m.set(5, MeshMetadata::new("c", GeometryKind::Polydata)),
            Err(SchemaError::UnknownObject(5))
        ));
    }
}
