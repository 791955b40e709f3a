//! Opaque byte blobs stored as per-writer `u8` variables.

use crate::blob::BinaryBlob;
use crate::data::ScalarType;
use crate::schema_error::SchemaError;
use crate::transport::{ReadEngine, Selection, VariableDecl, WriteEngine};

#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryBlobCodec;

impl BinaryBlobCodec {
    /// Declare `path` with its size left open until write time.
    pub fn define_variables(
        &self,
        engine: &mut dyn WriteEngine,
        path: &str,
    ) -> Result<(), SchemaError> {
        engine
            .define_variable(VariableDecl::variable(path, ScalarType::U8))
            .map_err(|e| SchemaError::write(path, e))?;
        Ok(())
    }

    /// Size the variable to the blob and stage one put of its bytes.
    pub fn write(
        &self,
        engine: &mut dyn WriteEngine,
        path: &str,
        blob: &BinaryBlob,
    ) -> Result<(), SchemaError> {
        let id = engine
            .inquire_variable(path)
            .ok_or_else(|| SchemaError::MissingField(path.into()))?;
        engine
            .set_extent(id, blob.len() as u64)
            .and_then(|()| engine.put_deferred(id, blob.to_bytes()))
            .map_err(|e| SchemaError::write(path, e))?;
        log::trace!("put {path}: {} bytes", blob.len());
        Ok(())
    }

    /// Fetch the blob stored at `path`.
    pub fn read(
        &self,
        engine: &mut dyn ReadEngine,
        path: &str,
        selection: Selection,
    ) -> Result<BinaryBlob, SchemaError> {
        if engine.inquire(path).is_none() {
            return Err(SchemaError::MissingField(path.into()));
        }
        let t = engine
            .get_deferred(path, selection)
            .map_err(|e| SchemaError::read(path, e))?;
        let mut batch = engine
            .perform_gets()
            .map_err(|e| SchemaError::read(path, e))?;
        let bytes = batch
            .take(t)
            .ok_or_else(|| SchemaError::MissingField(path.into()))?;
        log::trace!("get {path}: {} bytes", bytes.len());
        Ok(BinaryBlob::from_vec(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::LocalComm;
    use crate::transport::MemoryHub;

    #[test]
    fn blob_round_trip_and_missing_path() {
        let hub = MemoryHub::new();
        let comm = LocalComm::new(0, 1);
        let mut w = hub.writer("blobs", "BP4", &comm).unwrap();
        let codec = BinaryBlobCodec;
        codec.define_variables(&mut w, "md").unwrap();
        let mut blob = BinaryBlob::new();
        blob.pack_str("hello");
        w.begin_step().unwrap();
        codec.write(&mut w, "md", &blob).unwrap();
        w.end_step().unwrap();

        let mut r = hub.reader("blobs", "BP4", &comm).unwrap();
        let mut back = codec.read(&mut r, "md", Selection::All).unwrap();
        assert_eq!(back.unpack_string().unwrap(), "hello");
        assert!(matches!(
            codec.read(&mut r, "other", Selection::All),
            Err(SchemaError::MissingField(p)) if p == "other"
        ));
    }
}
