//! Write-side stream lifecycle.

use crate::comm::Communicator;
use crate::data::CompositeMesh;
use crate::metadata::MeshMetadata;
use crate::schema::CollectionCodec;
use crate::schema_error::SchemaError;
use crate::transport::{
    DEFAULT_ENGINE, TransportError, TransportFactory, WriteEngine, canonical_engine,
};
use std::sync::Arc;

/// Producer side of a stream: one engine, one codec session.
///
/// Variables are redeclared every step since block counts and sizes may change
/// between steps. Each step is flushed once, at its end.
pub struct OutputStream {
    factory: Arc<dyn TransportFactory>,
    file_name: String,
    write_engine: String,
    engine: Option<Box<dyn WriteEngine>>,
    codec: CollectionCodec,
    steps_written: u64,
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("file_name", &self.file_name)
            .field("write_engine", &self.write_engine)
            .field("open", &self.engine.is_some())
            .field("steps_written", &self.steps_written)
            .finish()
    }
}

impl OutputStream {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            file_name: String::new(),
            write_engine: DEFAULT_ENGINE.to_owned(),
            engine: None,
            codec: CollectionCodec::new(),
            steps_written: 0,
        }
    }

    pub fn set_write_engine(&mut self, engine: &str) -> Result<(), SchemaError> {
        let name = canonical_engine(engine).ok_or_else(|| {
            SchemaError::write(engine, TransportError::UnknownEngine(engine.to_owned()))
        })?;
        self.write_engine = name.to_owned();
        Ok(())
    }

    pub fn open(&mut self, comm: &dyn Communicator, file_name: &str) -> Result<(), SchemaError> {
        self.close()?;
        let engine = self
            .factory
            .open_writer(file_name, &self.write_engine, comm)
            .map_err(|e| SchemaError::write(file_name, e))?;
        log::debug!(
            "opened \"{file_name}\" for writing with {} on rank {}",
            self.write_engine,
            comm.rank()
        );
        self.file_name = file_name.to_owned();
        self.engine = Some(engine);
        self.codec = CollectionCodec::new();
        self.steps_written = 0;
        Ok(())
    }

    /// Write one complete step. Collective over the writer group.
    ///
    /// A failure after the step has begun abandons the step and closes the
    /// stream; the group is out of step at that point and cannot continue.
    pub fn write_step(
        &mut self,
        comm: &dyn Communicator,
        time_step: u64,
        time: f64,
        metadata: &[MeshMetadata],
        objects: &[CompositeMesh],
    ) -> Result<(), SchemaError> {
        let path = self.file_name.clone();
        let engine = self
            .engine
            .as_deref_mut()
            .ok_or(SchemaError::InvalidState {
                op: "write_step",
                state: "closed",
            })?;
        let r = Self::write_inner(
            &mut self.codec,
            &mut *engine,
            &path,
            comm,
            time_step,
            time,
            metadata,
            objects,
        );
        if let Err(e) = r {
            log::debug!("step {time_step} of \"{path}\" failed, closing: {e}");
            engine.abort_step();
            if let Err(close) = self.close() {
                log::warn!("closing \"{path}\": {close}");
            }
            return Err(e);
        }
        self.steps_written += 1;
        log::trace!("step {time_step} of \"{path}\" committed");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_inner(
        codec: &mut CollectionCodec,
        engine: &mut dyn WriteEngine,
        path: &str,
        comm: &dyn Communicator,
        time_step: u64,
        time: f64,
        metadata: &[MeshMetadata],
        objects: &[CompositeMesh],
    ) -> Result<(), SchemaError> {
        engine
            .begin_step()
            .map_err(|e| SchemaError::write(path, e))?;
        engine.remove_all_variables();
        codec.define_variables(&mut *engine, comm, metadata)?;
        codec.write(&mut *engine, comm, time_step, time, metadata, objects)?;
        engine.end_step().map_err(|e| SchemaError::write(path, e))
    }

    pub fn steps_written(&self) -> u64 {
        self.steps_written
    }

    pub fn good(&self) -> bool {
        self.engine.is_some()
    }

    pub fn close(&mut self) -> Result<(), SchemaError> {
        self.codec.close();
        if let Some(mut engine) = self.engine.take() {
            engine
                .close()
                .map_err(|e| SchemaError::write(self.file_name.as_str(), e))?;
        }
        Ok(())
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("closing \"{}\": {e}", self.file_name);
        }
    }
}
