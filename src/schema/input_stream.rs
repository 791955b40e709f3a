//! Read-side stream lifecycle.

use crate::comm::Communicator;
use crate::schema_error::SchemaError;
use crate::transport::{
    DEFAULT_ENGINE, ReadEngine, TransportError, TransportFactory, canonical_engine,
    stream_is_file_based,
};
use std::sync::Arc;

/// Owns the read engine of one stream.
///
/// A failed step advance closes the stream: a group that disagrees about the
/// current step cannot continue.
pub struct InputStream {
    factory: Arc<dyn TransportFactory>,
    file_name: String,
    read_engine: String,
    engine: Option<Box<dyn ReadEngine>>,
}

impl std::fmt::Debug for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("file_name", &self.file_name)
            .field("read_engine", &self.read_engine)
            .field("open", &self.engine.is_some())
            .finish()
    }
}

impl InputStream {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            file_name: String::new(),
            read_engine: DEFAULT_ENGINE.to_owned(),
            engine: None,
        }
    }

    /// Choose the engine the next `open` uses. Names are matched case-insensitively.
    pub fn set_read_engine(&mut self, engine: &str) -> Result<(), SchemaError> {
        let name = canonical_engine(engine).ok_or_else(|| {
            SchemaError::read(engine, TransportError::UnknownEngine(engine.to_owned()))
        })?;
        self.read_engine = name.to_owned();
        Ok(())
    }

    pub fn read_engine(&self) -> &str {
        &self.read_engine
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Open `file_name` with the selected engine, closing any stream already open.
    pub fn open(&mut self, comm: &dyn Communicator, file_name: &str) -> Result<(), SchemaError> {
        self.close();
        let engine = self
            .factory
            .open_reader(file_name, &self.read_engine, comm)
            .map_err(|e| SchemaError::read(file_name, e))?;
        log::debug!(
            "opened \"{file_name}\" with {} on rank {}",
            self.read_engine,
            comm.rank()
        );
        self.file_name = file_name.to_owned();
        self.engine = Some(engine);
        Ok(())
    }

    pub fn open_with(
        &mut self,
        comm: &dyn Communicator,
        engine: &str,
        file_name: &str,
    ) -> Result<(), SchemaError> {
        self.set_read_engine(engine)?;
        self.open(comm, file_name)
    }

    /// Move to the next step; on failure the stream is closed.
    pub fn advance_time_step(&mut self) -> Result<(), SchemaError> {
        let engine = self.engine_mut("advance_time_step")?;
        if let Err(e) = engine.advance() {
            log::debug!("advance of \"{}\" failed: {e}", self.file_name);
            let path = self.file_name.clone();
            self.close();
            return Err(SchemaError::read(path, e));
        }
        Ok(())
    }

    pub fn close(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            if let Err(e) = engine.close() {
                log::warn!("closing \"{}\": {e}", self.file_name);
            }
        }
    }

    /// Whether a stream is open.
    pub fn good(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_file_based(&self) -> bool {
        stream_is_file_based(&self.read_engine)
    }

    pub fn current_step(&self) -> Option<usize> {
        self.engine.as_ref().map(|e| e.current_step())
    }

    /// The open read engine.
    pub fn engine_mut(&mut self, op: &'static str) -> Result<&mut dyn ReadEngine, SchemaError> {
        match self.engine.as_deref_mut() {
            Some(e) => Ok(e),
            None => Err(SchemaError::InvalidState {
                op,
                state: "closed",
            }),
        }
    }
}

impl Drop for InputStream {
    fn drop(&mut self) {
        self.close();
    }
}
