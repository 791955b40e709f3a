//! Schema revision tag.

use crate::data::ScalarType;
use crate::schema::{VERSION_PATH, get_value, put_value};
use crate::schema_error::SchemaError;
use crate::transport::{ReadEngine, VariableDecl, WriteEngine};

/// Revision written by this crate.
pub const REVISION: u32 = 3;

/// Oldest revision this crate can still interpret.
pub const LOWEST_COMPATIBLE_REVISION: u32 = 3;

/// Writes and checks the revision tag that marks a stream as ours.
#[derive(Clone, Copy, Debug)]
pub struct VersionCodec {
    revision: u32,
    lowest_compatible: u32,
}

impl Default for VersionCodec {
    fn default() -> Self {
        Self {
            revision: REVISION,
            lowest_compatible: LOWEST_COMPATIBLE_REVISION,
        }
    }
}

impl VersionCodec {
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn define_variables(&self, engine: &mut dyn WriteEngine) -> Result<(), SchemaError> {
        engine
            .define_variable(VariableDecl::scalar(VERSION_PATH, ScalarType::U32))
            .map_err(|e| SchemaError::write(VERSION_PATH, e))?;
        Ok(())
    }

    pub fn write(&self, engine: &mut dyn WriteEngine) -> Result<(), SchemaError> {
        put_value(engine, VERSION_PATH, self.revision)
    }

    /// Read the stored revision.
    ///
    /// A stream without the tag is [`SchemaError::NotThisFormat`]; one older than
    /// the lowest compatible revision is [`SchemaError::IncompatibleSchema`].
    pub fn read(&self, engine: &mut dyn ReadEngine) -> Result<u32, SchemaError> {
        if engine.inquire(VERSION_PATH).is_none() {
            return Err(SchemaError::NotThisFormat);
        }
        let found: u32 = get_value(engine, VERSION_PATH)?;
        if found < self.lowest_compatible {
            log::error!(
                "schema revision {} is incompatible with revision {found} found in the stream",
                self.lowest_compatible
            );
            return Err(SchemaError::IncompatibleSchema {
                found,
                lowest: self.lowest_compatible,
            });
        }
        Ok(found)
    }
}
