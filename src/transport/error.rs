//! Transport-level failures.

use crate::data::ScalarType;
use thiserror::Error;

/// Errors reported by a transport engine.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No stream of this name has been opened for writing
    #[error("no stream named \"{0}\"")]
    StreamNotFound(String),
    /// The engine identifier is not one this transport provides
    #[error("unknown engine \"{0}\"")]
    UnknownEngine(String),
    /// The variable was never declared, or is absent from the current step
    #[error("unknown variable \"{0}\"")]
    UnknownVariable(String),
    /// The variable was already declared in this session
    #[error("variable \"{0}\" is already defined")]
    AlreadyDefined(String),
    /// The handle was issued before the variables were removed
    #[error("stale variable handle")]
    StaleHandle,
    /// Two writers disagree about a variable's element type
    #[error("\"{path}\" holds {found:?} elements, not {expected:?}")]
    TypeMismatch {
        path: String,
        expected: ScalarType,
        found: ScalarType,
    },
    /// Two writers disagree about a variable's shape
    #[error("\"{path}\": {detail}")]
    ShapeMismatch { path: String, detail: String },
    /// A put carried the wrong number of bytes for the declared extent
    #[error("\"{path}\": expected {expected} bytes, got {got}")]
    SizeMismatch { path: String, expected: u64, got: u64 },
    /// A variable-shape put was staged before its extent was set
    #[error("\"{0}\": extent not set")]
    ExtentUnset(String),
    /// A range selection reaches past the end of the variable
    #[error("\"{path}\": range {start}+{count} exceeds length {len}")]
    OutOfRange {
        path: String,
        start: u64,
        count: u64,
        len: u64,
    },
    /// No writer block with this index exists for the variable
    #[error("\"{path}\": no write block {block}")]
    NoSuchWriteBlock { path: String, block: usize },
    /// Step-bracketed call made outside a step, or a step opened twice
    #[error("{0}")]
    StepState(&'static str),
    /// The next step has not been committed by every writer yet
    #[error("next step is not ready")]
    StepNotReady,
    /// All writers closed and every committed step has been consumed
    #[error("end of stream")]
    EndOfStream,
    /// The engine has been closed
    #[error("engine is closed")]
    Closed,
}
