//! Scalar type tags and tagged element buffers.
//!
//! Arrays on the wire are raw little-endian element runs; the element type travels
//! separately in the metadata as a [`ScalarType`]. [`TypedBuffer`] is the closed set
//! of in-memory buffers those runs decode into.

use crate::schema_error::SchemaError;
use bytemuck::Pod;
use serde::{Deserialize, Serialize};

/// Scalar type tag for array elements and coordinates.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ScalarType {
    I8,
    U8,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl ScalarType {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
        }
    }

    /// Stable one-byte code used in the metadata blob.
    pub const fn code(self) -> u8 {
        match self {
            ScalarType::I8 => 1,
            ScalarType::U8 => 2,
            ScalarType::I32 => 3,
            ScalarType::U32 => 4,
            ScalarType::I64 => 5,
            ScalarType::U64 => 6,
            ScalarType::F32 => 7,
            ScalarType::F64 => 8,
        }
    }

    /// Inverse of [`ScalarType::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => ScalarType::I8,
            2 => ScalarType::U8,
            3 => ScalarType::I32,
            4 => ScalarType::U32,
            5 => ScalarType::I64,
            6 => ScalarType::U64,
            7 => ScalarType::F32,
            8 => ScalarType::F64,
            _ => return None,
        })
    }

    /// Returns a stable string label for the scalar type.
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::I8 => "i8",
            ScalarType::U8 => "u8",
            ScalarType::I32 => "i32",
            ScalarType::U32 => "u32",
            ScalarType::I64 => "i64",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }
}

/// Element buffer tagged with its scalar type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedBuffer {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! dispatch {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            TypedBuffer::I8($v) => $body,
            TypedBuffer::U8($v) => $body,
            TypedBuffer::I32($v) => $body,
            TypedBuffer::U32($v) => $body,
            TypedBuffer::I64($v) => $body,
            TypedBuffer::U64($v) => $body,
            TypedBuffer::F32($v) => $body,
            TypedBuffer::F64($v) => $body,
        }
    };
}

/// Copy little-endian wire bytes into a typed vector. Trailing bytes short of
/// one element are ignored.
pub(crate) fn decode<T: Pod>(bytes: &[u8]) -> Vec<T> {
    // wire bytes carry no alignment guarantee, so copy rather than cast in place
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

impl TypedBuffer {
    /// Scalar type tag for this buffer.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            TypedBuffer::I8(_) => ScalarType::I8,
            TypedBuffer::U8(_) => ScalarType::U8,
            TypedBuffer::I32(_) => ScalarType::I32,
            TypedBuffer::U32(_) => ScalarType::U32,
            TypedBuffer::I64(_) => ScalarType::I64,
            TypedBuffer::U64(_) => ScalarType::U64,
            TypedBuffer::F32(_) => ScalarType::F32,
            TypedBuffer::F64(_) => ScalarType::F64,
        }
    }

    /// A buffer of `len` zero elements.
    pub fn zeroed(scalar: ScalarType, len: usize) -> Self {
        match scalar {
            ScalarType::I8 => TypedBuffer::I8(vec![0; len]),
            ScalarType::U8 => TypedBuffer::U8(vec![0; len]),
            ScalarType::I32 => TypedBuffer::I32(vec![0; len]),
            ScalarType::U32 => TypedBuffer::U32(vec![0; len]),
            ScalarType::I64 => TypedBuffer::I64(vec![0; len]),
            ScalarType::U64 => TypedBuffer::U64(vec![0; len]),
            ScalarType::F32 => TypedBuffer::F32(vec![0.0; len]),
            ScalarType::F64 => TypedBuffer::F64(vec![0.0; len]),
        }
    }

    /// A buffer of `len` copies of `value`, converted to `scalar`.
    ///
    /// Returns `None` if `value` is not representable in `scalar`.
    pub fn filled(scalar: ScalarType, len: usize, value: i64) -> Option<Self> {
        use num_traits::cast;
        Some(match scalar {
            ScalarType::I8 => TypedBuffer::I8(vec![cast(value)?; len]),
            ScalarType::U8 => TypedBuffer::U8(vec![cast(value)?; len]),
            ScalarType::I32 => TypedBuffer::I32(vec![cast(value)?; len]),
            ScalarType::U32 => TypedBuffer::U32(vec![cast(value)?; len]),
            ScalarType::I64 => TypedBuffer::I64(vec![value; len]),
            ScalarType::U64 => TypedBuffer::U64(vec![cast(value)?; len]),
            ScalarType::F32 => TypedBuffer::F32(vec![cast(value)?; len]),
            ScalarType::F64 => TypedBuffer::F64(vec![cast(value)?; len]),
        })
    }

    /// Decode a raw little-endian element run.
    pub fn from_bytes(scalar: ScalarType, bytes: &[u8]) -> Result<Self, SchemaError> {
        if bytes.len() % scalar.size() != 0 {
            return Err(SchemaError::InvalidMetadata(format!(
                "{} bytes is not a whole number of {} elements",
                bytes.len(),
                scalar.as_str()
            )));
        }
        Ok(match scalar {
            ScalarType::I8 => TypedBuffer::I8(decode(bytes)),
            ScalarType::U8 => TypedBuffer::U8(bytes.to_vec()),
            ScalarType::I32 => TypedBuffer::I32(decode(bytes)),
            ScalarType::U32 => TypedBuffer::U32(decode(bytes)),
            ScalarType::I64 => TypedBuffer::I64(decode(bytes)),
            ScalarType::U64 => TypedBuffer::U64(decode(bytes)),
            ScalarType::F32 => TypedBuffer::F32(decode(bytes)),
            ScalarType::F64 => TypedBuffer::F64(decode(bytes)),
        })
    }

    /// Raw element bytes, in host order (the crate targets little-endian hosts).
    pub fn as_bytes(&self) -> &[u8] {
        dispatch!(self, v => bytemuck::cast_slice(v.as_slice()))
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        dispatch!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.scalar_type().size()
    }

    /// Element `i` widened to `f64`, for inspection and bounds computation.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        dispatch!(self, v => v.get(i).and_then(|x| num_traits::cast::<_, f64>(*x)))
    }
}

static_assertions::const_assert_eq!(ScalarType::F64.size(), std::mem::size_of::<f64>());
static_assertions::const_assert_eq!(ScalarType::I64.size(), std::mem::size_of::<i64>());
static_assertions::const_assert_eq!(ScalarType::U8.size(), std::mem::size_of::<u8>());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_and_invertible() {
        for s in [
            ScalarType::I8,
            ScalarType::U8,
            ScalarType::I32,
            ScalarType::U32,
            ScalarType::I64,
            ScalarType::U64,
            ScalarType::F32,
            ScalarType::F64,
        ] {
            assert_eq!(ScalarType::from_code(s.code()), Some(s));
        }
        assert_eq!(ScalarType::from_code(0), None);
        assert_eq!(ScalarType::F64.code(), 8);
    }

    #[test]
    fn bytes_decode_into_typed_buffer() {
        let src = TypedBuffer::F64(vec![1.5, -2.25, 3.0]);
        let back = TypedBuffer::from_bytes(ScalarType::F64, src.as_bytes()).unwrap();
        assert_eq!(back, src);
        assert_eq!(src.byte_len(), 24);
    }

    #[test]
    fn unaligned_bytes_decode() {
        let src = TypedBuffer::I64(vec![3, -1, i64::MAX]);
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(src.as_bytes());
        let back = TypedBuffer::from_bytes(ScalarType::I64, &shifted[1..]).unwrap();
        assert_eq!(back, src);
        assert_eq!(decode::<i64>(&shifted[1..17]), vec![3, -1]);
    }

    #[test]
    fn ragged_bytes_are_rejected() {
        assert!(TypedBuffer::from_bytes(ScalarType::I32, &[0u8; 7]).is_err());
    }

    #[test]
    fn filled_checks_representability() {
        assert_eq!(
            TypedBuffer::filled(ScalarType::I32, 2, 7),
            Some(TypedBuffer::I32(vec![7, 7]))
        );
        assert_eq!(TypedBuffer::filled(ScalarType::U8, 1, 300), None);
        assert_eq!(TypedBuffer::filled(ScalarType::U32, 1, -1), None);
    }
}
