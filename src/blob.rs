//! Resizable byte envelope with independent read and write cursors.
//!
//! Writing always appends; reading consumes from an independent cursor that starts
//! at zero. Every value is little-endian. Strings and slices are prefixed by a
//! `u32` element count.

use crate::schema_error::SchemaError;
use bytemuck::Pod;
use bytes::Bytes;
use std::mem::size_of;

/// Ordered byte sequence used to carry serialized metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BinaryBlob {
    data: Vec<u8>,
    read_pos: usize,
}

macro_rules! le_codec {
    ($($pack:ident, $unpack:ident, $t:ty);* $(;)?) => {
        $(
            pub fn $pack(&mut self, v: $t) {
                self.data.extend_from_slice(&v.to_le_bytes());
            }

            pub fn $unpack(&mut self) -> Result<$t, SchemaError> {
                let raw = self.take(size_of::<$t>())?;
                let mut b = [0u8; size_of::<$t>()];
                b.copy_from_slice(raw);
                Ok(<$t>::from_le_bytes(b))
            }
        )*
    };
}

impl BinaryBlob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: Vec::with_capacity(cap),
            read_pos: 0,
        }
    }

    /// Wrap bytes fetched from a stream; the read cursor starts at the front.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, read_pos: 0 }
    }

    /// Size in bytes (the write cursor).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Freeze the contents for handing to a deferred put.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    pub fn read_pos(&self) -> usize {
        self.read_pos
    }

    /// Bytes not yet consumed by the read cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_pos
    }

    pub fn rewind(&mut self) {
        self.read_pos = 0;
    }

    /// Drop all contents and reset both cursors.
    pub fn clear(&mut self) {
        self.data.clear();
        self.read_pos = 0;
    }

    fn take(&mut self, n: usize) -> Result<&[u8], SchemaError> {
        if self.remaining() < n {
            return Err(SchemaError::InvalidMetadata(format!(
                "blob truncated: need {n} bytes at offset {}, {} left",
                self.read_pos,
                self.remaining()
            )));
        }
        let start = self.read_pos;
        self.read_pos += n;
        Ok(&self.data[start..start + n])
    }

    le_codec! {
        pack_u8, unpack_u8, u8;
        pack_u32, unpack_u32, u32;
        pack_u64, unpack_u64, u64;
        pack_i32, unpack_i32, i32;
        pack_i64, unpack_i64, i64;
        pack_f64, unpack_f64, f64;
    }

    pub fn pack_bool(&mut self, v: bool) {
        self.pack_u8(v as u8);
    }

    pub fn unpack_bool(&mut self) -> Result<bool, SchemaError> {
        Ok(self.unpack_u8()? != 0)
    }

    pub fn pack_usize(&mut self, v: usize) {
        self.pack_u64(v as u64);
    }

    pub fn unpack_usize(&mut self) -> Result<usize, SchemaError> {
        let v = self.unpack_u64()?;
        usize::try_from(v)
            .map_err(|_| SchemaError::InvalidMetadata(format!("{v} does not fit in usize")))
    }

    fn pack_len(&mut self, n: usize) {
        self.pack_u32(n as u32);
    }

    pub fn pack_str(&mut self, s: &str) {
        self.pack_len(s.len());
        self.data.extend_from_slice(s.as_bytes());
    }

    pub fn unpack_string(&mut self) -> Result<String, SchemaError> {
        let n = self.unpack_u32()? as usize;
        let raw = self.take(n)?.to_vec();
        String::from_utf8(raw)
            .map_err(|e| SchemaError::InvalidMetadata(format!("blob string is not UTF-8: {e}")))
    }

    /// Append a fixed-size record verbatim (records encode their own byte order).
    pub fn pack_record<T: Pod>(&mut self, rec: &T) {
        self.data.extend_from_slice(bytemuck::bytes_of(rec));
    }

    pub fn unpack_record<T: Pod>(&mut self) -> Result<T, SchemaError> {
        let raw = self.take(size_of::<T>())?;
        crate::wire::read_record(raw).map_err(SchemaError::InvalidMetadata)
    }

    /// Append a count-prefixed run of little-endian `u64`s.
    pub fn pack_u64_slice(&mut self, v: &[u64]) {
        self.pack_len(v.len());
        for &x in v {
            self.pack_u64(x);
        }
    }

    pub fn unpack_u64_vec(&mut self) -> Result<Vec<u64>, SchemaError> {
        let n = self.unpack_u32()? as usize;
        // bound the allocation by what the blob can actually hold
        if n > self.remaining() / size_of::<u64>() {
            return Err(SchemaError::InvalidMetadata(format!(
                "blob declares {n} u64 values but only {} bytes remain",
                self.remaining()
            )));
        }
        (0..n).map(|_| self.unpack_u64()).collect()
    }
}

impl From<Vec<u8>> for BinaryBlob {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_are_independent() {
        let mut b = BinaryBlob::new();
        b.pack_u32(7);
        assert_eq!(b.unpack_u32().unwrap(), 7);
        b.pack_i64(-3);
        b.pack_f64(0.25);
        assert_eq!(b.unpack_i64().unwrap(), -3);
        assert_eq!(b.unpack_f64().unwrap(), 0.25);
        assert_eq!(b.remaining(), 0);
        assert_eq!(b.len(), 4 + 8 + 8);
    }

    #[test]
    fn values_are_little_endian() {
        let mut b = BinaryBlob::new();
        b.pack_u32(0x0102_0304);
        assert_eq!(b.as_bytes(), &[4, 3, 2, 1]);
    }

    #[test]
    fn strings_and_slices() {
        let mut b = BinaryBlob::new();
        b.pack_str("pressure");
        b.pack_u64_slice(&[1, 2, 3]);
        b.pack_bool(true);
        assert_eq!(b.unpack_string().unwrap(), "pressure");
        assert_eq!(b.unpack_u64_vec().unwrap(), vec![1, 2, 3]);
        assert!(b.unpack_bool().unwrap());
    }

    #[test]
    fn truncation_is_reported() {
        let mut b = BinaryBlob::from_vec(vec![1, 2]);
        assert!(matches!(b.unpack_u32(), Err(SchemaError::InvalidMetadata(_))));
        let mut b = BinaryBlob::new();
        b.pack_u32(1_000_000);
        assert!(b.unpack_u64_vec().is_err());
    }
}
