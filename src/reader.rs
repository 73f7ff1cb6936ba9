//! Cursor over an in-memory recording.

use crate::Error;

/// A cursor over an immutable byte slice.
///
/// Every decoder is built on this type. Reads never allocate, and a read
/// that would run past the end fails with [`Error::TruncatedInput`] without
/// moving the cursor.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

macro_rules! read_primitive {
    ($($le:ident, $be:ident => $t:ty;)*) => {
        $(
            #[doc = concat!("Read a little-endian `", stringify!($t), "`.")]
            pub fn $le(&mut self) -> Result<$t, Error> {
                Ok(<$t>::from_le_bytes(self.take()?))
            }

            #[doc = concat!("Read a big-endian `", stringify!($t), "`.")]
            pub fn $be(&mut self) -> Result<$t, Error> {
                Ok(<$t>::from_be_bytes(self.take()?))
            }
        )*
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Take an exact number of bytes, advancing the cursor.
    pub fn take<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let bytes = self.read_bytes(N)?;
        let mut buf = [0; N];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    /// Borrow the next `n` bytes, advancing the cursor.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let s = self.position;
        let e = s.checked_add(n).filter(|&e| e <= self.bytes.len());

        let Some(e) = e else {
            Err(Error::TruncatedInput {
                offset: s,
                wanted: n,
            })?
        };

        self.position = e;
        Ok(&self.bytes[s..e])
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(i8::from_le_bytes(self.take()?))
    }

    read_primitive! {
        read_u16_le, read_u16_be => u16;
        read_i16_le, read_i16_be => i16;
        read_u32_le, read_u32_be => u32;
        read_i32_le, read_i32_be => i32;
        read_u64_le, read_u64_be => u64;
        read_i64_le, read_i64_be => i64;
        read_f32_le, read_f32_be => f32;
        read_f64_le, read_f64_be => f64;
    }

    /// Advance the cursor without reading.
    pub fn skip(&mut self, n: usize) -> Result<(), Error> {
        self.read_bytes(n).map(|_| ())
    }

    /// Move the cursor to an absolute offset. Seeking to the very end is
    /// allowed.
    pub fn seek(&mut self, offset: usize) -> Result<(), Error> {
        if offset > self.bytes.len() {
            Err(Error::TruncatedInput {
                offset: self.position,
                wanted: offset - self.position,
            })?;
        }

        self.position = offset;
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The whole underlying slice, independent of the cursor.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Byte at an absolute offset, if the data reaches that far.
    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    /// Little-endian `u16` at an absolute offset, if the data reaches that far.
    pub fn u16_le_at(&self, offset: usize) -> Option<u16> {
        let bytes = self.bytes.get(offset..offset.checked_add(2)?)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Little-endian `u32` at an absolute offset, if the data reaches that far.
    pub fn u32_le_at(&self, offset: usize) -> Option<u32> {
        let bytes = self.bytes.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
