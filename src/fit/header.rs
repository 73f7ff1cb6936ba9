//! Document and record headers.

use either::Either::{self, Left, Right};
use tartan_bitfield::bitfield;
use thiserror::Error;
use zerocopy::{
    FromBytes,
    byteorder::little_endian::{U16, U32},
};

/// An error decoding a document header.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Incorrect filetype marker.
    #[error("Incorrect file type marker.")]
    NotFitData,
    /// Unknown header length.
    #[error("Unknown header length ({0})")]
    UnknownHeaderLength(u8),
}

/// The fixed 12-byte prefix of every FIT document.
#[repr(C)]
#[derive(FromBytes)]
struct RawFileHeader {
    header_size: u8,
    protocol_version: u8,
    profile_version: U16,
    data_size: U32,
    data_type: [u8; 4],
}

/// A decoded document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// 12 or 14.
    pub size: u8,
    pub protocol_version: u8,
    pub profile_version: u16,
    /// Bytes of records between the header and the trailing CRC.
    pub data_size: u32,
}

impl FileHeader {
    /// Size of the header without the optional CRC.
    pub const MIN_SIZE: usize = 12;

    /// Decode the fixed part of a document header.
    pub fn decode(r: [u8; 12]) -> Result<Self, HeaderError> {
        let RawFileHeader {
            header_size,
            protocol_version,
            profile_version,
            data_size,
            data_type,
        } = zerocopy::transmute!(r);

        if &data_type != b".FIT" {
            Err(HeaderError::NotFitData)?;
        }

        if header_size != 12 && header_size != 14 {
            Err(HeaderError::UnknownHeaderLength(header_size))?;
        }

        Ok(Self {
            size: header_size,
            protocol_version,
            profile_version: profile_version.get(),
            data_size: data_size.get(),
        })
    }

    /// Major protocol version (1 or 2 for current devices).
    pub fn protocol_major(&self) -> u8 {
        self.protocol_version >> 4
    }
}

/// Kind of record announced by a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataHeader {
    Normal,
    /// Compressed timestamp header carrying a 5-bit time offset.
    Compressed(u8),
}

bitfield! {
    struct RawRecordHeader(u8) {
        [7] is_compressed,
    }
}

bitfield! {
    struct CompressedHeader(u8) {
        [0..5] time_offset: u8,
        [5..7] local_message: u8,
    }
}

bitfield! {
    struct NormalHeader(u8) {
        [0..4] local_message: u8,
        [5] is_developer,
        [6] is_definition,
    }
}

/// Decode a record header byte.
///
/// Returns the local message type, and either a definition (carrying the
/// developer-data flag) or a data record.
pub fn decode_record_header(r: u8) -> (u8, Either<bool, DataHeader>) {
    if RawRecordHeader(r).is_compressed() {
        let header = CompressedHeader(r);
        let kind = DataHeader::Compressed(header.time_offset());

        (header.local_message(), Right(kind))
    } else {
        let header = NormalHeader(r);

        let kind = if header.is_definition() {
            Left(header.is_developer())
        } else {
            Right(DataHeader::Normal)
        };

        (header.local_message(), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_header() {
        let mut r = [14, 0x20, 0x3D, 0x08, 0x10, 0x00, 0x00, 0x00, 0, 0, 0, 0];
        r[8..].copy_from_slice(b".FIT");

        let header = FileHeader::decode(r).unwrap();
        assert_eq!(header.size, 14);
        assert_eq!(header.protocol_major(), 2);
        assert_eq!(header.profile_version, 2109);
        assert_eq!(header.data_size, 16);
    }

    #[test]
    fn rejects_bad_magic_and_length() {
        let mut r = [12, 0x10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        r[8..].copy_from_slice(b".FIX");
        assert!(matches!(FileHeader::decode(r), Err(HeaderError::NotFitData)));

        r[8..].copy_from_slice(b".FIT");
        r[0] = 13;
        assert!(matches!(
            FileHeader::decode(r),
            Err(HeaderError::UnknownHeaderLength(13))
        ));
    }

    #[test]
    fn record_headers() {
        assert_eq!(decode_record_header(0x40), (0, Left(false)));
        assert_eq!(decode_record_header(0x63), (3, Left(true)));
        assert_eq!(decode_record_header(0x0F), (15, Right(DataHeader::Normal)));
        assert_eq!(
            decode_record_header(0b1101_0111),
            (2, Right(DataHeader::Compressed(0b10111)))
        );
    }
}
