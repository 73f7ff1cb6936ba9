//! Slice-based message decoder.

use std::collections::BTreeMap;

use either::Either::{Left, Right};
use tracing::{trace, warn};

use crate::{Error, reader::ByteReader};

use super::{
    check::crc_of,
    data::{Field, Value, decode_field},
    definition::{BaseType, Definition},
    header::{DataHeader, FileHeader, decode_record_header},
};

/// Field number of the timestamp carried by any message.
pub const TIMESTAMP_FIELD: u8 = 253;

/// A data message: the valid fields of one record, keyed by field number.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub global: u16,
    pub fields: BTreeMap<u8, Field>,
}

impl Message {
    /// The value of a field, if present and valid.
    pub fn value(&self, number: u8) -> Option<&Value> {
        self.fields.get(&number).map(|f| &f.value)
    }

    /// The absolute timestamp of this message, in seconds since the FIT epoch.
    pub fn timestamp(&self) -> Option<u32> {
        self.value(TIMESTAMP_FIELD)?.as_i128()?.try_into().ok()
    }
}

/// A mismatch between the stored and computed checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcMismatch {
    pub found: u16,
    pub calculated: u16,
    /// Whether the header checksum, rather than the file checksum, differs.
    pub in_header: bool,
}

/// Lazy sequence of the data messages of a document.
///
/// Definitions, the rolling timestamp used by compressed headers, and the
/// cursor are all owned by the iterator, so concurrent decodes share
/// nothing. Iteration ends after the last record, or after the first error.
#[derive(Debug)]
pub struct Messages<'a> {
    header: FileHeader,
    r: ByteReader<'a>,
    end: usize,
    definitions: [Option<Definition>; 16],
    rolling_timestamp: Option<u32>,
    crc_mismatch: Option<CrcMismatch>,
    done: bool,
}

impl<'a> Messages<'a> {
    /// Decode the document header and prepare to read records.
    ///
    /// Checksums are verified up front; a mismatch does not stop decoding
    /// and is reported by [`Messages::crc_mismatch`].
    pub fn new(data: &'a [u8]) -> Result<Self, Error> {
        let mut r = ByteReader::new(data);

        let header = FileHeader::decode(r.take()?)?;
        let mut header_mismatch = None;

        if header.size == 14 {
            let found = r.read_u16_le()?;
            let calculated = crc_of(&data[..FileHeader::MIN_SIZE]);

            // Zero marks an absent header checksum.
            if found != 0 && found != calculated {
                header_mismatch = Some(CrcMismatch {
                    found,
                    calculated,
                    in_header: true,
                });
            }
        }

        if !matches!(header.protocol_major(), 1 | 2) {
            warn!(
                version = header.protocol_version,
                "unknown FIT protocol version"
            );
        }

        let end = r.position() + header.data_size as usize;

        let found = data.get(end..end + 2).ok_or(Error::TruncatedInput {
            offset: end,
            wanted: 2,
        })?;
        let found = u16::from_le_bytes([found[0], found[1]]);
        let calculated = crc_of(&data[..end]);

        let crc_mismatch = header_mismatch.or((found != calculated).then_some(CrcMismatch {
            found,
            calculated,
            in_header: false,
        }));

        // Records may not run into the trailing checksum.
        let start = r.position();
        let mut r = ByteReader::new(&data[..end]);
        r.seek(start)?;

        Ok(Self {
            header,
            r,
            end,
            definitions: Default::default(),
            rolling_timestamp: None,
            crc_mismatch,
            done: false,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn crc_mismatch(&self) -> Option<CrcMismatch> {
        self.crc_mismatch
    }

    /// Read records until the next data message, or the end of the document.
    fn advance(&mut self) -> Result<Option<Message>, Error> {
        while self.r.position() < self.end {
            let (local, kind) = decode_record_header(self.r.read_u8()?);

            match kind {
                Left(has_developer_fields) => {
                    let definition = Definition::decode(&mut self.r, has_developer_fields)?;
                    trace!(local, global = definition.global, "definition");
                    self.definitions[local as usize] = Some(definition);
                }
                Right(data_header) => return self.decode_data(local, data_header).map(Some),
            }
        }

        Ok(None)
    }

    fn decode_data(&mut self, local: u8, data_header: DataHeader) -> Result<Message, Error> {
        let definition = self.definitions[local as usize]
            .as_ref()
            .ok_or(Error::MissingDefinition(local))?;

        let mut fields = BTreeMap::new();

        for field in &definition.fields {
            let bytes = self.r.read_bytes(field.size as usize)?;

            if let Some(value) = decode_field(field, bytes, definition.is_little_endian) {
                fields.insert(field.number, value);
            }
        }

        self.r.skip(definition.developer_size)?;

        let mut message = Message {
            global: definition.global,
            fields,
        };

        match data_header {
            DataHeader::Normal => {
                if let Some(timestamp) = message.timestamp() {
                    self.rolling_timestamp = Some(timestamp);
                }
            }
            DataHeader::Compressed(offset) => {
                if let Some(base) = self.rolling_timestamp {
                    let offset = offset as u32;
                    let timestamp = base.wrapping_add(offset.wrapping_sub(base) & 0x1F);

                    self.rolling_timestamp = Some(timestamp);
                    message.fields.insert(
                        TIMESTAMP_FIELD,
                        Field {
                            base_type: BaseType::UInt32,
                            value: Value::U32(timestamp),
                        },
                    );
                } else {
                    trace!(local, "compressed timestamp without a reference");
                }
            }
        }

        Ok(message)
    }
}

impl Iterator for Messages<'_> {
    type Item = Result<Message, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = self.advance().transpose();

        if !matches!(next, Some(Ok(_))) {
            self.done = true;
        }

        next
    }
}
