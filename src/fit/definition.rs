//! Definition records.

use zerocopy::FromBytes;

use crate::{Error, reader::ByteReader};

/// A FIT base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Enum,
    SInt8,
    UInt8,
    SInt16,
    UInt16,
    SInt32,
    UInt32,
    String,
    Float32,
    Float64,
    UInt8z,
    UInt16z,
    UInt32z,
    Byte,
    SInt64,
    UInt64,
    UInt64z,
}

impl BaseType {
    /// Size of a single element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Enum | Self::SInt8 | Self::UInt8 | Self::String | Self::UInt8z | Self::Byte => 1,
            Self::SInt16 | Self::UInt16 | Self::UInt16z => 2,
            Self::SInt32 | Self::UInt32 | Self::Float32 | Self::UInt32z => 4,
            Self::Float64 | Self::SInt64 | Self::UInt64 | Self::UInt64z => 8,
        }
    }
}

impl TryFrom<u8> for BaseType {
    type Error = Error;

    fn try_from(b: u8) -> Result<Self, Error> {
        Ok(match b {
            0x00 => Self::Enum,
            0x01 => Self::SInt8,
            0x02 => Self::UInt8,
            0x83 => Self::SInt16,
            0x84 => Self::UInt16,
            0x85 => Self::SInt32,
            0x86 => Self::UInt32,
            0x07 => Self::String,
            0x88 => Self::Float32,
            0x89 => Self::Float64,
            0x0A => Self::UInt8z,
            0x8B => Self::UInt16z,
            0x8C => Self::UInt32z,
            0x0D => Self::Byte,
            0x8E => Self::SInt64,
            0x8F => Self::UInt64,
            0x90 => Self::UInt64z,
            _ => Err(Error::UnknownBaseType(b))?,
        })
    }
}

/// Layout of one field in a data message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    pub number: u8,
    /// Bytes occupied in the data message.
    pub size: u8,
    pub base_type: BaseType,
}

/// Layout of the data messages of one local message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub global: u16,
    pub is_little_endian: bool,
    pub fields: Vec<FieldDefinition>,
    /// Total bytes of developer fields, skipped when reading data.
    pub developer_size: usize,
}

#[repr(C)]
#[derive(Debug, FromBytes)]
struct DefinitionMessage {
    _reserved: u8,
    architecture: u8,
    global_message: [u8; 2],
    fields: u8,
}

#[repr(C)]
#[derive(FromBytes)]
struct FieldHeader {
    number: u8,
    size: u8,
    base_type: u8,
}

impl Definition {
    /// Decode a definition message following its record header.
    pub fn decode(r: &mut ByteReader, has_developer_fields: bool) -> Result<Self, Error> {
        let DefinitionMessage {
            architecture,
            global_message,
            fields,
            ..
        } = zerocopy::transmute!(r.take::<5>()?);

        let is_little_endian = architecture == 0;
        let global = if is_little_endian {
            u16::from_le_bytes(global_message)
        } else {
            u16::from_be_bytes(global_message)
        };

        let fields = (0..fields)
            .map(|_| -> Result<FieldDefinition, Error> {
                let FieldHeader {
                    number,
                    size,
                    base_type,
                } = zerocopy::transmute!(r.take::<3>()?);

                Ok(FieldDefinition {
                    number,
                    size,
                    base_type: BaseType::try_from(base_type)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut developer_size = 0;

        if has_developer_fields {
            let count = r.read_u8()?;

            for _ in 0..count {
                // Developer field number, size, and developer data index.
                let [_, size, _] = r.take::<3>()?;
                developer_size += size as usize;
            }
        }

        Ok(Self {
            global,
            is_little_endian,
            fields,
            developer_size,
        })
    }

    /// Bytes occupied by one data message of this definition.
    pub fn data_size(&self) -> usize {
        self.fields.iter().map(|f| f.size as usize).sum::<usize>() + self.developer_size
    }
}
