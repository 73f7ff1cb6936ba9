//! Errors surfaced by the decoders.

use std::path::PathBuf;

use thiserror::Error;

use crate::fit::header::HeaderError;

/// An error decoding an exercise recording.
///
/// Every decoder fails fast with exactly one of these; partial records are
/// never returned. The dispatcher passes them through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// The path did not resolve to a file.
    #[error("File not found: {}.", .0.display())]
    FileNotFound(PathBuf),
    /// The file exists but could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// No decoder is registered for the filename suffix.
    #[error("Unsupported format ({0:?}).")]
    UnsupportedFormat(String),
    /// A read would run past the end of the data.
    #[error("Truncated input: wanted {wanted} bytes at offset {offset}.")]
    TruncatedInput { offset: usize, wanted: usize },
    /// Incorrect file type marker.
    #[error("Incorrect file type marker.")]
    BadMagic,
    /// The file header does not match the declared format.
    #[error("Bad header: {0}.")]
    BadHeader(String),
    /// Calculated and found CRC values do not match.
    #[error("Calculated ({calculated:#06x}) and found ({found:#06x}) CRC values do not match.")]
    BadCrc { found: u16, calculated: u16 },
    /// A FIT field definition names a base type outside the profile.
    #[error("Unknown base type ({0:#04x}).")]
    UnknownBaseType(u8),
    /// A FIT data message references a local type with no definition.
    #[error("No definition for local message type {0}.")]
    MissingDefinition(u8),
    /// The file is structurally valid but holds no exercise.
    #[error("Not an exercise: {0}.")]
    NotAnExercise(String),
    /// The file decodes but its content is inconsistent.
    #[error("Corrupt file: {0}.")]
    CorruptFile(String),
}

impl From<HeaderError> for Error {
    fn from(err: HeaderError) -> Self {
        match err {
            HeaderError::NotFitData => Self::BadMagic,
            other => Self::BadHeader(other.to_string()),
        }
    }
}
