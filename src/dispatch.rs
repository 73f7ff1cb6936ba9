//! Format selection by filename suffix.

use std::{io::ErrorKind, path::Path};

use tracing::debug;

use crate::{Error, Options, exercise::Exercise, fit, polar};

/// A decoder for one format.
pub type Decoder = fn(&[u8], &Options) -> Result<Exercise, Error>;

/// Supported recording formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    GarminFit,
    PolarSrd,
    PolarF6Raw,
    PolarHrm,
    PolarHsr,
    #[cfg(feature = "tcx")]
    GarminTcx,
}

const DECODERS: &[(&str, Format, Decoder)] = &[
    ("fit", Format::GarminFit, fit::mapper::decode),
    ("srd", Format::PolarSrd, polar::srd::decode),
    ("sr2", Format::PolarSrd, polar::srd::decode),
    ("frd", Format::PolarF6Raw, polar::f6::decode),
    ("hrm", Format::PolarHrm, polar::hrm::decode),
    ("hsr", Format::PolarHsr, polar::hsr::decode),
    #[cfg(feature = "tcx")]
    ("tcx", Format::GarminTcx, crate::tcx::decode),
];

impl Format {
    /// Select a format from a filename (or bare suffix), comparing the text
    /// after the final dot case-insensitively.
    pub fn from_suffix(name: &str) -> Result<Self, Error> {
        Self::lookup(name).map(|(format, _)| format)
    }

    fn lookup(name: &str) -> Result<(Self, Decoder), Error> {
        let suffix = name.rsplit_once('.').map_or(name, |(_, s)| s);

        DECODERS
            .iter()
            .find(|(s, ..)| s.eq_ignore_ascii_case(suffix))
            .map(|&(_, format, decoder)| (format, decoder))
            .ok_or_else(|| Error::UnsupportedFormat(suffix.to_owned()))
    }
}

/// Decode the exercise file at `path` with default options.
pub fn parse(path: impl AsRef<Path>) -> Result<Exercise, Error> {
    parse_with(path, &Options::default())
}

/// Decode the exercise file at `path`.
///
/// The format is chosen from the suffix before the file is opened, so an
/// unsupported name fails without touching the filesystem.
pub fn parse_with(path: impl AsRef<Path>, options: &Options) -> Result<Exercise, Error> {
    let path = path.as_ref();
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();

    let (format, decoder) = Format::lookup(&name)?;

    let data = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::FileNotFound(path.to_owned()),
        _ => Error::Io(e),
    })?;

    debug!(path = %path.display(), ?format, "parsing");

    decoder(&data, options)
}

/// Decode an in-memory recording, using `suffix_hint` (a filename or bare
/// suffix) to select the format.
pub fn parse_bytes(data: &[u8], suffix_hint: &str) -> Result<Exercise, Error> {
    parse_bytes_with(data, suffix_hint, &Options::default())
}

pub fn parse_bytes_with(
    data: &[u8],
    suffix_hint: &str,
    options: &Options,
) -> Result<Exercise, Error> {
    let (_, decoder) = Format::lookup(suffix_hint)?;

    decoder(data, options)
}
