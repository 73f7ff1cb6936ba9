//! Decoder configuration.

/// Handling of checksum mismatches in FIT documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrcPolicy {
    /// Log the mismatch and keep the record if the messages decode cleanly.
    #[default]
    Warn,
    /// Fail with [`Error::BadCrc`](crate::Error::BadCrc).
    Reject,
}

/// Options shared by all decoders.
///
/// ```
/// let options = crankset::Options {
///     crc: crankset::CrcPolicy::Reject,
/// };
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub crc: CrcPolicy,
}

impl Options {
    /// Options that treat every integrity check as fatal.
    pub fn strict() -> Self {
        Self {
            crc: CrcPolicy::Reject,
        }
    }
}
