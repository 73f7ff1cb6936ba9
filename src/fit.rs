//! Garmin FIT decoding.
//!
//! The envelope engine in [`messages`] turns a document into a lazy sequence
//! of [`Message`] field bags. [`decode`] drives that sequence into a receiver
//! implementing [`FromMessages`], which is how the [`mapper`] collects the
//! messages it needs before building an [`Exercise`](crate::Exercise).
//!
//! In most cases (when messages are of a known shape), receivers can be
//! derived. See the [`FromMessages`](macro@FromMessages) and
//! [`FromMessage`](macro@FromMessage) macros for details.

pub mod check;
pub mod data;
pub mod definition;
pub mod header;
pub mod mapper;
pub mod messages;
pub mod profile;

use tracing::warn;

use crate::{CrcPolicy, Error, Options};

pub use data::{Field, FromValue, Value};
pub use messages::{Message, Messages};

/// Derive [`FromMessages`] for a struct collecting messages of a document.
///
/// # Example
///
/// To collect a single message, add the `message(N)` attribute to an
/// `Option<T>` struct field, where `N` is the global message number and `T`
/// implements [`FromMessage`]. Additional messages received for the same
/// number overwrite earlier ones. To collect every occurrence, apply the
/// attribute to a `Vec<T>` instead.
///
/// ```
/// #[derive(Debug, Default, FromMessages)]
/// struct Activity {
///     #[message(0)]
///     file_id: Option<FileId>,
///     #[message(20)]
///     records: Vec<Record>,
/// }
/// ```
pub use crankset_derive::FromMessages;

/// Receive the data messages of a document.
///
/// See the [`FromMessages`](macro@FromMessages) derive macro for an automatic
/// implementation of this trait.
pub trait FromMessages {
    /// Add a message to the receiver. Unwanted messages are ignored.
    fn add_message(&mut self, message: &Message);
}

/// Derive [`FromMessage`] for a struct viewing a single message.
///
/// # Examples
///
/// To receive a field, add the `field(N)` attribute to an `Option<T>` struct
/// field, where `N` is the field number and `T` implements [`FromValue`].
/// Values that do not fit `T` are treated as absent.
///
/// ```
/// #[derive(Debug, Default, FromMessage)]
/// struct Record {
///     #[field(253)]
///     timestamp: Option<u32>,
///     #[field(0)]
///     position_lat: Option<i32>,
///     #[field(2)]
///     altitude: Option<u16>,
/// }
/// ```
///
/// To convert into an arbitrary type, supply a handler closure taking the
/// field's [`Value`]. The field keeps its default when the message lacks the
/// number.
///
/// ```
/// #[derive(Debug, Default, FromMessage)]
/// struct FileId {
///     #[field(0, |v: &Value| u8::from_value(v) == Some(4))]
///     is_activity: bool,
/// }
/// ```
pub use crankset_derive::FromMessage;

/// Build a view of one message.
///
/// See the [`FromMessage`](macro@FromMessage) derive macro for an automatic
/// implementation of this trait.
pub trait FromMessage {
    fn from_message(message: &Message) -> Self;
}

/// Decode a document, publishing every data message to a receiver.
///
/// Checksum mismatches are handled according to `options`: with
/// [`CrcPolicy::Warn`] they are logged once the messages have decoded
/// cleanly; with [`CrcPolicy::Reject`] they fail the decode before any
/// message is published.
pub fn decode(data: &[u8], options: &Options, o: &mut impl FromMessages) -> Result<(), Error> {
    let messages = Messages::new(data)?;
    let mismatch = messages.crc_mismatch();

    if let (Some(m), CrcPolicy::Reject) = (mismatch, options.crc) {
        Err(Error::BadCrc {
            found: m.found,
            calculated: m.calculated,
        })?;
    }

    for message in messages {
        o.add_message(&message?);
    }

    if let Some(m) = mismatch {
        warn!(
            found = m.found,
            calculated = m.calculated,
            in_header = m.in_header,
            "FIT CRC mismatch, keeping cleanly decoded messages"
        );
    }

    Ok(())
}
