//! Decoders for exercise recordings from heart-rate monitors and bike
//! computers.
//!
//! Crankset reads Garmin FIT activities, Polar raw recordings (S-series
//! `.srd`/`.sr2` and F6/F11 `.frd`), Polar HRM/HSR text exports and, with the
//! `tcx` feature, Garmin TCX, normalising each into an [`Exercise`].
//!
//! Most users should begin with [`parse`], which selects a decoder from the
//! filename suffix. The FIT envelope engine is exposed in the [`fit`] module
//! for applications needing messages the [`Exercise`] model does not carry.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `tcx`: enable the TCX decoder (default).
//! - `serde`: derive `Serialize` and `Deserialize` for the data model.

// Derive macro output refers to `::crankset`.
extern crate self as crankset;

pub mod dispatch;
pub mod error;
pub mod exercise;
pub mod fit;
pub mod options;
pub mod polar;
pub mod reader;
#[cfg(feature = "tcx")]
pub mod tcx;

pub use dispatch::{Format, parse, parse_bytes, parse_bytes_with, parse_with};
pub use error::Error;
pub use exercise::{
    Exercise, ExerciseAltitude, ExerciseCadence, ExercisePower, ExerciseSpeed,
    ExerciseTemperature, FileType, HeartRateLimit, Lap, LapAltitude, LapSpeed, LapTemperature,
    Position, RecordingMode, Sample,
};
pub use options::{CrcPolicy, Options};
