//! Polar HSR text exports (`.hsr`).
//!
//! The HRM grammar with an additional `[Summary]` section of device
//! aggregates, which take precedence over the values derived from the
//! other sections.

use tracing::debug;

use crate::{
    Error, Options,
    exercise::{Exercise, FileType},
};

use super::{
    hrm::decode_document,
    text::{Document, Section},
};

/// Decode an HSR export.
pub fn decode(data: &[u8], _options: &Options) -> Result<Exercise, Error> {
    debug!(format = "hsr", bytes = data.len(), "decoding");

    let text = String::from_utf8_lossy(data);
    let document = Document::parse(&text);

    let mut exercise = decode_document(&document, FileType::PolarHsr)?;

    if let Some(summary) = document.section("Summary") {
        apply_summary(&mut exercise, summary)?;
    }

    Ok(exercise)
}

fn apply_summary(exercise: &mut Exercise, summary: &Section) -> Result<(), Error> {
    for (key, value) in summary.pairs() {
        let number = || -> Result<u32, Error> {
            value
                .parse()
                .map_err(|_| Error::CorruptFile(format!("[Summary] malformed {key} {value:?}")))
        };

        match key {
            "Energy" => exercise.energy = number()?,
            "EnergyTotal" => exercise.energy_total = number()?,
            "ExerciseTime" => exercise.sum_exercise_time = number()?,
            "RideTime" => exercise.sum_ride_time = number()?,
            "Odometer" => exercise.odometer = number()?,
            "AvgHR" => exercise.heart_rate_avg = heart_rate(key, number()?)?,
            "MaxHR" => exercise.heart_rate_max = heart_rate(key, number()?)?,
            "MinAltitude" => {
                let altitude: i16 = value.parse().map_err(|_| {
                    Error::CorruptFile(format!("[Summary] malformed {key} {value:?}"))
                })?;

                if let Some(block) = &mut exercise.altitude {
                    block.altitude_min = altitude;
                }
            }
            _ => debug!(key, "unknown summary entry"),
        }
    }

    exercise.project_recording_mode();

    Ok(())
}

fn heart_rate(key: &str, value: u32) -> Result<u16, Error> {
    u16::try_from(value)
        .map_err(|_| Error::CorruptFile(format!("[Summary] {key} {value} out of range")))
}
