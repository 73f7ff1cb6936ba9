//! Polar F6, F11 and FA20 raw recordings (`.frd`).
//!
//! A fixed-layout summary: start time, duration, heart rate, energy, four
//! heart-rate zones and the device's lifetime totals. There are no laps or
//! samples. Slabs missing at the end of a short file read as zero.

use tartan_bitfield::bitfield;
use tracing::debug;

use crate::{
    Error, Options,
    exercise::{Exercise, FileType},
    reader::ByteReader,
};

use super::{bcd_date_time, bcd_duration, zone};

/// Size of the header holding date, duration, heart rate and energy.
const HEADER_SIZE: usize = 0x18;
const ZONES: usize = 0x18;
const ZONE_SIZE: usize = 10;
const ZONE_COUNT: usize = 4;
const ENERGY_TOTAL: usize = 0x40;
const SUM_EXERCISE_TIME: usize = 0x44;
const SUM_RIDE_TIME: usize = 0x48;
const ODOMETER: usize = 0x4C;

bitfield! {
    struct ZoneFlags(u8) {
        [0] is_absolute,
    }
}

/// Decode a raw F6/F11 recording.
pub fn decode(data: &[u8], _options: &Options) -> Result<Exercise, Error> {
    debug!(format = "frd", bytes = data.len(), "decoding");

    let mut r = ByteReader::new(data);

    if r.remaining() < HEADER_SIZE {
        Err(Error::TruncatedInput {
            offset: 0,
            wanted: HEADER_SIZE,
        })?;
    }

    let declared = r.read_u16_le()?;
    if usize::from(declared) != data.len() {
        debug!(declared, actual = data.len(), "length field disagrees");
    }

    r.seek(0x0A)?;
    let date_time = bcd_date_time(r.take()?)?;

    let mut exercise = Exercise::new(FileType::PolarF6Raw, date_time);

    exercise.duration = bcd_duration(r.take()?)?;
    exercise.heart_rate_avg = r.read_u8()?.into();
    exercise.heart_rate_max = r.read_u8()?.into();
    exercise.energy = r.read_u16_le()?.into();

    for i in 0..ZONE_COUNT {
        let at = ZONES + ZONE_SIZE * i;

        let byte = |offset: usize| r.u8_at(at + offset).unwrap_or(0);
        let time = |offset: usize| r.u16_le_at(at + offset).unwrap_or(0);

        let limit = zone(
            byte(0),
            byte(1),
            ZoneFlags(byte(2)).is_absolute(),
            [time(4), time(6), time(8)],
        )?;

        exercise.heart_rate_limits.extend(limit);
    }

    let total = |offset: usize| r.u32_le_at(offset).unwrap_or(0);

    exercise.energy_total = total(ENERGY_TOTAL);
    exercise.sum_exercise_time = total(SUM_EXERCISE_TIME);
    exercise.sum_ride_time = total(SUM_RIDE_TIME);
    exercise.odometer = total(ODOMETER);

    exercise.project_recording_mode();

    Ok(exercise)
}
