//! Polar S-series raw recordings (`.srd`, `.sr2`).
//!
//! A fixed header is followed by aggregate slabs, the lap array and the
//! sample array. Which slabs exist, and the size of every lap and sample,
//! depend on the channels enabled in the header's mode byte.

use tartan_bitfield::bitfield;
use tracing::{debug, trace};
use zerocopy::{
    FromBytes,
    byteorder::little_endian::{U16, U32},
};

use crate::{
    Error, Options,
    exercise::{
        Exercise, ExerciseAltitude, ExerciseCadence, ExercisePower, ExerciseSpeed,
        ExerciseTemperature, FileType, Lap, LapAltitude, LapSpeed, LapTemperature, Sample,
    },
    reader::ByteReader,
};

use super::{bcd_date_time, bcd_duration, fill_lap_speeds, zone};

#[repr(C)]
#[derive(FromBytes)]
struct RawZone {
    lower: u8,
    upper: u8,
    below: U16,
    within: U16,
    above: U16,
}

#[repr(C)]
#[derive(FromBytes)]
struct RawHeader {
    file_length: U16,
    exercise_number: u8,
    label: [u8; 7],
    date: [u8; 6],
    duration: [u8; 4],
    heart_rate_avg: u8,
    heart_rate_max: u8,
    lap_count: u8,
    interval: u8,
    mode: u8,
    energy: U16,
    energy_total: U32,
    exercise_hours: U16,
    exercise_minutes: u8,
    ride_hours: U16,
    ride_minutes: u8,
    odometer: U32,
    sample_count: U16,
    zones: [RawZone; 3],
}

/// Size of the fixed header.
pub const HEADER_SIZE: usize = size_of::<RawHeader>();

bitfield! {
    struct Mode(u8) {
        [0] speed,
        [1] cadence,
        [2] altitude,
        [3] power,
        [4] interval_training,
        [5..7] bike_number: u8,
    }
}

/// Decode a sign-magnitude altitude: the high bit marks a negative value,
/// the low 15 bits hold its magnitude.
fn sign_magnitude(raw: u16) -> i16 {
    let magnitude = (raw & 0x7FFF) as i16;

    if raw & 0x8000 != 0 { -magnitude } else { magnitude }
}

fn read_altitude(r: &mut ByteReader) -> Result<i16, Error> {
    r.read_u16_le().map(sign_magnitude)
}

/// Speed in 1/16 km/h.
fn read_speed(r: &mut ByteReader) -> Result<f32, Error> {
    r.read_u16_le().map(|s| f32::from(s) / 16.0)
}

fn interval(code: u8) -> Result<u16, Error> {
    Ok(match code {
        0 => 5,
        1 => 15,
        2 => 60,
        3 => 1,
        other => Err(Error::CorruptFile(format!(
            "unknown recording interval code {other}"
        )))?,
    })
}

/// Decode a raw S-series recording.
pub fn decode(data: &[u8], _options: &Options) -> Result<Exercise, Error> {
    debug!(format = "srd", bytes = data.len(), "decoding");

    let mut r = ByteReader::new(data);

    let RawHeader {
        file_length,
        exercise_number,
        label,
        date,
        duration,
        heart_rate_avg,
        heart_rate_max,
        lap_count,
        interval: interval_code,
        mode,
        energy,
        energy_total,
        exercise_hours,
        exercise_minutes,
        ride_hours,
        ride_minutes,
        odometer,
        sample_count,
        zones,
    } = zerocopy::transmute!(r.take::<HEADER_SIZE>()?);

    if usize::from(file_length.get()) != data.len() {
        debug!(
            declared = file_length.get(),
            actual = data.len(),
            "length field disagrees"
        );
    }

    trace!(
        exercise_number,
        label = %String::from_utf8_lossy(&label).trim_end_matches('\0'),
        "exercise"
    );

    let mode = Mode(mode);
    let interval = interval(interval_code)?;

    let mut exercise = Exercise::new(FileType::PolarSrd, bcd_date_time(date)?);

    exercise.duration = bcd_duration(duration)?;
    exercise.recording_interval = Some(interval);
    exercise.recording_mode.interval_training = mode.interval_training();
    exercise.recording_mode.bike_number = mode.bike_number();
    exercise.heart_rate_avg = heart_rate_avg.into();
    exercise.heart_rate_max = heart_rate_max.into();
    exercise.energy = energy.get().into();
    exercise.energy_total = energy_total.get();
    exercise.sum_exercise_time = u32::from(exercise_hours.get()) * 60 + u32::from(exercise_minutes);
    exercise.sum_ride_time = u32::from(ride_hours.get()) * 60 + u32::from(ride_minutes);
    exercise.odometer = odometer.get();

    for z in zones {
        let limit = zone(
            z.lower,
            z.upper,
            true,
            [z.below.get(), z.within.get(), z.above.get()],
        )?;
        exercise.heart_rate_limits.extend(limit);
    }

    decode_aggregates(&mut r, &mode, &mut exercise)?;

    exercise.laps = (0..lap_count)
        .map(|_| decode_lap(&mut r, &mode))
        .collect::<Result<_, _>>()?;
    fill_lap_speeds(&mut exercise.laps);

    exercise.samples = decode_samples(&mut r, &mode, sample_count.get(), interval)?;

    if !r.is_empty() {
        trace!(trailing = r.remaining(), "bytes after the sample array");
    }

    exercise.project_recording_mode();

    Ok(exercise)
}

fn decode_aggregates(
    r: &mut ByteReader,
    mode: &Mode,
    exercise: &mut Exercise,
) -> Result<(), Error> {
    if mode.speed() {
        let distance = r.read_u32_le()?;
        let speed_avg = read_speed(r)?;
        let speed_max = read_speed(r)?;
        let bike_counter = r.read_u32_le()?;

        exercise.speed = Some(ExerciseSpeed {
            distance,
            speed_avg,
            speed_max,
            bike_counter: (bike_counter != 0).then_some(bike_counter),
        });
    }

    if mode.cadence() {
        exercise.cadence = Some(ExerciseCadence {
            cadence_avg: r.read_u8()?.into(),
            cadence_max: r.read_u8()?.into(),
        });
    }

    if mode.altitude() {
        exercise.altitude = Some(ExerciseAltitude {
            altitude_min: read_altitude(r)?,
            altitude_avg: read_altitude(r)?,
            altitude_max: read_altitude(r)?,
            ascent: r.read_u16_le()?.into(),
            descent: 0,
        });

        exercise.temperature = Some(ExerciseTemperature {
            temperature_min: r.read_i8()?.into(),
            temperature_avg: r.read_i8()?.into(),
            temperature_max: r.read_i8()?.into(),
        });
    }

    if mode.power() {
        exercise.power = Some(ExercisePower {
            power_avg: r.read_u16_le()?,
            power_max: r.read_u16_le()?,
            power_normalized: 0,
        });
    }

    Ok(())
}

/// Decode one lap. The lap's average speed is filled in afterwards.
fn decode_lap(r: &mut ByteReader, mode: &Mode) -> Result<Lap, Error> {
    let time_split = r.read_u32_le()?;
    let heart_rate_split = r.read_u8()?;
    let heart_rate_avg = r.read_u8()?;
    let heart_rate_max = r.read_u8()?;

    let mut lap = Lap {
        time_split,
        heart_rate_split: Some(heart_rate_split.into()),
        heart_rate_avg: Some(heart_rate_avg.into()),
        heart_rate_max: Some(heart_rate_max.into()),
        ..Default::default()
    };

    if mode.speed() {
        let speed_end = read_speed(r)?;
        let distance = r.read_u32_le()?;

        lap.speed = Some(LapSpeed {
            speed_end,
            speed_avg: 0.0,
            distance,
        });
    }

    if mode.cadence() {
        r.skip(1)?;
    }

    if mode.altitude() {
        lap.altitude = Some(LapAltitude {
            altitude: read_altitude(r)?,
            ascent: r.read_u16_le()?.into(),
        });
        lap.temperature = Some(LapTemperature {
            temperature: r.read_i8()?.into(),
        });
    }

    if mode.power() {
        r.skip(2)?;
    }

    Ok(lap)
}

fn decode_samples(
    r: &mut ByteReader,
    mode: &Mode,
    count: u16,
    interval: u16,
) -> Result<Vec<Sample>, Error> {
    let mut samples = Vec::with_capacity(count.into());
    let mut distance = 0.0f64;

    for i in 0..u32::from(count) {
        let mut sample = Sample {
            timestamp: i * u32::from(interval) * 1000,
            heart_rate: Some(r.read_u8()?.into()),
            ..Default::default()
        };

        if mode.speed() {
            let speed = read_speed(r)?;

            sample.speed = Some(speed);
            sample.distance = Some(distance.round() as u32);
            distance += f64::from(speed) / 3.6 * f64::from(interval);
        }

        if mode.cadence() {
            sample.cadence = Some(r.read_u8()?.into());
        }

        if mode.altitude() {
            sample.altitude = Some(read_altitude(r)?);
        }

        if mode.power() {
            sample.power = Some(r.read_u16_le()?);
        }

        samples.push(sample);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        assert_eq!(HEADER_SIZE, 67);
    }

    #[test]
    fn sign_magnitude_altitudes() {
        assert_eq!(sign_magnitude(0x0000), 0);
        assert_eq!(sign_magnitude(0x01F4), 500);
        assert_eq!(sign_magnitude(0x8014), -20);
        assert_eq!(sign_magnitude(0xFFFF), -0x7FFF);
    }

    #[test]
    fn mode_bits() {
        let mode = Mode(0b0101_0101);
        assert!(mode.speed() && mode.altitude() && mode.interval_training());
        assert!(!mode.cadence() && !mode.power());
        assert_eq!(mode.bike_number(), 2);
    }
}
