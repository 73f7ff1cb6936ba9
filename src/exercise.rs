//! The normalised exercise record produced by every decoder.
//!
//! Units are fixed across formats: durations and split times in tenths of a
//! second, sample timestamps in milliseconds from the session start,
//! distances in metres, speeds in km/h, altitudes in metres, temperatures in
//! degrees Celsius and positions in decimal degrees.

use chrono::NaiveDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Source format of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FileType {
    PolarHsr,
    PolarHrm,
    /// Polar S-series raw (`.srd`, `.sr2`).
    PolarSrd,
    /// Polar F6/F11/FA20 raw (`.frd`).
    PolarF6Raw,
    GarminTcx,
    GarminFit,
}

/// A single exercise session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Exercise {
    pub file_type: FileType,
    pub device_name: Option<String>,
    /// Civil start time as the device recorded it (no zone).
    pub date_time: NaiveDateTime,
    /// Tenths of a second.
    pub duration: u32,
    /// Seconds between samples, absent for variable-rate recordings.
    pub recording_interval: Option<u16>,
    pub recording_mode: RecordingMode,
    pub heart_rate_avg: u16,
    pub heart_rate_max: u16,
    /// Kilocalories burned in this session.
    pub energy: u32,
    /// Lifetime kilocalories reported by the device.
    pub energy_total: u32,
    /// Lifetime exercise time in minutes.
    pub sum_exercise_time: u32,
    /// Lifetime ride time in minutes.
    pub sum_ride_time: u32,
    /// Lifetime distance in kilometres.
    pub odometer: u32,
    pub speed: Option<ExerciseSpeed>,
    pub altitude: Option<ExerciseAltitude>,
    pub cadence: Option<ExerciseCadence>,
    pub temperature: Option<ExerciseTemperature>,
    pub power: Option<ExercisePower>,
    pub heart_rate_limits: Vec<HeartRateLimit>,
    pub laps: Vec<Lap>,
    pub samples: Vec<Sample>,
}

impl Exercise {
    /// An empty record, to be filled in by a decoder.
    pub(crate) fn new(file_type: FileType, date_time: NaiveDateTime) -> Self {
        Self {
            file_type,
            device_name: None,
            date_time,
            duration: 0,
            recording_interval: None,
            recording_mode: RecordingMode::default(),
            heart_rate_avg: 0,
            heart_rate_max: 0,
            energy: 0,
            energy_total: 0,
            sum_exercise_time: 0,
            sum_ride_time: 0,
            odometer: 0,
            speed: None,
            altitude: None,
            cadence: None,
            temperature: None,
            power: None,
            heart_rate_limits: Vec::new(),
            laps: Vec::new(),
            samples: Vec::new(),
        }
    }

    /// The last sample taken at or before `timestamp` (milliseconds).
    pub fn sample_at(&self, timestamp: u32) -> Option<&Sample> {
        let i = self.samples.partition_point(|s| s.timestamp <= timestamp);
        i.checked_sub(1).map(|i| &self.samples[i])
    }

    /// Set the recording flags from the populated blocks and sample channels.
    ///
    /// `interval_training` and `bike_number` are device settings rather than
    /// data and are left as the decoder set them.
    pub(crate) fn project_recording_mode(&mut self) {
        let any = |f: fn(&Sample) -> bool| self.samples.iter().any(f);

        let mode = RecordingMode {
            heart_rate: self.heart_rate_avg > 0
                || self.heart_rate_max > 0
                || any(|s| s.heart_rate.is_some()),
            speed: self.speed.is_some(),
            cadence: self.cadence.is_some(),
            altitude: self.altitude.is_some(),
            power: self.power.is_some(),
            location: any(|s| s.position.is_some())
                || self.laps.iter().any(|l| l.position_split.is_some()),
            temperature: self.temperature.is_some(),
            ..self.recording_mode
        };

        self.recording_mode = mode;
    }
}

/// Minimum, rounded mean and maximum of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Summary {
    pub min: i64,
    pub avg: i64,
    pub max: i64,
}

impl Summary {
    pub fn of<T: Into<i64>>(values: impl IntoIterator<Item = T>) -> Option<Self> {
        let (mut min, mut max, mut sum, mut n) = (i64::MAX, i64::MIN, 0i128, 0i128);

        for v in values {
            let v = v.into();
            min = min.min(v);
            max = max.max(v);
            sum += i128::from(v);
            n += 1;
        }

        (n > 0).then(|| Self {
            min,
            avg: (sum as f64 / n as f64).round() as i64,
            max,
        })
    }
}

/// Signal channels captured by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecordingMode {
    pub heart_rate: bool,
    pub speed: bool,
    pub cadence: bool,
    pub altitude: bool,
    pub power: bool,
    pub location: bool,
    pub temperature: bool,
    pub interval_training: bool,
    /// Bike profile used on multi-bike Polar devices (0 when none).
    pub bike_number: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExerciseSpeed {
    /// Metres.
    pub distance: u32,
    /// km/h.
    pub speed_avg: f32,
    /// km/h.
    pub speed_max: f32,
    /// Raw bike counter value, on devices that keep one.
    pub bike_counter: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExerciseAltitude {
    pub altitude_min: i16,
    pub altitude_avg: i16,
    pub altitude_max: i16,
    pub ascent: u32,
    pub descent: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExerciseCadence {
    pub cadence_avg: u16,
    pub cadence_max: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExerciseTemperature {
    pub temperature_min: i16,
    pub temperature_avg: i16,
    pub temperature_max: i16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExercisePower {
    pub power_avg: u16,
    pub power_max: u16,
    pub power_normalized: u16,
}

/// A heart-rate zone with the time spent around it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeartRateLimit {
    pub lower_heart_rate: u16,
    pub upper_heart_rate: u16,
    /// Bounds are bpm when set, percent of the user's maximum otherwise.
    pub absolute_range: bool,
    /// Seconds.
    pub time_below: u32,
    pub time_within: u32,
    pub time_above: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Lap {
    /// Tenths of a second from the session start.
    pub time_split: u32,
    pub heart_rate_avg: Option<u16>,
    pub heart_rate_max: Option<u16>,
    pub heart_rate_split: Option<u16>,
    pub speed: Option<LapSpeed>,
    pub altitude: Option<LapAltitude>,
    pub temperature: Option<LapTemperature>,
    pub position_split: Option<Position>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LapSpeed {
    /// Speed at the split, km/h.
    pub speed_end: f32,
    /// Average over the lap, km/h.
    pub speed_avg: f32,
    /// Metres from the session start to the split.
    pub distance: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LapAltitude {
    /// Altitude at the split.
    pub altitude: i16,
    pub ascent: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LapTemperature {
    pub temperature: i16,
}

/// One reading of the live channels. Channels the device did not capture
/// for this reading are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Milliseconds from the session start.
    pub timestamp: u32,
    pub heart_rate: Option<u16>,
    /// Metres from the session start.
    pub distance: Option<u32>,
    /// km/h.
    pub speed: Option<f32>,
    pub altitude: Option<i16>,
    pub cadence: Option<u16>,
    pub temperature: Option<i16>,
    pub power: Option<u16>,
    pub position: Option<Position>,
}

/// WGS-84 coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Convert a FIT semicircle pair, where 2^31 semicircles are 180°.
    pub fn from_semicircles(latitude: i32, longitude: i32) -> Self {
        const DEGREES_PER_SEMICIRCLE: f64 = 180.0 / (1u64 << 31) as f64;

        Self {
            latitude: latitude as f64 * DEGREES_PER_SEMICIRCLE,
            longitude: longitude as f64 * DEGREES_PER_SEMICIRCLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semicircles() {
        let p = Position::from_semicircles(1 << 30, -(1 << 30));
        assert_eq!(p.latitude, 90.0);
        assert_eq!(p.longitude, -90.0);

        // 51.05553° N, as stored by an Edge 500.
        let p = Position::from_semicircles(609_116_199, 0);
        assert!((p.latitude - 51.055_53).abs() < 1e-5);
    }

    #[test]
    fn sample_lookup() {
        let mut exercise = Exercise::new(FileType::GarminFit, NaiveDateTime::default());
        exercise.samples = [1000, 2000, 2000, 5000]
            .into_iter()
            .enumerate()
            .map(|(i, timestamp)| Sample {
                timestamp,
                heart_rate: Some(100 + i as u16),
                ..Default::default()
            })
            .collect();

        assert_eq!(exercise.sample_at(500), None);
        assert_eq!(exercise.sample_at(2000).unwrap().heart_rate, Some(102));
        assert_eq!(exercise.sample_at(4999).unwrap().heart_rate, Some(102));
        assert_eq!(exercise.sample_at(9000).unwrap().heart_rate, Some(103));
    }

    #[test]
    fn summaries() {
        let s = Summary::of([20i16, 19, 32, 24]).unwrap();
        assert_eq!((s.min, s.avg, s.max), (19, 24, 32));
        assert_eq!(Summary::of([1u8, 2]).unwrap().avg, 2);
        assert!(Summary::of(Vec::<u16>::new()).is_none());
    }

    #[test]
    fn recording_mode_follows_blocks() {
        let mut exercise = Exercise::new(FileType::PolarHrm, NaiveDateTime::default());
        exercise.recording_mode.bike_number = 2;
        exercise.altitude = Some(ExerciseAltitude::default());
        exercise.samples.push(Sample {
            position: Some(Position::new(1.0, 2.0)),
            ..Default::default()
        });

        exercise.project_recording_mode();

        let mode = exercise.recording_mode;
        assert!(mode.altitude && mode.location);
        assert!(!mode.heart_rate && !mode.speed && !mode.cadence);
        assert_eq!(mode.bike_number, 2);
    }
}
