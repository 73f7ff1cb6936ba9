//! Lifting FIT activity messages into an [`Exercise`].

use chrono::{DateTime, NaiveDateTime};
use tracing::{debug, trace};

use crate::{
    Error, Options,
    exercise::{
        Exercise, ExerciseAltitude, ExerciseCadence, ExercisePower, ExerciseSpeed,
        ExerciseTemperature, FileType, Lap, LapAltitude, LapSpeed, LapTemperature, Position,
        Sample, Summary,
    },
};

use super::{
    FromMessage, FromMessages, FromValue, Value,
    profile::{self, FIT_EPOCH_OFFSET, Sport},
};

#[derive(Debug, Default, FromMessages)]
struct Activity {
    #[message(0)]
    file_id: Option<FileId>,
    #[message(18)]
    sessions: Vec<Session>,
    #[message(19)]
    laps: Vec<LapMessage>,
    #[message(20)]
    records: Vec<RecordMessage>,
    #[message(21)]
    events: Vec<Event>,
    #[message(23)]
    devices: Vec<DeviceInfo>,
    #[message(34)]
    activity: Option<ActivityMessage>,
}

#[derive(Debug, Default, FromMessage)]
struct FileId {
    #[field(0)]
    file_type: Option<u8>,
    #[field(1)]
    manufacturer: Option<u16>,
    #[field(2)]
    product: Option<u16>,
    #[field(4)]
    time_created: Option<u32>,
}

#[derive(Debug, Default, FromMessage)]
struct Session {
    #[field(2)]
    start_time: Option<u32>,
    #[field(5, |v: &Value| u8::from_value(v).map(Sport::from))]
    sport: Option<Sport>,
    #[field(7)]
    total_elapsed_time: Option<u32>,
    #[field(8)]
    total_timer_time: Option<u32>,
    #[field(9)]
    total_distance: Option<u32>,
    #[field(11)]
    total_calories: Option<u16>,
    #[field(14)]
    avg_speed: Option<u16>,
    #[field(15)]
    max_speed: Option<u16>,
    #[field(16)]
    avg_heart_rate: Option<u8>,
    #[field(17)]
    max_heart_rate: Option<u8>,
    #[field(18)]
    avg_cadence: Option<u8>,
    #[field(19)]
    max_cadence: Option<u8>,
    #[field(20)]
    avg_power: Option<u16>,
    #[field(21)]
    max_power: Option<u16>,
    #[field(22)]
    total_ascent: Option<u16>,
    #[field(23)]
    total_descent: Option<u16>,
    #[field(34)]
    normalized_power: Option<u16>,
    #[field(49)]
    avg_altitude: Option<u16>,
    #[field(50)]
    max_altitude: Option<u16>,
    #[field(57)]
    avg_temperature: Option<i8>,
    #[field(58)]
    max_temperature: Option<i8>,
    #[field(71)]
    min_altitude: Option<u16>,
    #[field(124)]
    enhanced_avg_speed: Option<u32>,
    #[field(125)]
    enhanced_max_speed: Option<u32>,
    #[field(126)]
    enhanced_avg_altitude: Option<u32>,
    #[field(127)]
    enhanced_min_altitude: Option<u32>,
    #[field(128)]
    enhanced_max_altitude: Option<u32>,
    #[field(150)]
    min_temperature: Option<i8>,
}

#[derive(Debug, Default, FromMessage)]
struct LapMessage {
    #[field(253)]
    timestamp: Option<u32>,
    #[field(5)]
    end_position_lat: Option<i32>,
    #[field(6)]
    end_position_long: Option<i32>,
    #[field(7)]
    total_elapsed_time: Option<u32>,
    #[field(9)]
    total_distance: Option<u32>,
    #[field(13)]
    avg_speed: Option<u16>,
    #[field(15)]
    avg_heart_rate: Option<u8>,
    #[field(16)]
    max_heart_rate: Option<u8>,
    #[field(21)]
    total_ascent: Option<u16>,
    #[field(110)]
    enhanced_avg_speed: Option<u32>,
}

#[derive(Debug, Default, FromMessage)]
struct RecordMessage {
    #[field(253)]
    timestamp: Option<u32>,
    #[field(0)]
    position_lat: Option<i32>,
    #[field(1)]
    position_long: Option<i32>,
    #[field(2)]
    altitude: Option<u16>,
    #[field(3)]
    heart_rate: Option<u8>,
    #[field(4)]
    cadence: Option<u8>,
    #[field(5)]
    distance: Option<u32>,
    #[field(6)]
    speed: Option<u16>,
    #[field(7)]
    power: Option<u16>,
    #[field(13)]
    temperature: Option<i8>,
    #[field(73)]
    enhanced_speed: Option<u32>,
    #[field(78)]
    enhanced_altitude: Option<u32>,
}

#[derive(Debug, Default, FromMessage)]
struct Event {
    #[field(0)]
    event: Option<u8>,
    #[field(1)]
    event_type: Option<u8>,
}

#[derive(Debug, Default, FromMessage)]
struct DeviceInfo {
    #[field(0)]
    device_index: Option<u8>,
    #[field(27)]
    product_name: Option<String>,
}

#[derive(Debug, Default, FromMessage)]
struct ActivityMessage {
    #[field(253)]
    timestamp: Option<u32>,
    #[field(5)]
    local_timestamp: Option<u32>,
}

impl Event {
    /// `timer` event of type `stop_all`.
    fn is_timer_stop(&self) -> bool {
        self.event == Some(0) && self.event_type == Some(4)
    }
}

/// Device index of the recording device in `device_info`.
const CREATOR: u8 = 0;

/// Largest plausible distance between UTC and device time.
const MAX_UTC_OFFSET: i64 = 14 * 3600;

/// Decode a FIT activity file.
pub fn decode(data: &[u8], options: &Options) -> Result<Exercise, Error> {
    debug!(format = "fit", bytes = data.len(), "decoding");

    let mut activity = Activity::default();
    super::decode(data, options, &mut activity)?;

    activity.into_exercise()
}

impl Activity {
    fn into_exercise(self) -> Result<Exercise, Error> {
        let file_id = self
            .file_id
            .as_ref()
            .ok_or_else(|| Error::NotAnExercise("no file_id message".into()))?;

        match file_id.file_type {
            Some(profile::FILE_TYPE_ACTIVITY) => {}
            other => Err(Error::NotAnExercise(match other {
                Some(t) => format!("file type {t} is not an activity"),
                None => "file type is missing".into(),
            }))?,
        }

        let session = self
            .sessions
            .first()
            .ok_or_else(|| Error::NotAnExercise("no session message".into()))?;

        if self.sessions.len() > 1 {
            debug!(
                sessions = self.sessions.len(),
                "multi-sport activity, keeping the first session"
            );
        }

        trace!(
            laps = self.laps.len(),
            records = self.records.len(),
            pauses = self.events.iter().filter(|e| e.is_timer_stop()).count(),
            "collected messages"
        );

        let start = session
            .start_time
            .or_else(|| self.records.iter().filter_map(|r| r.timestamp).min())
            .or(file_id.time_created)
            .ok_or_else(|| Error::CorruptFile("session has no start time".into()))?;

        let mut exercise = Exercise::new(FileType::GarminFit, self.civil_time(start)?);

        exercise.device_name = file_id
            .manufacturer
            .and_then(|m| profile::device_name(m, file_id.product))
            .or_else(|| self.product_name());

        exercise.duration = session
            .total_timer_time
            .or(session.total_elapsed_time)
            .map_or(0, tenths);
        exercise.heart_rate_avg = session.avg_heart_rate.unwrap_or(0).into();
        exercise.heart_rate_max = session.max_heart_rate.unwrap_or(0).into();
        exercise.energy = session.total_calories.unwrap_or(0).into();

        exercise.samples = samples(&self.records, start);

        exercise.speed = session.speed(&exercise.samples);
        exercise.altitude = session.altitude(&exercise.samples);
        exercise.temperature = session.temperature(&exercise.samples);
        exercise.cadence = session.cadence();
        exercise.power = session.power();

        exercise.laps = self.map_laps(&exercise, start);

        exercise.project_recording_mode();

        Ok(exercise)
    }

    /// The device's civil time at `start`, derived from the UTC offset the
    /// activity message records.
    fn civil_time(&self, start: u32) -> Result<NaiveDateTime, Error> {
        let offset = self
            .activity
            .as_ref()
            .and_then(|a| Some(i64::from(a.local_timestamp?) - i64::from(a.timestamp?)))
            .filter(|o| o.abs() <= MAX_UTC_OFFSET)
            .unwrap_or(0);

        DateTime::from_timestamp(FIT_EPOCH_OFFSET + i64::from(start) + offset, 0)
            .map(|t| t.naive_utc())
            .ok_or_else(|| Error::CorruptFile(format!("start time {start} out of range")))
    }

    fn product_name(&self) -> Option<String> {
        let named = self.devices.iter().filter(|d| d.product_name.is_some());

        named
            .clone()
            .find(|d| d.device_index == Some(CREATOR))
            .or_else(|| named.clone().next())
            .and_then(|d| d.product_name.clone())
    }

    fn map_laps(&self, exercise: &Exercise, start: u32) -> Vec<Lap> {
        // Milliseconds and centimetres from the session start.
        let mut elapsed = 0u64;
        let mut distance = 0u64;

        self.laps
            .iter()
            .map(|lap| {
                match (lap.total_elapsed_time, lap.timestamp) {
                    (Some(t), _) => elapsed += u64::from(t),
                    (None, Some(end)) => {
                        elapsed = elapsed.max(u64::from(end.saturating_sub(start)) * 1000)
                    }
                    (None, None) => {}
                }
                distance += u64::from(lap.total_distance.unwrap_or(0));

                let time_split = u32::try_from((elapsed + 50) / 100).unwrap_or(u32::MAX);
                let at_split = exercise.sample_at(time_split.saturating_mul(100));

                let speed = exercise.speed.map(|_| LapSpeed {
                    speed_end: at_split.and_then(|s| s.speed).unwrap_or(0.0),
                    speed_avg: lap
                        .enhanced_avg_speed
                        .or(lap.avg_speed.map(u32::from))
                        .map_or(0.0, km_h),
                    distance: u32::try_from((distance + 50) / 100).unwrap_or(u32::MAX),
                });

                let altitude = exercise.altitude.map(|_| LapAltitude {
                    altitude: at_split.and_then(|s| s.altitude).unwrap_or(0),
                    ascent: lap.total_ascent.unwrap_or(0).into(),
                });

                let temperature = exercise.temperature.map(|_| LapTemperature {
                    temperature: at_split.and_then(|s| s.temperature).unwrap_or(0),
                });

                let position_split = match (lap.end_position_lat, lap.end_position_long) {
                    (Some(lat), Some(long)) => Some(Position::from_semicircles(lat, long)),
                    _ => at_split.and_then(|s| s.position),
                };

                Lap {
                    time_split,
                    heart_rate_avg: lap.avg_heart_rate.map(u16::from),
                    heart_rate_max: lap.max_heart_rate.map(u16::from),
                    heart_rate_split: at_split.and_then(|s| s.heart_rate),
                    speed,
                    altitude,
                    temperature,
                    position_split,
                }
            })
            .collect()
    }
}

impl Session {
    fn speed(&self, samples: &[Sample]) -> Option<ExerciseSpeed> {
        let avg = self.enhanced_avg_speed.or(self.avg_speed.map(u32::from));
        let max = self.enhanced_max_speed.or(self.max_speed.map(u32::from));

        let reported = self.total_distance.is_some() || avg.is_some() || max.is_some();
        let sampled = samples
            .iter()
            .any(|s| s.speed.is_some() || s.distance.is_some());

        if !reported && !sampled {
            return None;
        }

        let distance = self
            .total_distance
            .map(centimetres_to_metres)
            .or_else(|| samples.iter().rev().find_map(|s| s.distance))
            .unwrap_or(0);

        Some(ExerciseSpeed {
            distance,
            speed_avg: avg.map_or(0.0, km_h),
            speed_max: max.map_or(0.0, km_h),
            bike_counter: None,
        })
    }

    fn altitude(&self, samples: &[Sample]) -> Option<ExerciseAltitude> {
        let min = self
            .enhanced_min_altitude
            .or(self.min_altitude.map(u32::from))
            .map(altitude);
        let avg = self
            .enhanced_avg_altitude
            .or(self.avg_altitude.map(u32::from))
            .map(altitude);
        let max = self
            .enhanced_max_altitude
            .or(self.max_altitude.map(u32::from))
            .map(altitude);

        let sampled = Summary::of(samples.iter().filter_map(|s| s.altitude));

        let reported = min.is_some() || avg.is_some() || max.is_some();
        if !reported && self.total_ascent.is_none() && sampled.is_none() {
            return None;
        }

        Some(ExerciseAltitude {
            altitude_min: min.or(sampled.map(|s| s.min as i16)).unwrap_or(0),
            altitude_avg: avg.or(sampled.map(|s| s.avg as i16)).unwrap_or(0),
            altitude_max: max.or(sampled.map(|s| s.max as i16)).unwrap_or(0),
            ascent: self.total_ascent.unwrap_or(0).into(),
            descent: self.total_descent.unwrap_or(0).into(),
        })
    }

    fn temperature(&self, samples: &[Sample]) -> Option<ExerciseTemperature> {
        let reported = [
            self.min_temperature,
            self.avg_temperature,
            self.max_temperature,
        ];

        if reported.iter().all(Option::is_none) {
            return None;
        }

        let sampled = Summary::of(samples.iter().filter_map(|s| s.temperature));
        let [min, avg, max] = reported.map(|t| t.map(i16::from));

        Some(ExerciseTemperature {
            temperature_min: min.or(sampled.map(|s| s.min as i16)).unwrap_or(0),
            temperature_avg: avg.or(sampled.map(|s| s.avg as i16)).unwrap_or(0),
            temperature_max: max.or(sampled.map(|s| s.max as i16)).unwrap_or(0),
        })
    }

    fn cadence(&self) -> Option<ExerciseCadence> {
        if self.sport.is_some_and(Sport::is_on_foot) {
            return None;
        }

        Some(ExerciseCadence {
            cadence_avg: self.avg_cadence?.into(),
            cadence_max: self.max_cadence.unwrap_or(0).into(),
        })
    }

    fn power(&self) -> Option<ExercisePower> {
        if self.avg_power.is_none() && self.max_power.is_none() {
            return None;
        }

        Some(ExercisePower {
            power_avg: self.avg_power.unwrap_or(0),
            power_max: self.max_power.unwrap_or(0),
            power_normalized: self.normalized_power.unwrap_or(0),
        })
    }
}

/// Samples from the records at or after `start`, in time order.
fn samples(records: &[RecordMessage], start: u32) -> Vec<Sample> {
    let mut samples: Vec<Sample> = records
        .iter()
        .filter_map(|r| {
            let offset = r.timestamp?.checked_sub(start)?;

            let position = match (r.position_lat, r.position_long) {
                (Some(lat), Some(long)) => Some(Position::from_semicircles(lat, long)),
                _ => None,
            };

            Some(Sample {
                timestamp: offset.saturating_mul(1000),
                heart_rate: r.heart_rate.map(u16::from),
                distance: r.distance.map(centimetres_to_metres),
                speed: r.enhanced_speed.or(r.speed.map(u32::from)).map(km_h),
                altitude: r.enhanced_altitude.or(r.altitude.map(u32::from)).map(altitude),
                cadence: r.cadence.map(u16::from),
                temperature: r.temperature.map(i16::from),
                power: r.power,
                position,
            })
        })
        .collect();

    let dropped = records.len() - samples.len();
    if dropped > 0 {
        trace!(dropped, "records without a usable timestamp");
    }

    // Stable, so records sharing a timestamp keep their file order.
    samples.sort_by_key(|s| s.timestamp);
    samples
}

/// Milliseconds to tenths of a second.
fn tenths(ms: u32) -> u32 {
    ms.saturating_add(50) / 100
}

/// Millimetres per second to kilometres per hour.
fn km_h(raw: u32) -> f32 {
    (f64::from(raw) / 1000.0 * 3.6) as f32
}

fn centimetres_to_metres(raw: u32) -> u32 {
    (f64::from(raw) / 100.0).round() as u32
}

/// Altitude with scale 5 and offset 500 to metres.
fn altitude(raw: u32) -> i16 {
    (f64::from(raw) / 5.0 - 500.0).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling() {
        assert_eq!(tenths(1_464_990), 14_650);
        assert_eq!(tenths(1_464_949), 14_649);
        assert!((km_h(6943) - 24.9948).abs() < 1e-3);
        assert_eq!(centimetres_to_metres(10_171_049), 101_710);
        assert_eq!(altitude(3635), 227);
        assert_eq!(altitude(0), -500);
    }

    #[test]
    fn cadence_on_foot_is_stride_rate() {
        let mut session = Session {
            avg_cadence: Some(84),
            max_cadence: Some(119),
            sport: Some(Sport::Cycling),
            ..Default::default()
        };
        assert_eq!(
            session.cadence(),
            Some(ExerciseCadence {
                cadence_avg: 84,
                cadence_max: 119
            })
        );

        session.sport = Some(Sport::Running);
        assert_eq!(session.cadence(), None);
    }

    #[test]
    fn samples_are_sorted_and_clipped() {
        let record = |timestamp, heart_rate| RecordMessage {
            timestamp: Some(timestamp),
            heart_rate: Some(heart_rate),
            ..Default::default()
        };

        let records = [
            record(105, 1),
            record(99, 2),
            record(101, 3),
            record(105, 4),
            RecordMessage::default(),
        ];

        let samples = samples(&records, 100);
        let order: Vec<_> = samples.iter().map(|s| s.heart_rate).collect();

        assert_eq!(order, [Some(3), Some(1), Some(4)]);
        assert_eq!(samples[0].timestamp, 1000);
    }
}
