//! Garmin Training Center XML exports (`.tcx`).

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::{
    Error, Options,
    exercise::{
        Exercise, ExerciseAltitude, ExerciseCadence, ExerciseSpeed, FileType, Lap, LapAltitude,
        LapSpeed, Position, Sample, Summary,
    },
};

/// Decode a TCX export. Only the first activity is read.
pub fn decode(data: &[u8], _options: &Options) -> Result<Exercise, Error> {
    debug!(format = "tcx", bytes = data.len(), "decoding");

    let text = std::str::from_utf8(data)
        .map_err(|e| Error::CorruptFile(format!("invalid UTF-8: {e}")))?;

    let database: TrainingCenterDatabase =
        from_str(text).map_err(|e| Error::CorruptFile(format!("TCX parse error: {e}")))?;

    let activity = database
        .activities
        .and_then(|a| a.activity.into_iter().next())
        .ok_or_else(|| Error::NotAnExercise("no activity".into()))?;

    activity.into_exercise()
}

fn parse_time(value: &str) -> Result<DateTime<FixedOffset>, Error> {
    DateTime::parse_from_rfc3339(value.trim())
        .map_err(|e| Error::CorruptFile(format!("malformed time {value:?}: {e}")))
}

impl Activity {
    fn into_exercise(self) -> Result<Exercise, Error> {
        let start = parse_time(&self.id)?;
        let date_time: NaiveDateTime = start.naive_local();

        let mut exercise = Exercise::new(FileType::GarminTcx, date_time);
        exercise.device_name = self.creator.as_ref().and_then(|c| c.name.clone());

        trace!(sport = ?self.sport, laps = self.laps.len(), "activity");

        let seconds: f64 = self.laps.iter().map(|l| l.total_time_seconds).sum();
        exercise.duration = (seconds * 10.0).round() as u32;
        exercise.energy = self.laps.iter().filter_map(|l| l.calories).sum();

        exercise.samples = samples(&self.laps, start)?;

        let weighted_hr: f64 = self
            .laps
            .iter()
            .filter_map(|l| {
                Some(f64::from(l.average_heart_rate.as_ref()?.value) * l.total_time_seconds)
            })
            .sum();
        if seconds > 0.0 {
            exercise.heart_rate_avg = (weighted_hr / seconds).round() as u16;
        }
        exercise.heart_rate_max = self
            .laps
            .iter()
            .filter_map(|l| l.maximum_heart_rate.as_ref().map(|b| b.value))
            .chain(exercise.samples.iter().filter_map(|s| s.heart_rate))
            .max()
            .unwrap_or(0);

        let distance: f64 = self.laps.iter().filter_map(|l| l.distance_meters).sum();
        let has_distance = self.laps.iter().any(|l| l.distance_meters.is_some())
            || exercise.samples.iter().any(|s| s.distance.is_some());

        if has_distance {
            let max_speed = self
                .laps
                .iter()
                .filter_map(|l| l.maximum_speed)
                .fold(0.0, f64::max);

            exercise.speed = Some(ExerciseSpeed {
                distance: distance.round() as u32,
                speed_avg: if seconds > 0.0 {
                    (distance / seconds * 3.6) as f32
                } else {
                    0.0
                },
                speed_max: (max_speed * 3.6) as f32,
                bike_counter: None,
            });
        }

        if let Some(altitude) = Summary::of(exercise.samples.iter().filter_map(|s| s.altitude)) {
            let ascent = exercise
                .samples
                .iter()
                .filter_map(|s| s.altitude)
                .collect::<Vec<_>>()
                .windows(2)
                .map(|w| (i32::from(w[1]) - i32::from(w[0])).max(0) as u32)
                .sum();

            exercise.altitude = Some(ExerciseAltitude {
                altitude_min: altitude.min as i16,
                altitude_avg: altitude.avg as i16,
                altitude_max: altitude.max as i16,
                ascent,
                descent: 0,
            });
        }

        let cadence_laps = self.laps.iter().filter(|l| l.cadence.is_some());
        let cadence_time: f64 = cadence_laps.clone().map(|l| l.total_time_seconds).sum();

        if cadence_laps.clone().next().is_some() {
            let weighted: f64 = cadence_laps
                .clone()
                .filter_map(|l| Some(f64::from(l.cadence?) * l.total_time_seconds))
                .sum();

            exercise.cadence = Some(ExerciseCadence {
                cadence_avg: if cadence_time > 0.0 {
                    (weighted / cadence_time).round() as u16
                } else {
                    0
                },
                cadence_max: exercise
                    .samples
                    .iter()
                    .filter_map(|s| s.cadence)
                    .chain(cadence_laps.filter_map(|l| l.cadence))
                    .max()
                    .unwrap_or(0),
            });
        }

        exercise.laps = self.map_laps(&exercise);
        exercise.project_recording_mode();

        Ok(exercise)
    }

    fn map_laps(&self, exercise: &Exercise) -> Vec<Lap> {
        let (mut elapsed, mut distance) = (0.0f64, 0.0f64);

        self.laps
            .iter()
            .map(|lap| {
                elapsed += lap.total_time_seconds;
                distance += lap.distance_meters.unwrap_or(0.0);

                let time_split = (elapsed * 10.0).round() as u32;
                let at_split = exercise.sample_at(time_split.saturating_mul(100));

                Lap {
                    time_split,
                    heart_rate_avg: lap.average_heart_rate.as_ref().map(|b| b.value),
                    heart_rate_max: lap.maximum_heart_rate.as_ref().map(|b| b.value),
                    heart_rate_split: at_split.and_then(|s| s.heart_rate),
                    speed: exercise.speed.map(|_| LapSpeed {
                        speed_end: at_split.and_then(|s| s.speed).unwrap_or(0.0),
                        speed_avg: match (lap.distance_meters, lap.total_time_seconds) {
                            (Some(d), t) if t > 0.0 => (d / t * 3.6) as f32,
                            _ => 0.0,
                        },
                        distance: distance.round() as u32,
                    }),
                    altitude: exercise.altitude.map(|_| LapAltitude {
                        altitude: at_split.and_then(|s| s.altitude).unwrap_or(0),
                        ascent: 0,
                    }),
                    temperature: None,
                    position_split: at_split.and_then(|s| s.position),
                }
            })
            .collect()
    }
}

/// Samples from every trackpoint at or after the start, in time order.
/// Speeds are derived from consecutive distances.
fn samples(laps: &[TcxLap], start: DateTime<FixedOffset>) -> Result<Vec<Sample>, Error> {
    let mut samples = Vec::new();

    let points = laps
        .iter()
        .flat_map(|l| &l.tracks)
        .flat_map(|t| &t.trackpoints);

    for point in points {
        let Some(time) = &point.time else {
            continue;
        };

        let offset = (parse_time(time)? - start).num_milliseconds();
        let Ok(timestamp) = u32::try_from(offset) else {
            continue;
        };

        samples.push(Sample {
            timestamp,
            heart_rate: point.heart_rate.as_ref().map(|b| b.value),
            distance: point.distance_meters.map(|d| d.round() as u32),
            altitude: point.altitude_meters.map(|a| a.round() as i16),
            cadence: point.cadence,
            position: point
                .position
                .as_ref()
                .map(|p| Position::new(p.latitude_degrees, p.longitude_degrees)),
            ..Default::default()
        });
    }

    samples.sort_by_key(|s| s.timestamp);

    let mut previous: Option<(u32, u32)> = None;
    for sample in &mut samples {
        if let Some(distance) = sample.distance {
            if let Some((timestamp, last)) = previous {
                let ms = sample.timestamp.saturating_sub(timestamp);
                if ms > 0 {
                    let metres = f64::from(distance.saturating_sub(last));
                    sample.speed = Some((metres / (f64::from(ms) / 1000.0) * 3.6) as f32);
                }
            }
            previous = Some((sample.timestamp, distance));
        }
    }

    Ok(samples)
}

#[derive(Debug, Deserialize)]
#[serde(rename = "TrainingCenterDatabase")]
struct TrainingCenterDatabase {
    #[serde(rename = "Activities")]
    activities: Option<Activities>,
}

#[derive(Debug, Deserialize)]
struct Activities {
    #[serde(rename = "Activity", default)]
    activity: Vec<Activity>,
}

#[derive(Debug, Deserialize)]
struct Activity {
    #[serde(rename = "@Sport")]
    sport: Option<String>,
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Lap", default)]
    laps: Vec<TcxLap>,
    #[serde(rename = "Creator")]
    creator: Option<Creator>,
}

#[derive(Debug, Deserialize)]
struct Creator {
    #[serde(rename = "Name")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TcxLap {
    #[serde(rename = "TotalTimeSeconds", default)]
    total_time_seconds: f64,
    #[serde(rename = "DistanceMeters")]
    distance_meters: Option<f64>,
    #[serde(rename = "MaximumSpeed")]
    maximum_speed: Option<f64>,
    #[serde(rename = "Calories")]
    calories: Option<u32>,
    #[serde(rename = "AverageHeartRateBpm")]
    average_heart_rate: Option<Bpm>,
    #[serde(rename = "MaximumHeartRateBpm")]
    maximum_heart_rate: Option<Bpm>,
    #[serde(rename = "Cadence")]
    cadence: Option<u16>,
    #[serde(rename = "Track", default)]
    tracks: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Bpm {
    #[serde(rename = "Value")]
    value: u16,
}

#[derive(Debug, Deserialize)]
struct Track {
    #[serde(rename = "Trackpoint", default)]
    trackpoints: Vec<Trackpoint>,
}

#[derive(Debug, Deserialize)]
struct Trackpoint {
    #[serde(rename = "Time")]
    time: Option<String>,
    #[serde(rename = "Position")]
    position: Option<TcxPosition>,
    #[serde(rename = "AltitudeMeters")]
    altitude_meters: Option<f64>,
    #[serde(rename = "DistanceMeters")]
    distance_meters: Option<f64>,
    #[serde(rename = "HeartRateBpm")]
    heart_rate: Option<Bpm>,
    #[serde(rename = "Cadence")]
    cadence: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct TcxPosition {
    #[serde(rename = "LatitudeDegrees")]
    latitude_degrees: f64,
    #[serde(rename = "LongitudeDegrees")]
    longitude_degrees: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">
  <Activities>
    <Activity Sport="Biking">
      <Id>2024-05-01T08:00:00Z</Id>
      <Lap StartTime="2024-05-01T08:00:00Z">
        <TotalTimeSeconds>60</TotalTimeSeconds>
        <DistanceMeters>500</DistanceMeters>
        <MaximumSpeed>10</MaximumSpeed>
        <Calories>12</Calories>
        <AverageHeartRateBpm><Value>120</Value></AverageHeartRateBpm>
        <MaximumHeartRateBpm><Value>130</Value></MaximumHeartRateBpm>
        <Cadence>80</Cadence>
        <Track>
          <Trackpoint>
            <Time>2024-05-01T08:00:00Z</Time>
            <Position>
              <LatitudeDegrees>45.5</LatitudeDegrees>
              <LongitudeDegrees>-122.5</LongitudeDegrees>
            </Position>
            <AltitudeMeters>100</AltitudeMeters>
            <DistanceMeters>0</DistanceMeters>
            <HeartRateBpm><Value>110</Value></HeartRateBpm>
          </Trackpoint>
          <Trackpoint>
            <Time>2024-05-01T08:01:00Z</Time>
            <AltitudeMeters>110</AltitudeMeters>
            <DistanceMeters>500</DistanceMeters>
            <HeartRateBpm><Value>128</Value></HeartRateBpm>
          </Trackpoint>
        </Track>
      </Lap>
    </Activity>
  </Activities>
  <Author><Name>Garmin Connect</Name></Author>
</TrainingCenterDatabase>"#;

    #[test]
    fn decodes_activity() {
        let exercise = decode(SAMPLE_TCX.as_bytes(), &Options::default()).unwrap();

        assert_eq!(exercise.file_type, FileType::GarminTcx);
        assert_eq!(exercise.duration, 600);
        assert_eq!(exercise.energy, 12);
        assert_eq!(exercise.heart_rate_avg, 120);
        assert_eq!(exercise.heart_rate_max, 130);

        let speed = exercise.speed.unwrap();
        assert_eq!(speed.distance, 500);
        assert!((speed.speed_avg - 30.0).abs() < 1e-4);
        assert!((speed.speed_max - 36.0).abs() < 1e-4);

        assert_eq!(exercise.altitude.unwrap().ascent, 10);
        assert_eq!(exercise.cadence.unwrap().cadence_avg, 80);

        assert_eq!(exercise.samples.len(), 2);
        assert_eq!(exercise.samples[1].timestamp, 60_000);
        assert!((exercise.samples[1].speed.unwrap() - 30.0).abs() < 1e-4);

        assert_eq!(exercise.laps.len(), 1);
        assert_eq!(exercise.laps[0].time_split, 600);
        assert_eq!(exercise.laps[0].heart_rate_split, Some(128));
        assert!(exercise.recording_mode.location);
    }

    #[test]
    fn rejects_empty_and_malformed() {
        let empty = r#"<TrainingCenterDatabase><Activities/></TrainingCenterDatabase>"#;
        assert!(matches!(
            decode(empty.as_bytes(), &Options::default()),
            Err(Error::NotAnExercise(_))
        ));

        assert!(matches!(
            decode(b"<TrainingCenterDatabase><Activities>", &Options::default()),
            Err(Error::CorruptFile(_))
        ));
    }
}
