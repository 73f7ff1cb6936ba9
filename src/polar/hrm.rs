//! Polar HRM text exports (`.hrm`).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, trace};

use crate::{
    Error, Options,
    exercise::{
        Exercise, ExerciseAltitude, ExerciseCadence, ExercisePower, ExerciseSpeed,
        ExerciseTemperature, FileType, HeartRateLimit, Lap, LapAltitude, LapSpeed,
        LapTemperature, Sample, Summary,
    },
};

use super::{
    fill_lap_speeds,
    text::{Document, Section, integer},
    zone,
};

/// `Interval` marking a recording of R-R intervals instead of a fixed rate.
const RR_INTERVAL: u16 = 238;

const KM_PER_MILE: f64 = 1.609_344;
const METRES_PER_FOOT: f64 = 0.3048;

/// Polar monitor codes, as written to the `Monitor` parameter.
const MONITORS: &[(u8, &str)] = &[
    (1, "Polar Sport Tester / Vantage XL"),
    (2, "Polar Vantage NV"),
    (3, "Polar Accurex Plus"),
    (4, "Polar XTrainer Plus"),
    (6, "Polar S520"),
    (7, "Polar Coach"),
    (8, "Polar S210"),
    (9, "Polar S410"),
    (10, "Polar S510"),
    (11, "Polar S610"),
    (12, "Polar S710"),
    (13, "Polar S810"),
    (15, "Polar E600"),
    (20, "Polar AXN500"),
    (21, "Polar AXN700"),
    (22, "Polar S625X / S725X"),
    (23, "Polar S725"),
    (33, "Polar CS400"),
    (34, "Polar CS600X"),
    (35, "Polar CS600"),
    (36, "Polar RS400"),
    (37, "Polar RS800"),
    (38, "Polar RS800X"),
];

/// Channels enabled by the `SMode` digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SMode {
    pub speed: bool,
    pub cadence: bool,
    pub altitude: bool,
    pub power: bool,
    pub power_balance: bool,
    pub pedalling_index: bool,
    /// Rows carry cycling channels after the heart rate.
    pub cycling_data: bool,
    pub us_units: bool,
    pub air_pressure: bool,
}

impl SMode {
    pub fn parse(digits: &str) -> Self {
        let digit = |i: usize| digits.as_bytes().get(i) == Some(&b'1');

        Self {
            speed: digit(0),
            cadence: digit(1),
            altitude: digit(2),
            power: digit(3),
            power_balance: digit(4),
            pedalling_index: digit(5),
            cycling_data: digit(6),
            us_units: digit(7),
            air_pressure: digit(8),
        }
    }

    fn has(self, channel: bool) -> bool {
        self.cycling_data && channel
    }

    fn speed_km_h(self, tenths: i64) -> f32 {
        let speed = tenths as f64 / 10.0;
        (if self.us_units { speed * KM_PER_MILE } else { speed }) as f32
    }

    /// Distance in 1/10 km (or mile) to metres.
    fn distance_m(self, tenths: i64) -> u32 {
        let km = tenths.max(0) as f64 / 10.0;
        ((if self.us_units { km * KM_PER_MILE } else { km }) * 1000.0).round() as u32
    }

    fn altitude_m(self, raw: i64) -> i16 {
        let raw = raw as f64;
        (if self.us_units { raw * METRES_PER_FOOT } else { raw }).round() as i16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interval {
    Seconds(u16),
    RR,
}

/// The `[Params]` section.
#[derive(Debug)]
struct Params {
    monitor: Option<u8>,
    mode: SMode,
    date_time: NaiveDateTime,
    /// Tenths of a second.
    length: u32,
    interval: Interval,
    limits: Vec<(u8, u8)>,
}

/// Parse a clock value `h:mm:ss.t` into tenths of a second.
pub fn clock_tenths(value: &str) -> Option<u32> {
    let mut parts = value.trim().splitn(3, ':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;

    let seconds = parts.next()?;
    let (seconds, tenths) = seconds.split_once('.').unwrap_or((seconds, "0"));
    let seconds: u32 = seconds.parse().ok()?;
    let tenths: u32 = tenths.get(..1).unwrap_or("0").parse().ok()?;

    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(10)?
        .checked_add(tenths)
}

/// A non-negative reading that fits a `u16`.
fn reading(section: &str, value: i64) -> Result<u16, Error> {
    u16::try_from(value)
        .map_err(|_| Error::CorruptFile(format!("[{section}] value {value} out of range")))
}

impl Params {
    fn parse(section: &Section) -> Result<Self, Error> {
        let pairs = section.pairs();

        let header = |key: &str| {
            pairs
                .get(key)
                .copied()
                .ok_or_else(|| Error::BadHeader(format!("[Params] has no {key}")))
        };

        let date = NaiveDate::parse_from_str(header("Date")?, "%Y%m%d")
            .map_err(|e| Error::BadHeader(format!("Date: {e}")))?;

        let start = clock_tenths(header("StartTime")?)
            .map(|t| t / 10)
            .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, 0))
            .ok_or_else(|| Error::BadHeader("malformed StartTime".into()))?;

        let number = |key: &str| -> Result<Option<u16>, Error> {
            pairs
                .get(key)
                .map(|v| {
                    v.parse()
                        .map_err(|_| Error::BadHeader(format!("malformed {key} {v:?}")))
                })
                .transpose()
        };

        let interval = match number("Interval")?.unwrap_or(0) {
            RR_INTERVAL => Interval::RR,
            0 => Err(Error::BadHeader("missing Interval".into()))?,
            s => Interval::Seconds(s),
        };

        let mut limits = Vec::new();
        for i in 1..=3 {
            let upper = number(&format!("Upper{i}"))?.unwrap_or(0);
            let lower = number(&format!("Lower{i}"))?.unwrap_or(0);

            if lower == 0 && upper == 0 {
                continue;
            }

            let (Ok(lower), Ok(upper)) = (u8::try_from(lower), u8::try_from(upper)) else {
                Err(Error::BadHeader(format!("heart-rate limit {i} out of range")))?
            };

            zone(lower, upper, true, [0; 3])?;
            limits.push((lower, upper));
        }

        Ok(Self {
            monitor: number("Monitor")?.and_then(|m| u8::try_from(m).ok()),
            mode: SMode::parse(pairs.get("SMode").copied().unwrap_or_default()),
            date_time: date.and_time(start),
            length: pairs.get("Length").and_then(|l| clock_tenths(l)).unwrap_or(0),
            interval,
            limits,
        })
    }
}

/// Decode an HRM export.
pub fn decode(data: &[u8], _options: &Options) -> Result<Exercise, Error> {
    debug!(format = "hrm", bytes = data.len(), "decoding");

    let text = String::from_utf8_lossy(data);
    decode_document(&Document::parse(&text), FileType::PolarHrm)
}

/// Build an exercise from the sections common to HRM and HSR exports.
pub(super) fn decode_document(document: &Document, file_type: FileType) -> Result<Exercise, Error> {
    let params = document
        .section("Params")
        .ok_or_else(|| Error::BadHeader("no [Params] section".into()))
        .and_then(Params::parse)?;

    for section in document.sections() {
        if !is_known(section.name) {
            trace!(section = section.name, "skipping section");
        }
    }

    let mode = params.mode;
    let mut exercise = Exercise::new(file_type, params.date_time);

    exercise.device_name = params.monitor.and_then(|m| {
        MONITORS
            .iter()
            .find(|&&(code, _)| code == m)
            .map(|(_, name)| name.to_string())
    });
    exercise.duration = params.length;
    exercise.recording_interval = match params.interval {
        Interval::Seconds(s) => Some(s),
        Interval::RR => None,
    };

    let (samples, durations) = match document.section("HRData") {
        Some(section) => decode_samples(section, &params)?,
        None => Default::default(),
    };
    exercise.samples = samples;

    let heart_rates = || exercise.samples.iter().filter_map(|s| s.heart_rate).filter(|&h| h > 0);
    if let Some(hr) = Summary::of(heart_rates()) {
        exercise.heart_rate_avg = hr.avg as u16;
        exercise.heart_rate_max = hr.max as u16;
    }

    exercise.heart_rate_limits = params
        .limits
        .iter()
        .map(|&(lower, upper)| time_in_zone(lower, upper, &exercise.samples, &durations))
        .collect();

    exercise.laps = match document.section("IntTimes") {
        Some(section) => decode_laps(section, mode)?,
        None => Vec::new(),
    };

    let trip = match document.section("Trip") {
        Some(section) => Some(Trip::parse(section, mode)?),
        None => None,
    };

    fill_blocks(&mut exercise, mode, trip.as_ref());

    if let Some(trip) = &trip {
        exercise.odometer = trip.odometer;
    }

    exercise.project_recording_mode();

    Ok(exercise)
}

fn is_known(name: &str) -> bool {
    ["Params", "HRData", "IntTimes", "Trip", "Summary"]
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
}

/// Decode `[HRData]`, returning the samples and the milliseconds each one
/// covers.
fn decode_samples(section: &Section, params: &Params) -> Result<(Vec<Sample>, Vec<u32>), Error> {
    let mode = params.mode;
    let rows = section.rows()?;

    let mut samples = Vec::with_capacity(rows.len());
    let mut durations = Vec::with_capacity(rows.len());
    let (mut timestamp, mut distance) = (0u32, 0.0f64);

    for row in &rows {
        let mut cells = row.iter();
        let mut next = || integer(section.name, cells.next());

        let first = next()?;

        let (heart_rate, duration) = match params.interval {
            Interval::Seconds(s) => (first, u32::from(s) * 1000),
            Interval::RR => (if first > 0 { 60_000 / first } else { 0 }, first.max(0) as u32),
        };

        let mut sample = Sample {
            timestamp,
            heart_rate: Some(heart_rate.clamp(0, i64::from(u16::MAX)) as u16),
            ..Default::default()
        };

        if params.interval != Interval::RR {
            if mode.has(mode.speed) {
                let speed = mode.speed_km_h(next()?);

                sample.speed = Some(speed);
                sample.distance = Some(distance.round() as u32);
                distance += f64::from(speed) / 3.6 * f64::from(duration) / 1000.0;
            }

            if mode.has(mode.cadence) {
                sample.cadence = Some(reading(section.name, next()?)?);
            }

            if mode.has(mode.altitude) {
                sample.altitude = Some(mode.altitude_m(next()?));
            }

            if mode.has(mode.power) {
                sample.power = Some(reading(section.name, next()?)?);
            }
        }

        timestamp = timestamp.saturating_add(duration);
        samples.push(sample);
        durations.push(duration);
    }

    Ok((samples, durations))
}

fn time_in_zone(lower: u8, upper: u8, samples: &[Sample], durations: &[u32]) -> HeartRateLimit {
    let (mut below, mut within, mut above) = (0u64, 0u64, 0u64);

    for (sample, &duration) in samples.iter().zip(durations) {
        let Some(hr) = sample.heart_rate.filter(|&h| h > 0) else {
            continue;
        };

        let bucket = if hr < lower.into() {
            &mut below
        } else if hr > upper.into() {
            &mut above
        } else {
            &mut within
        };

        *bucket += u64::from(duration);
    }

    let seconds = |ms: u64| u32::try_from((ms + 500) / 1000).unwrap_or(u32::MAX);

    HeartRateLimit {
        lower_heart_rate: lower.into(),
        upper_heart_rate: upper.into(),
        absolute_range: true,
        time_below: seconds(below),
        time_within: seconds(within),
        time_above: seconds(above),
    }
}

/// Decode `[IntTimes]`: five rows per lap, the last of which is reserved.
fn decode_laps(section: &Section, mode: SMode) -> Result<Vec<Lap>, Error> {
    let rows = section.rows()?;
    let name = section.name;

    let mut laps = Vec::with_capacity(rows.len() / 5);

    for chunk in rows.chunks(5) {
        let [time, row2, row3, row4, ..] = chunk else {
            Err(Error::CorruptFile(format!(
                "[{name}] lap has {} rows",
                chunk.len()
            )))?
        };

        // Lap type, lap distance, power and phase are not carried over.
        let cell = |row: &Vec<String>, i: usize| integer(name, row.get(i));

        let time_split = time
            .first()
            .and_then(|t| clock_tenths(t))
            .ok_or_else(|| Error::CorruptFile(format!("[{name}] malformed split time")))?;

        let mut lap = Lap {
            time_split,
            heart_rate_split: Some(reading(name, cell(time, 1)?)?),
            heart_rate_avg: Some(reading(name, cell(time, 3)?)?),
            heart_rate_max: Some(reading(name, cell(time, 4)?)?),
            ..Default::default()
        };

        if mode.has(mode.speed) {
            lap.speed = Some(LapSpeed {
                speed_end: mode.speed_km_h(cell(row2, 3)?),
                speed_avg: 0.0,
                distance: mode.distance_m(cell(row3, 4)?),
            });
        }

        if mode.has(mode.altitude) {
            lap.altitude = Some(LapAltitude {
                altitude: mode.altitude_m(cell(row2, 5)?),
                ascent: mode.altitude_m(cell(row3, 3)?).max(0) as u32,
            });
            lap.temperature = Some(LapTemperature {
                temperature: (cell(row4, 3)? as f64 / 10.0).round() as i16,
            });
        }

        laps.push(lap);
    }

    fill_lap_speeds(&mut laps);

    Ok(laps)
}

/// The `[Trip]` section: device totals for the exercise.
#[derive(Debug, Default)]
struct Trip {
    /// Metres.
    distance: u32,
    ascent: u32,
    altitude_avg: i16,
    altitude_max: i16,
    speed_avg: f32,
    speed_max: f32,
    odometer: u32,
}

impl Trip {
    fn parse(section: &Section, mode: SMode) -> Result<Self, Error> {
        let values = section
            .content()
            .map(|l| integer(section.name, Some(l)))
            .collect::<Result<Vec<_>, _>>()?;

        let &[distance, ascent, _time, altitude_avg, altitude_max, speed_avg, speed_max, odometer] =
            values.as_slice()
        else {
            Err(Error::CorruptFile(format!(
                "[{}] has {} lines, expected 8",
                section.name,
                values.len()
            )))?
        };

        let speed = |raw: i64| {
            let km_h = raw as f64 / 128.0;
            (if mode.us_units { km_h * KM_PER_MILE } else { km_h }) as f32
        };

        Ok(Self {
            distance: mode.distance_m(distance),
            ascent: mode.altitude_m(ascent).max(0) as u32,
            altitude_avg: mode.altitude_m(altitude_avg),
            altitude_max: mode.altitude_m(altitude_max),
            speed_avg: speed(speed_avg),
            speed_max: speed(speed_max),
            odometer: u32::try_from(odometer).unwrap_or(0),
        })
    }
}

/// Fill the aggregate blocks from the trip totals, falling back to the
/// samples for anything the trip does not cover.
fn fill_blocks(exercise: &mut Exercise, mode: SMode, trip: Option<&Trip>) {
    let samples = &exercise.samples;

    if mode.has(mode.speed) {
        let speeds = || samples.iter().filter_map(|s| s.speed);
        let count = speeds().count();

        let (mean, max) = if count > 0 {
            (
                speeds().sum::<f32>() / count as f32,
                speeds().fold(0.0, f32::max),
            )
        } else {
            (0.0, 0.0)
        };

        exercise.speed = Some(ExerciseSpeed {
            distance: trip
                .map(|t| t.distance)
                .or_else(|| samples.iter().rev().find_map(|s| s.distance))
                .unwrap_or(0),
            speed_avg: trip.map_or(mean, |t| t.speed_avg),
            speed_max: trip.map_or(max, |t| t.speed_max),
            bike_counter: None,
        });
    }

    if mode.has(mode.cadence) {
        let cadence = Summary::of(samples.iter().filter_map(|s| s.cadence));

        exercise.cadence = Some(ExerciseCadence {
            cadence_avg: cadence.map_or(0, |c| c.avg as u16),
            cadence_max: cadence.map_or(0, |c| c.max as u16),
        });
    }

    if mode.has(mode.altitude) {
        let altitude = Summary::of(samples.iter().filter_map(|s| s.altitude));
        let lap_ascent = exercise
            .laps
            .iter()
            .filter_map(|l| l.altitude)
            .map(|a| a.ascent)
            .sum();

        exercise.altitude = Some(ExerciseAltitude {
            altitude_min: altitude.map_or(0, |a| a.min as i16),
            altitude_avg: trip.map_or(altitude.map_or(0, |a| a.avg as i16), |t| t.altitude_avg),
            altitude_max: trip.map_or(altitude.map_or(0, |a| a.max as i16), |t| t.altitude_max),
            ascent: trip.map_or(lap_ascent, |t| t.ascent),
            descent: 0,
        });

        let temperatures = exercise.laps.iter().filter_map(|l| l.temperature);
        exercise.temperature = Summary::of(temperatures.map(|t| t.temperature)).map(|t| {
            ExerciseTemperature {
                temperature_min: t.min as i16,
                temperature_avg: t.avg as i16,
                temperature_max: t.max as i16,
            }
        });
    }

    if mode.has(mode.power) {
        let power = Summary::of(samples.iter().filter_map(|s| s.power));

        exercise.power = Some(ExercisePower {
            power_avg: power.map_or(0, |p| p.avg as u16),
            power_max: power.map_or(0, |p| p.max as u16),
            power_normalized: 0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_values() {
        assert_eq!(clock_tenths("0:29:15.0"), Some(17_550));
        assert_eq!(clock_tenths("01:02:03.4"), Some(37_234));
        assert_eq!(clock_tenths("26:00:00"), Some(936_000));
        assert_eq!(clock_tenths("12:3x:00.0"), None);
        assert_eq!(clock_tenths("4294967295:00:00.0"), None);
        assert_eq!(clock_tenths("119305:00:00.0"), None);
    }

    #[test]
    fn smode_digits() {
        let mode = SMode::parse("111000100");
        assert!(mode.speed && mode.cadence && mode.altitude && mode.cycling_data);
        assert!(!mode.power && !mode.us_units);

        let short = SMode::parse("1");
        assert!(short.speed && !short.has(short.speed));
    }

    #[test]
    fn unit_conversion() {
        let metric = SMode::parse("100000100");
        assert_eq!(metric.speed_km_h(255), 25.5);
        assert_eq!(metric.altitude_m(100), 100);
        assert_eq!(metric.distance_m(1017), 101_700);

        let us = SMode::parse("100000110");
        assert!((us.speed_km_h(100) - 16.093_44).abs() < 1e-4);
        assert_eq!(us.altitude_m(1000), 305);
    }

    #[test]
    fn zone_times() {
        let samples: Vec<_> = [100, 130, 150, 0, 170]
            .into_iter()
            .map(|hr| Sample {
                heart_rate: Some(hr),
                ..Default::default()
            })
            .collect();

        let limit = time_in_zone(120, 160, &samples, &[5000; 5]);
        assert_eq!(
            (limit.time_below, limit.time_within, limit.time_above),
            (5, 10, 5)
        );
    }
}
