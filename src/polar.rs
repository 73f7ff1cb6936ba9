//! Polar heart-rate monitor recordings.
//!
//! Binary recordings ([`f6`], [`srd`]) store dates and durations as
//! binary-coded decimal; the text exports ([`hrm`], [`hsr`]) share the
//! section grammar in [`text`].

pub mod f6;
pub mod hrm;
pub mod hsr;
pub mod srd;
pub mod text;

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    Error,
    exercise::{HeartRateLimit, Lap},
};

/// Decode one binary-coded decimal byte.
pub fn bcd(b: u8) -> Result<u8, Error> {
    let (high, low) = (b >> 4, b & 0x0F);

    if high > 9 || low > 9 {
        Err(Error::CorruptFile(format!("invalid BCD byte {b:#04x}")))?;
    }

    Ok(high * 10 + low)
}

/// Decode a BCD timestamp stored as seconds, minutes, hours, day, month and
/// year since 2000.
pub fn bcd_date_time(r: [u8; 6]) -> Result<NaiveDateTime, Error> {
    let [second, minute, hour, day, month, year] = r.map(bcd);
    let (second, minute, hour) = (second?, minute?, hour?);

    NaiveDate::from_ymd_opt(2000 + i32::from(year?), month?.into(), day?.into())
        .and_then(|d| d.and_hms_opt(hour.into(), minute.into(), second.into()))
        .ok_or_else(|| Error::CorruptFile("invalid start date".into()))
}

/// Decode a BCD duration stored as tenths, seconds, minutes and hours,
/// returning tenths of a second.
pub fn bcd_duration(r: [u8; 4]) -> Result<u32, Error> {
    let [tenths, seconds, minutes, hours] = r.map(bcd);
    let (hours, minutes, seconds) = (u32::from(hours?), u32::from(minutes?), u32::from(seconds?));

    Ok(((hours * 60 + minutes) * 60 + seconds) * 10 + u32::from(tenths?))
}

/// Validate the bounds of a heart-rate zone.
///
/// Zones with neither bound set are unused slots and yield `None`.
pub fn zone(
    lower: u8,
    upper: u8,
    absolute_range: bool,
    [time_below, time_within, time_above]: [u16; 3],
) -> Result<Option<HeartRateLimit>, Error> {
    if lower == 0 && upper == 0 {
        return Ok(None);
    }

    if lower > upper {
        Err(Error::CorruptFile(format!(
            "heart-rate zone {lower}-{upper} is inverted"
        )))?;
    }

    Ok(Some(HeartRateLimit {
        lower_heart_rate: lower.into(),
        upper_heart_rate: upper.into(),
        absolute_range,
        time_below: time_below.into(),
        time_within: time_within.into(),
        time_above: time_above.into(),
    }))
}

/// Derive each lap's average speed from its distance and duration.
pub fn fill_lap_speeds(laps: &mut [Lap]) {
    let (mut previous_split, mut previous_distance) = (0, 0);

    for lap in laps {
        let Some(speed) = &mut lap.speed else {
            continue;
        };

        let tenths = lap.time_split.saturating_sub(previous_split);
        let metres = speed.distance.saturating_sub(previous_distance);

        if tenths > 0 {
            speed.speed_avg = (f64::from(metres) / (f64::from(tenths) / 10.0) * 3.6) as f32;
        }

        previous_split = lap.time_split;
        previous_distance = speed.distance;
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::exercise::LapSpeed;

    #[test]
    fn bcd_bytes() {
        assert_eq!(bcd(0x00).unwrap(), 0);
        assert_eq!(bcd(0x59).unwrap(), 59);
        assert!(matches!(bcd(0x1A), Err(Error::CorruptFile(_))));
        assert!(matches!(bcd(0xA1), Err(Error::CorruptFile(_))));
    }

    #[test]
    fn bcd_dates_and_durations() {
        let date = bcd_date_time([0x48, 0x27, 0x19, 0x01, 0x09, 0x08]).unwrap();
        let expected = NaiveDate::from_ymd_opt(2008, 9, 1)
            .unwrap()
            .and_hms_opt(19, 27, 48)
            .unwrap();
        assert_eq!(date, expected);

        assert!(bcd_date_time([0, 0, 0, 0x31, 0x02, 0x08]).is_err());

        assert_eq!(bcd_duration([0x00, 0x31, 0x54, 0x00]).unwrap(), 32_710);
        assert_eq!(bcd_duration([0x07, 0x00, 0x00, 0x02]).unwrap(), 72_007);
    }

    #[test]
    fn lap_speeds() {
        let lap = |time_split, distance| Lap {
            time_split,
            speed: Some(LapSpeed {
                distance,
                ..Default::default()
            }),
            ..Default::default()
        };

        let mut laps = [lap(3600, 10_000), lap(5400, 15_000)];
        fill_lap_speeds(&mut laps);

        assert_eq!(laps[0].speed.unwrap().speed_avg, 100.0);
        assert_eq!(laps[1].speed.unwrap().speed_avg, 100.0);
    }

    #[test]
    fn zones() {
        assert_eq!(zone(0, 0, true, [1, 2, 3]).unwrap(), None);

        let limit = zone(141, 160, true, [0, 1898, 0]).unwrap().unwrap();
        assert_eq!(limit.time_within, 1898);
        assert!(limit.absolute_range);

        assert!(matches!(
            zone(90, 80, false, [0; 3]),
            Err(Error::CorruptFile(_))
        ));
    }
}
