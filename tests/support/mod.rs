//! Encoders producing small recordings for the integration tests.

#![allow(dead_code)]

use crankset::fit::check::crc_of;

/// Seconds from the FIT epoch used as the start of synthetic activities
/// (2014-06-01T10:00:00Z).
pub const START: u32 = 770_551_200;

/// A field value of a synthetic FIT data message.
#[derive(Debug, Clone)]
pub enum V {
    Enum(u8),
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I32(i32),
    Str(&'static str, u8),
}

impl V {
    fn base_type(&self) -> u8 {
        match self {
            Self::Enum(_) => 0x00,
            Self::U8(_) => 0x02,
            Self::U16(_) => 0x84,
            Self::U32(_) => 0x86,
            Self::I8(_) => 0x01,
            Self::I32(_) => 0x85,
            Self::Str(..) => 0x07,
        }
    }

    fn bytes(&self) -> Vec<u8> {
        match *self {
            Self::Enum(x) | Self::U8(x) => vec![x],
            Self::U16(x) => x.to_le_bytes().to_vec(),
            Self::U32(x) => x.to_le_bytes().to_vec(),
            Self::I8(x) => x.to_le_bytes().to_vec(),
            Self::I32(x) => x.to_le_bytes().to_vec(),
            Self::Str(s, size) => {
                let mut b = s.as_bytes().to_vec();
                b.resize(size as usize, 0);
                b
            }
        }
    }
}

/// Builder for FIT documents with a 14-byte header.
#[derive(Debug, Default)]
pub struct Fit {
    records: Vec<u8>,
}

impl Fit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition for `local` matching the shape of `fields`.
    pub fn define(&mut self, local: u8, global: u16, fields: &[(u8, V)]) -> &mut Self {
        self.records.push(0x40 | local);
        self.records.extend([0, 0]);
        self.records.extend(global.to_le_bytes());
        self.records.push(fields.len() as u8);

        for (number, value) in fields {
            self.records
                .extend([*number, value.bytes().len() as u8, value.base_type()]);
        }

        self
    }

    /// Append a big-endian definition.
    pub fn define_be(&mut self, local: u8, global: u16, fields: &[(u8, u8, u8)]) -> &mut Self {
        self.records.push(0x40 | local);
        self.records.extend([0, 1]);
        self.records.extend(global.to_be_bytes());
        self.records.push(fields.len() as u8);

        for &(number, size, base_type) in fields {
            self.records.extend([number, size, base_type]);
        }

        self
    }

    /// Append a definition with developer fields of the given sizes.
    pub fn define_with_developer(
        &mut self,
        local: u8,
        global: u16,
        fields: &[(u8, V)],
        developer: &[u8],
    ) -> &mut Self {
        self.define(local, global, fields);
        let header = self.records.len() - (5 + 3 * fields.len()) - 1;
        self.records[header] |= 0x20;

        self.records.push(developer.len() as u8);
        for (i, &size) in developer.iter().enumerate() {
            self.records.extend([i as u8, size, 0]);
        }

        self
    }

    /// Append a data message for `local` with a normal header.
    pub fn data(&mut self, local: u8, fields: &[(u8, V)]) -> &mut Self {
        self.records.push(local);
        self.raw_fields(fields)
    }

    /// Append a data message with a compressed timestamp header.
    pub fn compressed(&mut self, local: u8, offset: u8, fields: &[(u8, V)]) -> &mut Self {
        self.records.push(0x80 | (local << 5) | (offset & 0x1F));
        self.raw_fields(fields)
    }

    /// Append arbitrary record bytes.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.records.extend_from_slice(bytes);
        self
    }

    /// Define `local` and immediately write one message with it.
    pub fn message(&mut self, local: u8, global: u16, fields: &[(u8, V)]) -> &mut Self {
        self.define(local, global, fields).data(local, fields)
    }

    fn raw_fields(&mut self, fields: &[(u8, V)]) -> &mut Self {
        for (_, value) in fields {
            self.records.extend(value.bytes());
        }
        self
    }

    /// The finished document, with both checksums.
    pub fn finish(&self) -> Vec<u8> {
        let mut data = vec![14, 0x10];
        data.extend(2132u16.to_le_bytes());
        data.extend((self.records.len() as u32).to_le_bytes());
        data.extend(b".FIT");
        data.extend(crc_of(&data).to_le_bytes());

        data.extend(&self.records);
        data.extend(crc_of(&data).to_le_bytes());
        data
    }
}

/// A two-lap ride recorded by an Edge 500, one record every ten seconds.
///
/// The activity message places the device two hours ahead of UTC.
pub fn ride() -> Vec<u8> {
    activity(2, 1036)
}

/// An activity of the given sport and Garmin product.
pub fn activity(sport: u8, product: u16) -> Vec<u8> {
    let mut fit = Fit::new();

    fit.message(0, 0, &[
        (0, V::Enum(4)),
        (1, V::U16(1)),
        (2, V::U16(product)),
        (4, V::U32(START - 60)),
    ]);

    let record = |t: u32, i: u32| -> [(u8, V); 9] {
        [
            (253, V::U32(t)),
            (0, V::I32(609_116_199 + i as i32)),
            (1, V::I32(83_886_080)),
            (2, V::U16(((100 + i) * 5 + 2500) as u16)),
            (3, V::U8(120 + i as u8)),
            (4, V::U8(80 + i as u8)),
            (5, V::U32(i * 10_000)),
            (6, V::U16(10_000)),
            (13, V::I8(20 + i as i8)),
        ]
    };

    fit.define(1, 20, &record(0, 0));

    // Before the session start, so dropped.
    fit.data(1, &record(START - 5, 0));

    // Written out of order to exercise the sort.
    for i in [0, 1, 2, 4, 3, 5, 6] {
        fit.data(1, &record(START + i * 10, i));
    }

    fit.message(2, 19, &[
        (253, V::U32(START + 30)),
        (7, V::U32(30_000)),
        (9, V::U32(30_000)),
        (13, V::U16(10_000)),
        (15, V::U8(125)),
        (16, V::U8(130)),
        (21, V::U16(10)),
    ]);
    fit.data(2, &[
        (253, V::U32(START + 60)),
        (7, V::U32(30_000)),
        (9, V::U32(30_000)),
        (13, V::U16(10_000)),
        (15, V::U8(128)),
        (16, V::U8(126)),
        (21, V::U16(5)),
    ]);

    fit.message(3, 18, &[
        (2, V::U32(START)),
        (5, V::Enum(sport)),
        (7, V::U32(65_000)),
        (8, V::U32(60_049)),
        (9, V::U32(60_000)),
        (11, V::U16(42)),
        (14, V::U16(10_000)),
        (15, V::U16(11_000)),
        (16, V::U8(123)),
        (17, V::U8(126)),
        (18, V::U8(83)),
        (19, V::U8(86)),
        (22, V::U16(15)),
        (23, V::U16(12)),
        (57, V::I8(23)),
    ]);

    fit.message(4, 23, &[(0, V::U8(0)), (27, V::Str("Edge 500", 16))]);

    fit.message(5, 34, &[
        (253, V::U32(START + 70)),
        (5, V::U32(START + 70 + 7200)),
    ]);

    fit.finish()
}

/// A settings file: a valid document holding no activity.
pub fn settings() -> Vec<u8> {
    let mut fit = Fit::new();
    fit.message(0, 0, &[(0, V::Enum(2)), (1, V::U16(1)), (2, V::U16(1036))]);
    fit.finish()
}

/// Encode a value as binary-coded decimal.
pub fn bcd(value: u8) -> u8 {
    (value / 10) << 4 | (value % 10)
}

/// An F11 recording: 2008-09-01 19:27:48, 0:54:31.0, one absolute and
/// three relative zones.
pub fn f11() -> Vec<u8> {
    let mut data = vec![0u8; 0x50];

    let len = data.len() as u16;
    data[0..2].copy_from_slice(&len.to_le_bytes());
    data[0x0A..0x10].copy_from_slice(&[
        bcd(48),
        bcd(27),
        bcd(19),
        bcd(1),
        bcd(9),
        bcd(8),
    ]);
    data[0x10..0x14].copy_from_slice(&[bcd(0), bcd(31), bcd(54), bcd(0)]);
    data[0x14] = 156;
    data[0x15] = 193;
    data[0x16..0x18].copy_from_slice(&601u16.to_le_bytes());

    let zones: [(u8, u8, u8, [u16; 3]); 4] = [
        (141, 160, 1, [0, 1898, 0]),
        (60, 70, 0, [0, 363, 0]),
        (71, 80, 0, [0, 1898, 0]),
        (81, 90, 0, [0, 1010, 0]),
    ];

    for (i, (lower, upper, flags, times)) in zones.into_iter().enumerate() {
        let at = 0x18 + 10 * i;
        data[at] = lower;
        data[at + 1] = upper;
        data[at + 2] = flags;
        for (j, t) in times.into_iter().enumerate() {
            data[at + 4 + 2 * j..at + 6 + 2 * j].copy_from_slice(&t.to_le_bytes());
        }
    }

    data[0x40..0x44].copy_from_slice(&2776u32.to_le_bytes());
    data[0x44..0x48].copy_from_slice(&263u32.to_le_bytes());

    data
}

/// An S-series recording with speed and altitude: two laps and four samples
/// at a 5 s interval.
pub fn srd() -> Vec<u8> {
    let mut data = Vec::new();

    data.extend(0u16.to_le_bytes());
    data.push(3);
    data.extend(b"ROAD\0\0\0");
    data.extend([bcd(0), bcd(30), bcd(7), bcd(15), bcd(6), bcd(5)]);
    data.extend([bcd(5), bcd(20), bcd(1), bcd(0)]);
    data.extend([140, 170, 2, 0, 0b0010_0101]);
    data.extend(650u16.to_le_bytes());
    data.extend(123_456u32.to_le_bytes());
    data.extend(250u16.to_le_bytes());
    data.push(30);
    data.extend(200u16.to_le_bytes());
    data.push(15);
    data.extend(4321u32.to_le_bytes());
    data.extend(4u16.to_le_bytes());
    for (lower, upper, within) in [(120u8, 160u8, 70u16), (0, 0, 0), (0, 0, 0)] {
        data.extend([lower, upper]);
        data.extend(5u16.to_le_bytes());
        data.extend(within.to_le_bytes());
        data.extend(10u16.to_le_bytes());
    }
    assert_eq!(data.len(), 67);

    // Speed slab: distance, average, maximum, bike counter.
    data.extend(1000u32.to_le_bytes());
    data.extend((30 * 16u16).to_le_bytes());
    data.extend((45 * 16u16).to_le_bytes());
    data.extend(0u32.to_le_bytes());

    // Altitude slab: min, avg, max, ascent, temperatures.
    data.extend(0x8014u16.to_le_bytes());
    data.extend(100u16.to_le_bytes());
    data.extend(250u16.to_le_bytes());
    data.extend(320u16.to_le_bytes());
    data.extend([5i8 as u8, 12, 18]);

    for (split, distance, altitude) in [(300u32, 250u32, 120u16), (600, 500, 0x800A)] {
        data.extend(split.to_le_bytes());
        data.extend([150, 145, 160]);
        data.extend((30 * 16u16).to_le_bytes());
        data.extend(distance.to_le_bytes());
        data.extend(altitude.to_le_bytes());
        data.extend(40u16.to_le_bytes());
        data.push(14);
    }

    let rows = [(130u8, 36u16, 100u16), (140, 36, 101), (150, 18, 0x8001), (145, 0, 99)];
    for (hr, speed, altitude) in rows {
        data.push(hr);
        data.extend((speed * 16).to_le_bytes());
        data.extend(altitude.to_le_bytes());
    }

    let len = data.len() as u16;
    data[0..2].copy_from_slice(&len.to_le_bytes());
    data
}

/// A metric HRM export with speed, cadence and altitude at a 5 s interval.
pub const HRM: &str = "\
[Params]
Version=106
Monitor=12
SMode=111000100
Date=20080901
StartTime=19:27:48.0
Length=00:00:20.0
Interval=5
Upper1=150
Lower1=120
Upper2=0
Lower2=0
Upper3=0
Lower3=0

[Note]
Evening loop

[IntTimes]
00:00:10.0\t140\t100\t130\t150
0\t0\t0\t360\t85\t110
0\t0\t0\t12\t1
0\t100\t0\t215\t0
0\t0\t0\t0\t0\t0
00:00:20.0\t150\t120\t145\t160
0\t0\t0\t180\t80\t120
0\t0\t0\t8\t2
0\t100\t0\t195\t0
0\t0\t0\t0\t0\t0

[HRData]
110\t360\t85\t100
130\t360\t90\t105
150\t180\t80\t110
160\t0\t0\t120
";

/// The HRM export with device totals and an HSR summary section.
pub fn hsr() -> String {
    format!(
        "{}
[Trip]
20
20
20
108
120
3840
5760
5000

[Summary]
Energy=312
EnergyTotal=12345
ExerciseTime=4321
RideTime=1234
Odometer=5001
AvgHR=141
MaxHR=161
MinAltitude=98
",
        HRM
    )
}
