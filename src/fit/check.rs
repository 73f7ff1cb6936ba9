//! FIT cyclic redundancy checks.

/// Nibble-wise lookup table of the FIT CRC-16.
const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Running CRC-16 accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc(u16);

impl Crc {
    pub fn new() -> Self {
        Self(0)
    }

    /// Accumulate a slice of bytes.
    pub fn update(mut self, bytes: &[u8]) -> Self {
        self.0 = bytes.iter().fold(self.0, |acc, &b| {
            let acc = step(acc, b & 0xF);
            step(acc, b >> 4)
        });
        self
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

/// CRC of a whole slice.
pub fn crc_of(bytes: &[u8]) -> u16 {
    Crc::new().update(bytes).value()
}

fn step(crc: u16, nibble: u8) -> u16 {
    let tmp = CRC_TABLE[(crc & 0xF) as usize];
    let crc = (crc >> 4) & 0x0FFF;
    crc ^ tmp ^ CRC_TABLE[nibble as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appending_the_crc_yields_zero() {
        let body = b"\x0e\x10\x43\x08\x00\x00\x00\x00.FIT";
        let crc = crc_of(body);

        let mut whole = body.to_vec();
        whole.extend_from_slice(&crc.to_le_bytes());
        assert_eq!(crc_of(&whole), 0);
    }

    #[test]
    fn incremental_matches_whole() {
        let data: Vec<u8> = (0..=255).collect();
        let split = Crc::new().update(&data[..100]).update(&data[100..]);
        assert_eq!(split.value(), crc_of(&data));
    }
}
