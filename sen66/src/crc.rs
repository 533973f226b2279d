//! CRC-8 protecting every 16-bit word on the wire.

use crc_all::Crc;

use crate::fmt::Debug2Format;

/// Polynomial 0x31, initial value 0xFF, no reflection and no final XOR.
pub struct SensirionCrc {
    inner: Crc<u8>,
}

impl SensirionCrc {
    pub fn new() -> Self {
        Self {
            inner: Crc::<u8>::new(0x31, 8, 0xff, 0x00, false),
        }
    }

    pub fn compute(&mut self, word: [u8; 2]) -> u8 {
        self.inner.init();
        self.inner.update(&word);
        self.inner.finish()
    }

    /// Checks a frame made of (2 data bytes, 1 CRC byte) groups.
    ///
    /// Every group is checked, so each mismatching offset gets logged, not just the first.
    pub fn verify(&mut self, frame: &[u8]) -> bool {
        if frame.len() % 3 != 0 {
            warn!("CRC: frame of {} bytes is not made of 3-byte groups", frame.len());
            return false;
        }

        let mut valid = true;
        for (index, group) in frame.chunks_exact(3).enumerate() {
            if self.compute([group[0], group[1]]) != group[2] {
                warn!(
                    "CRC: mismatch at offset {}: {:?}",
                    index * 3,
                    Debug2Format(group)
                );
                valid = false;
            }
        }

        valid
    }
}

impl Default for SensirionCrc {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc() {
        let mut crc = SensirionCrc::new();

        assert_eq!(0x92, crc.compute([0xbe, 0xef]));
        assert_eq!(crc.compute([0xbe, 0xef]), crc.compute([0xbe, 0xef]));
    }

    #[test]
    fn verifies_sensor_frame() {
        let mut crc = SensirionCrc::new();
        // ready flag set, followed by a PM1.0 word of 1230
        let frame = [0x00, 0x01, 0xb0, 0x04, 0xce, crc.compute([0x04, 0xce])];

        assert!(crc.verify(&frame));
    }

    #[test]
    fn any_flipped_bit_fails() {
        let mut crc = SensirionCrc::new();
        let mut frame = [0u8; 9];
        for (index, word) in [[0xbe, 0xef], [0x0f, 0xa0], [0x13, 0x88]].iter().enumerate() {
            frame[index * 3] = word[0];
            frame[index * 3 + 1] = word[1];
            frame[index * 3 + 2] = crc.compute(*word);
        }
        assert!(crc.verify(&frame));

        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame;
                corrupted[byte] ^= 1 << bit;
                assert!(!crc.verify(&corrupted), "byte {} bit {}", byte, bit);
            }
        }
    }

    #[test]
    fn rejects_partial_groups() {
        let mut crc = SensirionCrc::new();

        assert!(!crc.verify(&[0xbe, 0xef]));
        assert!(!crc.verify(&[0xbe, 0xef, 0x92, 0x00]));
    }
}
