//! Fixtures shared by the unit tests.

use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::i2c::Transaction;
use sen66::crc::SensirionCrc;
use sen66::DEFAULT_ADDRESS;
use shared::{RawReading, Reading};

pub const ADDR: u8 = DEFAULT_ADDRESS;

/// PM 12.5/15.0/16.5/17.5, 50 %RH, 20 °C, VOC 101, NOx 1.5
pub fn reading(co2_ppm: u16) -> Reading {
    RawReading {
        pm1_0: 125,
        pm2_5: 150,
        pm4_0: 165,
        pm10: 175,
        humidity: 5000,
        temperature: 4000,
        voc_index: 1010,
        nox_index: 15,
        co2_ppm,
    }
    .scale(Instant::from_ticks(0))
}

/// The mock bus answers immediately.
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _: u32) {}
}

/// Raw words the sensor reports for [`reading`] with 800 ppm.
pub const WORDS: [u16; 9] = [125, 150, 165, 175, 5000, 4000, 1010, 15, 800];

pub fn frame(words: &[u16]) -> Vec<u8> {
    let mut crc = SensirionCrc::new();
    words
        .iter()
        .flat_map(|word| {
            let bytes = word.to_be_bytes();
            [bytes[0], bytes[1], crc.compute(bytes)]
        })
        .collect()
}

pub fn data_ready(ready: bool) -> Vec<Transaction> {
    vec![
        Transaction::write(ADDR, vec![0x02, 0x02]),
        Transaction::read(ADDR, frame(&[ready as u16])),
    ]
}

pub fn measurement(response: Vec<u8>) -> Vec<Transaction> {
    vec![
        Transaction::write(ADDR, vec![0x03, 0x00]),
        Transaction::read(ADDR, response),
    ]
}

pub fn status(value: u32) -> Vec<Transaction> {
    vec![
        Transaction::write(ADDR, vec![0xd2, 0x06]),
        Transaction::read(ADDR, frame(&[(value >> 16) as u16, value as u16])),
    ]
}
