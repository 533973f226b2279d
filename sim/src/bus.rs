use std::time::{Duration, Instant};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use sen66::crc::SensirionCrc;
use sen66::Command;

/// Samples for which the NOx channel is still reported as unknown.
const NOX_WARMUP: u32 = 3;
const UNKNOWN_SIGNED: u16 = 0x7fff;

/// A SEN66 answering on an in-memory bus with slowly drifting air.
pub struct SimulatedSen66 {
    address: u8,
    crc: SensirionCrc,
    sample_period: Duration,
    corrupt_every: Option<u32>,
    pending: Option<Command>,
    measuring_since: Option<Instant>,
    last_sample: Option<Instant>,
    samples: u32,
}

impl SimulatedSen66 {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            crc: SensirionCrc::new(),
            sample_period: Duration::from_secs(1),
            corrupt_every: None,
            pending: None,
            measuring_since: None,
            last_sample: None,
            samples: 0,
        }
    }

    pub fn with_sample_period(mut self, period: Duration) -> Self {
        self.sample_period = period;
        self
    }

    /// Flips a checksum bit in every `n`-th measurement frame.
    pub fn corrupt_every(mut self, n: Option<u32>) -> Self {
        self.corrupt_every = n.filter(|n| *n > 0);
        self
    }

    fn data_ready(&self) -> bool {
        let since = match (self.last_sample, self.measuring_since) {
            (Some(last), _) => last,
            (None, Some(start)) => start,
            (None, None) => return false,
        };
        self.measuring_since.is_some() && since.elapsed() >= self.sample_period
    }

    fn sample(&mut self) -> [u16; 9] {
        self.samples += 1;
        self.last_sample = Some(Instant::now());

        let t = self.samples as f32;
        let wave = (t / 12.0).sin();
        let pm1_0 = 4.0 + 1.5 * wave;
        let pm2_5 = pm1_0 * 1.4;
        let pm4_0 = pm2_5 * 1.1;
        let pm10 = pm4_0 * 1.1;
        let humidity = 45.0 + 5.0 * wave;
        let temperature = 21.5 + 0.8 * (t / 30.0).sin();
        let voc = 100.0 + 20.0 * wave;
        let co2 = 650.0 + 150.0 * (t / 45.0).sin();
        let nox = if self.samples <= NOX_WARMUP {
            UNKNOWN_SIGNED
        } else {
            ((1.0 + 0.5 * wave) * 10.0) as i16 as u16
        };

        [
            (pm1_0 * 10.0) as u16,
            (pm2_5 * 10.0) as u16,
            (pm4_0 * 10.0) as u16,
            (pm10 * 10.0) as u16,
            (humidity * 100.0) as i16 as u16,
            (temperature * 200.0) as i16 as u16,
            (voc * 10.0) as i16 as u16,
            nox,
            co2 as u16,
        ]
    }

    fn frame(&mut self, words: &[u16]) -> Vec<u8> {
        words
            .iter()
            .flat_map(|word| {
                let bytes = word.to_be_bytes();
                [bytes[0], bytes[1], self.crc.compute(bytes)]
            })
            .collect()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), ErrorKind> {
        let raw = match bytes {
            [high, low] => u16::from_be_bytes([*high, *low]),
            _ => return Err(ErrorKind::Other),
        };
        let command = Command::from_raw(raw)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data))?;
        log::trace!("sen66-sim: {:?}", command);

        match command {
            Command::StartContinuousMeasurement => {
                self.measuring_since = Some(Instant::now());
                self.last_sample = None;
            }
            Command::StopMeasurement | Command::DeviceReset => self.measuring_since = None,
            Command::GetDataReady | Command::ReadMeasuredValues | Command::ReadDeviceStatus => {
                self.pending = Some(command)
            }
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<(), ErrorKind> {
        let frame = match self.pending.take() {
            Some(Command::GetDataReady) => {
                let ready = self.data_ready();
                self.frame(&[ready as u16])
            }
            Some(Command::ReadMeasuredValues) => {
                let words = self.sample();
                let mut frame = self.frame(&words);
                if matches!(self.corrupt_every, Some(n) if self.samples % n == 0) {
                    log::debug!("sen66-sim: corrupting sample {}", self.samples);
                    frame[2] ^= 0x01;
                }
                frame
            }
            Some(Command::ReadDeviceStatus) => self.frame(&[0, 0]),
            _ => return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
        };

        if frame.len() != buffer.len() {
            return Err(ErrorKind::Other);
        }
        buffer.copy_from_slice(&frame);
        Ok(())
    }
}

impl ErrorType for SimulatedSen66 {
    type Error = ErrorKind;
}

impl I2c for SimulatedSen66 {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.write(bytes)?,
                Operation::Read(buffer) => self.read(buffer)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use embassy_time::Delay;
    use sen66::{Error, ProtocolError, Sen66, DEFAULT_ADDRESS};
    use shared::Channel;

    use super::*;

    fn sensor(corrupt_every: Option<u32>) -> Sen66<SimulatedSen66, Delay> {
        let bus = SimulatedSen66::new(DEFAULT_ADDRESS)
            .with_sample_period(Duration::ZERO)
            .corrupt_every(corrupt_every);
        Sen66::new(bus, Delay)
    }

    #[test]
    fn nothing_ready_before_start() {
        let mut sensor = sensor(None);
        assert!(matches!(sensor.read(), Ok(None)));
    }

    #[test]
    fn nox_warms_up() {
        let mut sensor = sensor(None);
        sensor.start_continuous_measurement().unwrap();

        for _ in 0..NOX_WARMUP {
            assert!(matches!(
                sensor.read(),
                Err(Error::Incomplete(Channel::Nox))
            ));
        }

        let reading = sensor.read().unwrap().unwrap();
        assert!((500..=800).contains(&reading.co2_ppm));
        assert!(reading.temperature > 20.0 && reading.temperature < 23.0);
        assert!(reading.pm1_0 <= reading.pm2_5 && reading.pm4_0 <= reading.pm10);
    }

    #[test]
    fn injected_corruption_fails_crc() {
        let mut sensor = sensor(Some(1));
        sensor.start_continuous_measurement().unwrap();

        assert!(matches!(
            sensor.read(),
            Err(Error::Protocol(ProtocolError::Crc))
        ));
    }

    #[test]
    fn wrong_address_is_not_acknowledged() {
        let mut sensor = Sen66::with_address(SimulatedSen66::new(DEFAULT_ADDRESS), Delay, 0x10);
        assert!(matches!(
            sensor.start_continuous_measurement(),
            Err(Error::Bus(ErrorKind::NoAcknowledge(_)))
        ));
    }

    #[test]
    fn reset_stops_measurement() {
        let mut sensor = sensor(None);
        sensor.start_continuous_measurement().unwrap();
        sensor.reset();

        assert!(matches!(sensor.read(), Ok(None)));
        assert!(sensor.status().unwrap().crc_valid);
    }
}
