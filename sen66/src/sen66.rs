use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use shared::{Channel, RawReading, Reading};

use crate::fmt::Debug2Format;
use crate::{Error, SensirionCommand, SensirionI2c};

pub const DEFAULT_ADDRESS: u8 = 0x6b;

/// Low 11 bits of the data-ready word carry the flag.
const DATA_READY_MASK: u16 = 0x07ff;
/// Nine words: PM1.0, PM2.5, PM4.0, PM10, humidity, temperature, VOC, NOx, CO2.
const MEASUREMENT_LEN: usize = 27;
const STATUS_LEN: usize = 6;
/// Execution time of the read commands before their response can be fetched.
const RESPONSE_DELAY_MS: u32 = 20;

// Values the sensor reports for a channel it cannot measure (yet).
const UNKNOWN_UNSIGNED: u16 = 0xffff;
const UNKNOWN_SIGNED: i16 = 0x7fff;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    StartContinuousMeasurement,
    StopMeasurement,
    ReadMeasuredValues,
    GetDataReady,
    DeviceReset,
    ReadDeviceStatus,
}

impl SensirionCommand for Command {
    fn raw(&self) -> u16 {
        match self {
            Command::StartContinuousMeasurement => 0x0021,
            Command::StopMeasurement => 0x0104,
            Command::ReadMeasuredValues => 0x0300,
            Command::GetDataReady => 0x0202,
            Command::DeviceReset => 0xd304,
            Command::ReadDeviceStatus => 0xd206,
        }
    }
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::StartContinuousMeasurement,
        Command::StopMeasurement,
        Command::ReadMeasuredValues,
        Command::GetDataReady,
        Command::DeviceReset,
        Command::ReadDeviceStatus,
    ];

    pub fn from_raw(raw: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.raw() == raw)
    }
}

/// Contents of the device status register. Diagnostic only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    pub value: u32,
    /// `false` if the register arrived with a bad CRC, in which case `value` is unreliable.
    pub crc_valid: bool,
}

pub struct Sen66<T, D>
where
    T: I2c,
    D: DelayNs,
{
    bus: SensirionI2c<T>,
    delay: D,
    address: u8,
    last: Option<Reading>,
}

impl<T, D> Sen66<T, D>
where
    T: I2c,
    D: DelayNs,
{
    pub fn new(bus: T, delay: D) -> Self {
        Self::with_address(bus, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(bus: T, delay: D, address: u8) -> Self {
        Self {
            bus: SensirionI2c::new(bus),
            delay,
            address,
            last: None,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Stops any running measurement and resets the device.
    ///
    /// Failures are only logged: right after power-up the device may not be listening yet.
    pub fn reset(&mut self) {
        for command in [Command::StopMeasurement, Command::DeviceReset] {
            if let Err(e) = self.bus.write_command(self.address, command) {
                debug!(
                    "SEN66: {:?} was not acknowledged: {:?}",
                    command,
                    Debug2Format(&e)
                );
            }
        }
    }

    pub fn start_continuous_measurement(&mut self) -> Result<(), Error<T::Error>> {
        self.bus
            .write_command(self.address, Command::StartContinuousMeasurement)
    }

    pub fn is_data_ready(&mut self) -> Result<bool, Error<T::Error>> {
        let word = self.bus.read_word(
            self.address,
            Command::GetDataReady,
            RESPONSE_DELAY_MS,
            &mut self.delay,
        )?;

        Ok(word & DATA_READY_MASK != 0)
    }

    /// Reads the latest measurement.
    ///
    /// `Ok(None)` means the sensor has no new data yet, which is a normal polling outcome.
    pub fn read(&mut self) -> Result<Option<Reading>, Error<T::Error>> {
        if !self.is_data_ready()? {
            return Ok(None);
        }

        let mut frame = [0u8; MEASUREMENT_LEN];
        self.bus.read_verified(
            self.address,
            Command::ReadMeasuredValues,
            RESPONSE_DELAY_MS,
            &mut self.delay,
            &mut frame,
        )?;

        let reading = decode(&frame, Instant::now()).map_err(Error::Incomplete)?;
        self.last = Some(reading);

        Ok(Some(reading))
    }

    /// The last reading returned by [`Self::read`].
    pub fn last_reading(&self) -> Option<Reading> {
        self.last
    }

    /// Reads the device status register.
    ///
    /// A CRC mismatch is logged and reported through [`DeviceStatus::crc_valid`]; only bus
    /// failures are returned as errors.
    pub fn status(&mut self) -> Result<DeviceStatus, Error<T::Error>> {
        let mut frame = [0u8; STATUS_LEN];
        self.bus.read_raw(
            self.address,
            Command::ReadDeviceStatus,
            RESPONSE_DELAY_MS,
            &mut self.delay,
            &mut frame,
        )?;

        let crc_valid = self.bus.crc.verify(&frame);
        if !crc_valid {
            warn!("SEN66: status register failed CRC");
        }

        let high = u16::from_be_bytes([frame[0], frame[1]]) as u32;
        let low = u16::from_be_bytes([frame[3], frame[4]]) as u32;

        Ok(DeviceStatus {
            value: high << 16 | low,
            crc_valid,
        })
    }

    pub fn release(self) -> (T, D) {
        (self.bus.release(), self.delay)
    }
}

fn word(frame: &[u8; MEASUREMENT_LEN], index: usize) -> [u8; 2] {
    [frame[index * 3], frame[index * 3 + 1]]
}

/// Turns a CRC-checked measurement frame into a reading; sign is applied only here.
fn decode(frame: &[u8; MEASUREMENT_LEN], captured_at: Instant) -> Result<Reading, Channel> {
    let unsigned = |index: usize, channel: Channel| -> Result<u16, Channel> {
        match u16::from_be_bytes(word(frame, index)) {
            UNKNOWN_UNSIGNED => Err(channel),
            raw => Ok(raw),
        }
    };
    let signed = |index: usize, channel: Channel| -> Result<i16, Channel> {
        match i16::from_be_bytes(word(frame, index)) {
            UNKNOWN_SIGNED => Err(channel),
            raw => Ok(raw),
        }
    };

    let raw = RawReading {
        pm1_0: unsigned(0, Channel::Pm1_0)?,
        pm2_5: unsigned(1, Channel::Pm2_5)?,
        pm4_0: unsigned(2, Channel::Pm4_0)?,
        pm10: unsigned(3, Channel::Pm10)?,
        humidity: signed(4, Channel::Humidity)?,
        temperature: signed(5, Channel::Temperature)?,
        voc_index: signed(6, Channel::Voc)?,
        nox_index: signed(7, Channel::Nox)?,
        co2_ppm: unsigned(8, Channel::Co2)?,
    };

    Ok(raw.scale(captured_at))
}
