#![cfg_attr(not(test), no_std)]

// must come first so the logging macros are visible to the other modules
mod fmt;

pub mod crc;
pub mod sen66;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use shared::Channel;

use crate::crc::SensirionCrc;

pub use crate::sen66::{Command, DeviceStatus, Sen66, DEFAULT_ADDRESS};

pub trait SensirionCommand {
    fn raw(&self) -> u16;
}

#[derive(Debug)]
pub enum Error<Inner: core::fmt::Debug> {
    /// The bus transaction failed.
    Bus(Inner),
    /// The sensor answered with a frame that failed validation.
    Protocol(ProtocolError),
    /// The frame was valid but the sensor reported a channel as unknown.
    Incomplete(Channel),
}

impl<E: embedded_hal::i2c::Error> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::Bus(e)
    }
}

#[cfg(feature = "defmt")]
impl<E: core::fmt::Debug + defmt::Format> defmt::Format for Error<E> {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::Bus(e) => defmt::write!(fmt, "bus: {}", e),
            Error::Protocol(e) => defmt::write!(fmt, "protocol: {}", e),
            Error::Incomplete(channel) => defmt::write!(fmt, "incomplete: {}", channel),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    Crc,
}

impl<T: core::fmt::Debug> From<ProtocolError> for Error<T> {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

/// Command/response framing shared by Sensirion I2C sensors.
pub struct SensirionI2c<T>
where
    T: I2c,
{
    bus: T,
    pub(crate) crc: SensirionCrc,
}

impl<T> SensirionI2c<T>
where
    T: I2c,
{
    pub fn new(bus: T) -> SensirionI2c<T> {
        Self {
            bus,
            crc: Default::default(),
        }
    }

    pub fn write_command<Command: SensirionCommand>(
        &mut self,
        address: u8,
        command: Command,
    ) -> Result<(), Error<T::Error>> {
        self.bus.write(address, &command.raw().to_be_bytes())?;

        Ok(())
    }

    /// Issues `command`, gives the sensor `delay_ms` to prepare the response and reads it into
    /// `buffer` without validating it.
    pub fn read_raw<Command: SensirionCommand>(
        &mut self,
        address: u8,
        command: Command,
        delay_ms: u32,
        delay: &mut impl DelayNs,
        buffer: &mut [u8],
    ) -> Result<(), Error<T::Error>> {
        self.bus.write(address, &command.raw().to_be_bytes())?;

        delay.delay_ms(delay_ms);

        self.bus.read(address, buffer)?;

        Ok(())
    }

    /// Like [`Self::read_raw`], but every 3-byte group of the response must pass its CRC.
    pub fn read_verified<Command: SensirionCommand>(
        &mut self,
        address: u8,
        command: Command,
        delay_ms: u32,
        delay: &mut impl DelayNs,
        buffer: &mut [u8],
    ) -> Result<(), Error<T::Error>> {
        self.read_raw(address, command, delay_ms, delay, buffer)?;

        if !self.crc.verify(buffer) {
            return Err(ProtocolError::Crc.into());
        }

        Ok(())
    }

    pub fn read_word<Command: SensirionCommand>(
        &mut self,
        address: u8,
        command: Command,
        delay_ms: u32,
        delay: &mut impl DelayNs,
    ) -> Result<u16, Error<T::Error>> {
        let mut buffer = [0; 3];
        self.read_verified(address, command, delay_ms, delay, &mut buffer)?;

        Ok(u16::from_be_bytes([buffer[0], buffer[1]]))
    }

    pub fn release(self) -> T {
        self.bus
    }
}
