use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use sen66::{Error, Sen66};

use crate::config::Timing;
use crate::fmt::Debug2Format;
use crate::store::ReadingWriter;

/// Outcome of one polling cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cycle {
    /// A new reading was stored and announced.
    Stored,
    NotReady,
    /// Bus or protocol failure, the store was left untouched.
    Failed,
}

/// Polls the sensor and feeds the reading store.
pub struct AcquisitionLoop<'a, T: I2c, W: DelayNs, M: RawMutex, const N: usize> {
    sensor: Sen66<T, W>,
    writer: ReadingWriter<'a, M, N>,
    timing: Timing,
}

impl<'a, T, W, M, const N: usize> AcquisitionLoop<'a, T, W, M, N>
where
    T: I2c,
    W: DelayNs,
    M: RawMutex,
{
    pub fn new(sensor: Sen66<T, W>, writer: ReadingWriter<'a, M, N>, timing: Timing) -> Self {
        Self {
            sensor,
            writer,
            timing,
        }
    }

    /// Resets the sensor and starts continuous measurement.
    ///
    /// Only the start command is allowed to fail the bring-up.
    pub async fn start(&mut self) -> Result<(), Error<T::Error>> {
        self.sensor.reset();
        Timer::after(self.timing.reset_settle).await;

        self.sensor.start_continuous_measurement()?;
        Timer::after(self.timing.start_settle).await;

        info!("SEN66: measuring at {:#x}", self.sensor.address());
        self.log_status();
        Ok(())
    }

    pub fn poll(&mut self) -> Cycle {
        match self.sensor.read() {
            Ok(Some(reading)) => {
                debug!("SEN66: {:?}", reading);
                self.writer.publish(reading);
                Cycle::Stored
            }
            Ok(None) => {
                trace!("SEN66: no new data");
                Cycle::NotReady
            }
            Err(Error::Incomplete(channel)) => {
                warn!("SEN66: {:?} not available yet", channel);
                Cycle::Failed
            }
            Err(e) => {
                error!("SEN66: read failed: {:?}", Debug2Format(&e));
                self.log_status();
                Cycle::Failed
            }
        }
    }

    /// How long to wait before the next poll.
    pub fn delay_after(&self, cycle: Cycle) -> Duration {
        match cycle {
            Cycle::Failed => self.timing.error_cooldown,
            Cycle::Stored | Cycle::NotReady => self.timing.acquisition_period,
        }
    }

    pub async fn run(mut self) {
        loop {
            let cycle = self.poll();
            Timer::after(self.delay_after(cycle)).await;
        }
    }

    fn log_status(&mut self) {
        match self.sensor.status() {
            Ok(status) => info!("SEN66: device status {:?}", status),
            Err(e) => warn!("SEN66: device status unavailable: {:?}", Debug2Format(&e)),
        }
    }
}
