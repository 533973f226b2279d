use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use heapless::Vec;
use shared::{advertising_data, Advertisement, Reading, MAX_ADV_DATA_LEN};

use crate::fmt::Debug2Format;
use crate::store::ReadingWatch;

/// BLE radio able to replace the data of a running advertisement.
#[allow(async_fn_in_trait)]
pub trait Advertiser {
    type Error: core::fmt::Debug;

    async fn advertise(
        &mut self,
        interval: Duration,
        adv_data: &[u8],
        scan_data: &[u8],
    ) -> Result<(), Self::Error>;
}

/// Keeps the advertisement in step with the newest reading.
pub struct BeaconBroadcaster<'a, A, M: RawMutex, const N: usize> {
    advertiser: A,
    watch: ReadingWatch<'a, M, N>,
    scan_data: Vec<u8, MAX_ADV_DATA_LEN>,
    interval: Duration,
    period: Duration,
}

impl<'a, A, M, const N: usize> BeaconBroadcaster<'a, A, M, N>
where
    A: Advertiser,
    M: RawMutex,
{
    pub fn new(
        advertiser: A,
        watch: ReadingWatch<'a, M, N>,
        scan_data: Vec<u8, MAX_ADV_DATA_LEN>,
        interval: Duration,
        period: Duration,
    ) -> Self {
        Self {
            advertiser,
            watch,
            scan_data,
            interval,
            period,
        }
    }

    pub async fn broadcast(&mut self, reading: &Reading) -> Result<(), A::Error> {
        let advertisement = Advertisement::from(reading);
        trace!("beacon: {:?}", advertisement);

        self.advertiser
            .advertise(self.interval, &advertising_data(&advertisement), &self.scan_data)
            .await
    }

    /// Nothing is advertised before the first reading.
    pub async fn run(mut self) {
        let mut reading = self.watch.changed().await;
        loop {
            if let Some(newer) = self.watch.try_changed() {
                reading = newer;
            }

            if let Err(e) = self.broadcast(&reading).await {
                warn!("beacon: advertising failed: {:?}", Debug2Format(&e));
            }

            Timer::after(self.period).await;
        }
    }
}
