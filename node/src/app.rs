use embassy_futures::join::join5;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use sen66::Sen66;
use shared::scan_response;

use crate::config::NodeConfig;
use crate::store::NodeStore;
use crate::tasks::{
    AcquisitionLoop, Advertiser, BeaconBroadcaster, Connectivity, DisplayPresenter, Link,
    Publisher, TelemetryPublisher, TextDisplay,
};

/// Peripherals the node runs on, handed over by the platform after boot.
pub struct Board<T: I2c, W: DelayNs, D, P, A, L> {
    pub sensor: Sen66<T, W>,
    pub display: D,
    pub publisher: P,
    pub advertiser: A,
    pub link: L,
}

#[derive(Debug)]
pub enum StartupError<E: core::fmt::Debug> {
    Sensor(sen66::Error<E>),
    /// The advertised name does not fit into a scan response.
    ///
    /// Guards the scan response builder; a name within the 25 bytes
    /// [`NodeConfig`] allows always fits.
    ScanResponse,
}

impl<E: core::fmt::Debug> From<sen66::Error<E>> for StartupError<E> {
    fn from(e: sen66::Error<E>) -> Self {
        StartupError::Sensor(e)
    }
}

pub struct App;

impl App {
    /// Brings the sensor up and runs all loops.
    ///
    /// Returns only if the node could not start.
    pub async fn run<M, T, W, D, P, A, L>(
        config: &NodeConfig,
        store: &mut NodeStore<M>,
        board: Board<T, W, D, P, A, L>,
    ) -> Result<(), StartupError<T::Error>>
    where
        M: RawMutex,
        T: I2c,
        W: DelayNs,
        D: TextDisplay,
        P: Publisher,
        A: Advertiser,
        L: Link,
    {
        let scan_data = scan_response(&config.advertised_name, config.appearance)
            .ok_or(StartupError::ScanResponse)?;

        let (writer, [display_watch, telemetry_watch, beacon_watch]) = store.split();

        let mut acquisition = AcquisitionLoop::new(board.sensor, writer, config.timing);
        acquisition.start().await?;

        let display = DisplayPresenter::new(
            board.display,
            display_watch,
            config.timing.display_period,
        );
        let telemetry = TelemetryPublisher::new(board.publisher, telemetry_watch, config);
        let beacon = BeaconBroadcaster::new(
            board.advertiser,
            beacon_watch,
            scan_data,
            config.advertising_interval,
            config.timing.beacon_period,
        );
        let connectivity = Connectivity::new(board.link);

        info!("node: running as {}", config.device_id.as_str());
        join5(
            acquisition.run(),
            display.run(),
            telemetry.run(),
            beacon.run(),
            connectivity.run(),
        )
        .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_time::Duration;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    use super::*;
    use crate::tasks::Cycle;
    use crate::testing::{data_ready, frame, measurement, status, NoDelay, ADDR, WORDS};

    struct Blank;

    impl TextDisplay for Blank {
        type Error = Infallible;

        fn show(&mut self, _: &str) -> Result<(), Infallible> {
            Ok(())
        }
    }

    struct Silent;

    impl Publisher for Silent {
        type Error = Infallible;

        async fn publish(&mut self, _: &str, _: &str) -> Result<(), Infallible> {
            Ok(())
        }
    }

    impl Advertiser for Silent {
        type Error = Infallible;

        async fn advertise(&mut self, _: Duration, _: &[u8], _: &[u8]) -> Result<(), Infallible> {
            Ok(())
        }
    }

    impl Link for Silent {
        async fn connected(&mut self) {}
    }

    #[derive(Default)]
    struct Recorder {
        messages: std::vec::Vec<(std::string::String, std::string::String)>,
    }

    impl Publisher for &mut Recorder {
        type Error = Infallible;

        async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Infallible> {
            self.messages.push((topic.into(), payload.into()));
            Ok(())
        }
    }

    type Messages = [(std::string::String, std::string::String)];

    fn payload<'a>(messages: &'a Messages, channel: &str) -> &'a str {
        messages
            .iter()
            .find(|(topic, _)| topic.rsplit('/').next() == Some(channel))
            .map(|(_, payload)| payload.as_str())
            .unwrap()
    }

    #[test]
    fn failing_start_stops_the_node() {
        let expectations = [
            Transaction::write(ADDR, vec![0x01, 0x04]),
            Transaction::write(ADDR, vec![0xd3, 0x04]),
            Transaction::write(ADDR, vec![0x00, 0x21]).with_error(ErrorKind::Other),
        ];
        let mut mock = I2cMock::new(&expectations);

        let mut config = NodeConfig::new("node").unwrap();
        config.timing.reset_settle = Duration::from_ticks(0);
        let mut store = NodeStore::<NoopRawMutex>::new();
        let board = Board {
            sensor: Sen66::new(mock.clone(), NoDelay),
            display: Blank,
            publisher: Silent,
            advertiser: Silent,
            link: Silent,
        };

        assert!(matches!(
            block_on(App::run(&config, &mut store, board)),
            Err(StartupError::Sensor(sen66::Error::Bus(ErrorKind::Other)))
        ));

        mock.done();
    }

    /// One reading travels from the bus to the telemetry transport.
    #[test]
    fn reading_reaches_telemetry() {
        let mut expectations = data_ready(true);
        expectations.extend(measurement(frame(&WORDS)));
        let mut mock = I2cMock::new(&expectations);

        let config = NodeConfig::new("e66138528f4a2b2c").unwrap();
        let mut store = NodeStore::<NoopRawMutex>::new();
        let (writer, [display, watch, _]) = store.split();
        let sensor = Sen66::new(mock.clone(), NoDelay);
        let mut acquisition = AcquisitionLoop::new(sensor, writer, config.timing);
        let mut recorder = Recorder::default();
        let mut telemetry = TelemetryPublisher::new(&mut recorder, watch, &config);

        assert_eq!(acquisition.poll(), Cycle::Stored);
        let reading = block_on(telemetry.publish_next()).unwrap();
        drop(telemetry);

        assert_eq!(reading.co2_ppm, 800);
        assert_eq!(display.latest(), Some(reading));
        assert_eq!(recorder.messages.len(), 9);
        assert_eq!(payload(&recorder.messages, "co2"), "800");
        assert_eq!(payload(&recorder.messages, "temperature"), "20.0");
        assert_eq!(payload(&recorder.messages, "humidity"), "50.0");
        assert_eq!(recorder.messages[0].0, "sensor/e66138528f4a2b2c/sen66/co2");

        mock.done();
    }

    /// A corrupted frame reaches none of the consumers.
    #[test]
    fn corrupted_frame_reaches_nobody() {
        let mut response = frame(&WORDS);
        // checksum of the humidity word
        response[14] ^= 0x01;

        let mut expectations = data_ready(true);
        expectations.extend(measurement(response));
        expectations.extend(status(0));
        let mut mock = I2cMock::new(&expectations);

        let config = NodeConfig::new("e66138528f4a2b2c").unwrap();
        let mut store = NodeStore::<NoopRawMutex>::new();
        let (writer, [mut display, mut telemetry, mut beacon]) = store.split();
        let sensor = Sen66::new(mock.clone(), NoDelay);
        let mut acquisition = AcquisitionLoop::new(sensor, writer, config.timing);

        assert_eq!(acquisition.poll(), Cycle::Failed);
        assert_eq!(display.try_changed(), None);
        assert_eq!(telemetry.try_changed(), None);
        assert_eq!(beacon.try_changed(), None);
        assert_eq!(beacon.latest(), None);

        drop(acquisition);
        assert_eq!(store.latest(), None);

        mock.done();
    }
}
