use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use heapless::{String, Vec};
use shared::{Channel, Reading};

use crate::config::{NodeConfig, DEVICE_ID_LEN, SENSOR_NAME_LEN};
use crate::fmt::Debug2Format;
use crate::store::ReadingWatch;

/// `sensor/{device}/{sensor}/{channel}`
pub const TOPIC_LEN: usize = DEVICE_ID_LEN + SENSOR_NAME_LEN + 24;
pub const PAYLOAD_LEN: usize = 24;

pub type Topic = String<TOPIC_LEN>;
pub type Payload = String<PAYLOAD_LEN>;

/// Telemetry transport, typically an MQTT client.
#[allow(async_fn_in_trait)]
pub trait Publisher {
    type Error: core::fmt::Debug;

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error>;
}

#[derive(Debug)]
pub enum TelemetryError<E> {
    /// A topic or payload did not fit its buffer; nothing was sent.
    Format(Channel),
    Transport(Channel, E),
}

/// Publishes every channel of each new reading, then holds off.
pub struct TelemetryPublisher<'a, P, M: RawMutex, const N: usize> {
    publisher: P,
    watch: ReadingWatch<'a, M, N>,
    device_id: String<DEVICE_ID_LEN>,
    sensor_name: String<SENSOR_NAME_LEN>,
    holdoff: Duration,
}

impl<'a, P, M, const N: usize> TelemetryPublisher<'a, P, M, N>
where
    P: Publisher,
    M: RawMutex,
{
    pub fn new(publisher: P, watch: ReadingWatch<'a, M, N>, config: &NodeConfig) -> Self {
        Self {
            publisher,
            watch,
            device_id: config.device_id.clone(),
            sensor_name: config.sensor_name.clone(),
            holdoff: config.timing.publish_holdoff,
        }
    }

    pub fn topic(&self, channel: Channel) -> Option<Topic> {
        let mut topic = Topic::new();
        write!(
            topic,
            "sensor/{}/{}/{}",
            self.device_id,
            self.sensor_name,
            channel.name()
        )
        .ok()?;
        Some(topic)
    }

    /// Renders the whole burst up front so a formatting problem never leaves it half sent.
    fn messages(
        &self,
        reading: &Reading,
    ) -> Result<Vec<(Topic, Payload), { Channel::COUNT }>, TelemetryError<P::Error>> {
        let mut messages = Vec::new();
        for (channel, value) in reading.channels() {
            let topic = self.topic(channel).ok_or(TelemetryError::Format(channel))?;
            let mut payload = Payload::new();
            write!(payload, "{}", value).map_err(|_| TelemetryError::Format(channel))?;
            messages
                .push((topic, payload))
                .map_err(|_| TelemetryError::Format(channel))?;
        }
        Ok(messages)
    }

    /// Sends one message per channel, stopping at the first transport failure.
    pub async fn publish_reading(
        &mut self,
        reading: &Reading,
    ) -> Result<(), TelemetryError<P::Error>> {
        let messages = self.messages(reading)?;

        for ((topic, payload), channel) in messages.iter().zip(Channel::ALL) {
            trace!("telemetry: {} {}", topic.as_str(), payload.as_str());
            self.publisher
                .publish(topic, payload)
                .await
                .map_err(|e| TelemetryError::Transport(channel, e))?;
        }
        Ok(())
    }

    /// Waits for a reading newer than the last one published and publishes it.
    pub async fn publish_next(&mut self) -> Result<Reading, TelemetryError<P::Error>> {
        let reading = self.watch.changed().await;
        self.publish_reading(&reading).await.map(|()| reading)
    }

    pub async fn run(mut self) {
        loop {
            match self.publish_next().await {
                Ok(reading) => {
                    debug!("telemetry: published reading from {:?}", reading.captured_at)
                }
                Err(e) => error!("telemetry: publish failed: {:?}", Debug2Format(&e)),
            }

            Timer::after(self.holdoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::*;
    use crate::store::NodeStore;
    use crate::testing::reading;

    #[derive(Default)]
    struct Recorder {
        messages: std::vec::Vec<(std::string::String, std::string::String)>,
        fail_after: Option<usize>,
    }

    impl Publisher for &mut Recorder {
        type Error = &'static str;

        async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Self::Error> {
            if self.fail_after == Some(self.messages.len()) {
                return Err("connection lost");
            }
            self.messages.push((topic.into(), payload.into()));
            Ok(())
        }
    }

    fn config() -> NodeConfig {
        NodeConfig::new("e66138528f4a2b2c").unwrap()
    }

    #[test]
    fn publishes_all_channels_in_order() {
        let mut recorder = Recorder::default();
        let mut store = NodeStore::<NoopRawMutex>::new();
        let (_, [_, watch, _]) = store.split();
        let mut telemetry = TelemetryPublisher::new(&mut recorder, watch, &config());

        block_on(telemetry.publish_reading(&reading(800))).unwrap();
        drop(telemetry);

        let expected = [
            ("co2", "800"),
            ("temperature", "20.0"),
            ("humidity", "50.0"),
            ("pm1.0", "12.5"),
            ("pm2.5", "15.0"),
            ("pm4.0", "16.5"),
            ("pm10", "17.5"),
            ("voc", "101.0"),
            ("nox", "1.5"),
        ];
        assert_eq!(recorder.messages.len(), expected.len());
        for ((topic, payload), (channel, value)) in recorder.messages.iter().zip(expected) {
            assert_eq!(topic, &format!("sensor/e66138528f4a2b2c/sen66/{}", channel));
            assert_eq!(payload, value);
        }
    }

    #[test]
    fn transport_failure_aborts_burst() {
        let mut recorder = Recorder {
            fail_after: Some(3),
            ..Recorder::default()
        };
        let mut store = NodeStore::<NoopRawMutex>::new();
        let (_, [_, watch, _]) = store.split();
        let mut telemetry = TelemetryPublisher::new(&mut recorder, watch, &config());

        assert!(matches!(
            block_on(telemetry.publish_reading(&reading(800))),
            Err(TelemetryError::Transport(Channel::Pm1_0, "connection lost"))
        ));
        drop(telemetry);

        assert_eq!(recorder.messages.len(), 3);
    }

    #[test]
    fn topic_uses_configured_sensor_name() {
        let mut config = config();
        config.set_sensor_name("livingroom").unwrap();

        let mut recorder = Recorder::default();
        let mut store = NodeStore::<NoopRawMutex>::new();
        let (_, [_, watch, _]) = store.split();
        let telemetry = TelemetryPublisher::new(&mut recorder, watch, &config);

        assert_eq!(
            telemetry.topic(Channel::Nox).unwrap(),
            "sensor/e66138528f4a2b2c/livingroom/nox"
        );
    }
}
