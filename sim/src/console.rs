//! Host stand-ins for the node's peripherals. Everything ends up in the log.

use std::convert::Infallible;
use std::future;

use embassy_time::Duration;
use sen66_node::tasks::{Advertiser, Link, Publisher, TextDisplay};
use shared::Advertisement;

pub struct ConsoleDisplay;

impl TextDisplay for ConsoleDisplay {
    type Error = Infallible;

    fn show(&mut self, text: &str) -> Result<(), Infallible> {
        log::info!(target: "display", "[{:<8}]", text);
        Ok(())
    }
}

/// Prints every message instead of sending it to a broker.
pub struct LogPublisher;

impl Publisher for LogPublisher {
    type Error = Infallible;

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Infallible> {
        log::info!(target: "mqtt", "{} {}", topic, payload);
        Ok(())
    }
}

pub struct LogAdvertiser;

impl Advertiser for LogAdvertiser {
    type Error = Infallible;

    async fn advertise(
        &mut self,
        interval: Duration,
        adv_data: &[u8],
        scan_data: &[u8],
    ) -> Result<(), Infallible> {
        // skip the flags and the manufacturer data header
        let decoded = adv_data.get(5..).and_then(Advertisement::parse);
        log::debug!(
            target: "ble",
            "every {} ms: {:02x?} / {:02x?} {:?}",
            interval.as_millis(),
            adv_data,
            scan_data,
            decoded
        );
        Ok(())
    }
}

/// A link that comes up once and stays up.
#[derive(Default)]
pub struct LoopbackLink {
    up: bool,
}

impl Link for LoopbackLink {
    async fn connected(&mut self) {
        if self.up {
            future::pending::<()>().await;
        }
        self.up = true;
    }
}
