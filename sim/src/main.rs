mod bus;
mod console;

use clap::Parser;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Delay;
use sen66::{Sen66, DEFAULT_ADDRESS};
use sen66_node::config::hex_device_id;
use sen66_node::{App, Board, NodeConfig, NodeStore};

use crate::bus::SimulatedSen66;
use crate::console::{ConsoleDisplay, LogAdvertiser, LogPublisher, LoopbackLink};

/// What a node would read from the chip's unique id registers.
const SIMULATED_UNIQUE_ID: [u8; 8] = [0xe6, 0x61, 0x38, 0x52, 0x8f, 0x4a, 0x2b, 0x2c];

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Config {
    /// Identity used in telemetry topics [default: hex of the simulated unique id]
    #[clap(long)]
    device_id: Option<String>,
    #[clap(long, default_value = "sen66")]
    sensor_name: String,
    /// Name in the BLE scan response
    #[clap(long, default_value = "SEN66")]
    advertised_name: String,
    #[clap(long, default_value_t = 50)]
    advertising_interval_ms: u64,
    /// Corrupt the checksum of every n-th measurement frame
    #[clap(long)]
    corrupt_every: Option<u32>,
}

impl Config {
    fn node_config(&self) -> eyre::Result<NodeConfig> {
        let device_id = match &self.device_id {
            Some(id) => id.clone(),
            None => hex_device_id(&SIMULATED_UNIQUE_ID)
                .map_err(|e| eyre::eyre!("{:?}", e))?
                .as_str()
                .to_owned(),
        };

        let mut config =
            NodeConfig::new(&device_id).map_err(|e| eyre::eyre!("device id: {:?}", e))?;
        config
            .set_sensor_name(&self.sensor_name)
            .map_err(|e| eyre::eyre!("sensor name: {:?}", e))?;
        config
            .set_advertised_name(&self.advertised_name)
            .map_err(|e| eyre::eyre!("advertised name: {:?}", e))?;
        config.advertising_interval =
            embassy_time::Duration::from_millis(self.advertising_interval_ms);

        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let args = Config::parse();
    let config = args.node_config()?;
    log::info!("starting node {:?}", config);

    let bus = SimulatedSen66::new(DEFAULT_ADDRESS).corrupt_every(args.corrupt_every);
    let board = Board {
        sensor: Sen66::new(bus, Delay),
        display: ConsoleDisplay,
        publisher: LogPublisher,
        advertiser: LogAdvertiser,
        link: LoopbackLink::default(),
    };

    let mut store = NodeStore::<NoopRawMutex>::new();
    App::run(&config, &mut store, board)
        .await
        .map_err(|e| eyre::eyre!("node failed to start: {:?}", e))?;

    Ok(())
}
