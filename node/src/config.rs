use core::fmt::Write;

use embassy_time::Duration;
use heapless::String;

pub const DEFAULT_SENSOR_NAME: &str = "sen66";
pub const DEFAULT_ADVERTISED_NAME: &str = "SEN66";
/// Bluetooth appearance "Air Quality Sensor".
pub const AIR_QUALITY_SENSOR_APPEARANCE: u16 = 0x0542;
pub const DEFAULT_ADVERTISING_INTERVAL: Duration = Duration::from_micros(50_000);

pub const DEVICE_ID_LEN: usize = 32;
pub const SENSOR_NAME_LEN: usize = 16;
/// A scan response holds the appearance (4 bytes) and the name header (2 bytes).
pub const ADVERTISED_NAME_LEN: usize = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    DeviceIdTooLong,
    DeviceIdInvalid,
    SensorNameTooLong,
    AdvertisedNameTooLong,
    SensorNameInvalid,
}

/// Cadences of the node loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    pub acquisition_period: Duration,
    /// Wait after a failed sensor read.
    pub error_cooldown: Duration,
    /// Wait after the reset before starting measurement.
    pub reset_settle: Duration,
    pub start_settle: Duration,
    pub display_period: Duration,
    /// Wait after each telemetry burst.
    pub publish_holdoff: Duration,
    pub beacon_period: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            acquisition_period: Duration::from_millis(1200),
            error_cooldown: Duration::from_millis(2000),
            reset_settle: Duration::from_millis(1200),
            start_settle: Duration::from_millis(100),
            display_period: Duration::from_millis(1000),
            publish_holdoff: Duration::from_millis(2000),
            beacon_period: Duration::from_millis(500),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    /// Identity used in telemetry topics.
    pub device_id: String<DEVICE_ID_LEN>,
    pub sensor_name: String<SENSOR_NAME_LEN>,
    pub advertised_name: String<ADVERTISED_NAME_LEN>,
    pub appearance: u16,
    pub advertising_interval: Duration,
    pub timing: Timing,
}

impl NodeConfig {
    /// The device id becomes a topic segment, so the same rules as for the
    /// sensor name apply.
    pub fn new(device_id: &str) -> Result<Self, ConfigError> {
        if !is_topic_segment(device_id) {
            return Err(ConfigError::DeviceIdInvalid);
        }
        Ok(Self {
            device_id: String::try_from(device_id).map_err(|_| ConfigError::DeviceIdTooLong)?,
            sensor_name: String::try_from(DEFAULT_SENSOR_NAME)
                .map_err(|_| ConfigError::SensorNameTooLong)?,
            advertised_name: String::try_from(DEFAULT_ADVERTISED_NAME)
                .map_err(|_| ConfigError::AdvertisedNameTooLong)?,
            appearance: AIR_QUALITY_SENSOR_APPEARANCE,
            advertising_interval: DEFAULT_ADVERTISING_INTERVAL,
            timing: Timing::default(),
        })
    }

    /// Sets the topic segment naming the sensor.
    pub fn set_sensor_name(&mut self, name: &str) -> Result<(), ConfigError> {
        if !is_topic_segment(name) {
            return Err(ConfigError::SensorNameInvalid);
        }
        self.sensor_name = String::try_from(name).map_err(|_| ConfigError::SensorNameTooLong)?;
        Ok(())
    }

    pub fn set_advertised_name(&mut self, name: &str) -> Result<(), ConfigError> {
        self.advertised_name =
            String::try_from(name).map_err(|_| ConfigError::AdvertisedNameTooLong)?;
        Ok(())
    }
}

/// Non-empty, without separators or MQTT wildcards.
fn is_topic_segment(name: &str) -> bool {
    !name.is_empty() && !name.contains(&['/', '+', '#'][..])
}

/// Lowercase hex rendering of a chip unique id, used as the default device id.
pub fn hex_device_id(unique_id: &[u8]) -> Result<String<DEVICE_ID_LEN>, ConfigError> {
    let mut id = String::new();
    for byte in unique_id {
        write!(id, "{:02x}", byte).map_err(|_| ConfigError::DeviceIdTooLong)?;
    }
    Ok(id)
}
