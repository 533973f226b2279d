#![cfg_attr(not(test), no_std)]

mod advertisement;
mod reading;

pub use advertisement::{
    advertising_data, fill_adv_data, scan_response, AdType, Advertisement, MAX_ADV_DATA_LEN,
    NO_MANUFACTURER, PAYLOAD_LEN, PAYLOAD_VERSION,
};
pub use reading::{Channel, ChannelValue, RawReading, Reading};
