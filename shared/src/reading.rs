use core::fmt;

use embassy_time::Instant;

/// One fully decoded SEN66 measurement.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// Mass Concentration PM1.0 [μg/m³]
    pub pm1_0: f32,
    /// Mass Concentration PM2.5 [μg/m³]
    pub pm2_5: f32,
    /// Mass Concentration PM4.0 [μg/m³]
    pub pm4_0: f32,
    /// Mass Concentration PM10 [μg/m³]
    pub pm10: f32,
    /// Compensated Ambient Humidity [%RH]
    pub humidity: f32,
    /// Compensated Ambient Temperature [°C]
    pub temperature: f32,
    /// VOC Index
    pub voc_index: f32,
    /// NOx Index
    pub nox_index: f32,
    /// CO2 concentration [ppm]
    pub co2_ppm: u16,
    pub captured_at: Instant,
    /// The checksum-validated words the values above were scaled from.
    pub raw: RawReading,
}

/// A measurement in the sensor's own fixed-point units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawReading {
    /// Mass Concentration PM1.0 [μg/m³ ×10]
    pub pm1_0: u16,
    /// Mass Concentration PM2.5 [μg/m³ ×10]
    pub pm2_5: u16,
    /// Mass Concentration PM4.0 [μg/m³ ×10]
    pub pm4_0: u16,
    /// Mass Concentration PM10 [μg/m³ ×10]
    pub pm10: u16,
    /// Compensated Ambient Humidity [%RH ×100]
    pub humidity: i16,
    /// Compensated Ambient Temperature [°C ×200]
    pub temperature: i16,
    /// VOC Index [×10]
    pub voc_index: i16,
    /// NOx Index [×10]
    pub nox_index: i16,
    /// CO2 concentration [ppm]
    pub co2_ppm: u16,
}

impl RawReading {
    pub fn scale(self, captured_at: Instant) -> Reading {
        Reading {
            pm1_0: self.pm1_0 as f32 / 10.0,
            pm2_5: self.pm2_5 as f32 / 10.0,
            pm4_0: self.pm4_0 as f32 / 10.0,
            pm10: self.pm10 as f32 / 10.0,
            humidity: self.humidity as f32 / 100.0,
            temperature: self.temperature as f32 / 200.0,
            voc_index: self.voc_index as f32 / 10.0,
            nox_index: self.nox_index as f32 / 10.0,
            co2_ppm: self.co2_ppm,
            captured_at,
            raw: self,
        }
    }
}

impl Reading {
    pub fn value(&self, channel: Channel) -> ChannelValue {
        match channel {
            Channel::Co2 => ChannelValue::Integer(self.co2_ppm),
            Channel::Temperature => ChannelValue::Decimal(self.temperature),
            Channel::Humidity => ChannelValue::Decimal(self.humidity),
            Channel::Pm1_0 => ChannelValue::Decimal(self.pm1_0),
            Channel::Pm2_5 => ChannelValue::Decimal(self.pm2_5),
            Channel::Pm4_0 => ChannelValue::Decimal(self.pm4_0),
            Channel::Pm10 => ChannelValue::Decimal(self.pm10),
            Channel::Voc => ChannelValue::Decimal(self.voc_index),
            Channel::Nox => ChannelValue::Decimal(self.nox_index),
        }
    }

    /// All channels in publish order.
    pub fn channels(&self) -> impl Iterator<Item = (Channel, ChannelValue)> + '_ {
        Channel::ALL
            .iter()
            .map(move |channel| (*channel, self.value(*channel)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Co2,
    Temperature,
    Humidity,
    Pm1_0,
    Pm2_5,
    Pm4_0,
    Pm10,
    Voc,
    Nox,
}

impl Channel {
    pub const COUNT: usize = 9;

    pub const ALL: [Channel; Self::COUNT] = [
        Channel::Co2,
        Channel::Temperature,
        Channel::Humidity,
        Channel::Pm1_0,
        Channel::Pm2_5,
        Channel::Pm4_0,
        Channel::Pm10,
        Channel::Voc,
        Channel::Nox,
    ];

    /// Topic segment used when publishing the channel.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Co2 => "co2",
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::Pm1_0 => "pm1.0",
            Channel::Pm2_5 => "pm2.5",
            Channel::Pm4_0 => "pm4.0",
            Channel::Pm10 => "pm10",
            Channel::Voc => "voc",
            Channel::Nox => "nox",
        }
    }
}

/// Value of a single channel at its native scale.
///
/// Decimals always print with a fractional part, so `20.0` stays `20.0`
/// rather than collapsing into `20`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelValue {
    Integer(u16),
    Decimal(f32),
}

impl fmt::Display for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ChannelValue::Integer(value) => write!(f, "{}", value),
            ChannelValue::Decimal(value) if value.is_finite() && value % 1.0 == 0.0 => {
                write!(f, "{:.1}", value)
            }
            ChannelValue::Decimal(value) => write!(f, "{}", value),
        }
    }
}
