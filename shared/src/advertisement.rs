use heapless::Vec;

use crate::Reading;

/// Company identifier reserved for "no manufacturer".
pub const NO_MANUFACTURER: [u8; 2] = [0xff, 0xff];
pub const PAYLOAD_VERSION: u8 = 0;
/// Manufacturer specific payload: marker, version and nine 16-bit fields.
pub const PAYLOAD_LEN: usize = 21;
/// Legacy advertisement and scan response frames are capped at 31 bytes.
pub const MAX_ADV_DATA_LEN: usize = 31;

/// LE General Discoverable, BR/EDR not supported.
const DISCOVERABLE_FLAGS: u8 = 0x06;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdType {
    Flags = 0x01,
    CompleteLocalName = 0x09,
    Appearance = 0x19,
    ManufacturerSpecific = 0xff,
}

/// Fixed-point snapshot broadcast in the manufacturer specific data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Advertisement {
    /// Temperature [°C ×100]
    pub temperature: i16,
    /// Humidity [%RH ×100]
    pub humidity: i16,
    /// Mass Concentration PM1.0 [μg/m³ ×10]
    pub pm1_0: i16,
    /// Mass Concentration PM2.5 [μg/m³ ×10]
    pub pm2_5: i16,
    /// Mass Concentration PM4.0 [μg/m³ ×10]
    pub pm4_0: i16,
    /// Mass Concentration PM10 [μg/m³ ×10]
    pub pm10: i16,
    /// CO2 [ppm]
    pub co2: u16,
    /// VOC Index [×10]
    pub voc: i16,
    /// NOx Index [×10]
    pub nox: i16,
}

/// Built from the raw words, so no precision is lost to the float scaling.
impl From<&Reading> for Advertisement {
    fn from(reading: &Reading) -> Self {
        let raw = &reading.raw;
        let pm = |value: u16| i16::try_from(value).unwrap_or(i16::MAX);

        Self {
            // ×200 on the wire, ×100 in the payload
            temperature: raw.temperature / 2,
            humidity: raw.humidity,
            pm1_0: pm(raw.pm1_0),
            pm2_5: pm(raw.pm2_5),
            pm4_0: pm(raw.pm4_0),
            pm10: pm(raw.pm10),
            co2: raw.co2_ppm,
            voc: raw.voc_index,
            nox: raw.nox_index,
        }
    }
}

impl Advertisement {
    pub fn to_bytes(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[0..2].copy_from_slice(&NO_MANUFACTURER);
        payload[2] = PAYLOAD_VERSION;

        let fields = [
            self.temperature.to_le_bytes(),
            self.humidity.to_le_bytes(),
            self.pm1_0.to_le_bytes(),
            self.pm2_5.to_le_bytes(),
            self.pm4_0.to_le_bytes(),
            self.pm10.to_le_bytes(),
            self.co2.to_le_bytes(),
            self.voc.to_le_bytes(),
            self.nox.to_le_bytes(),
        ];
        for (chunk, field) in payload[3..].chunks_exact_mut(2).zip(fields) {
            chunk.copy_from_slice(&field);
        }

        payload
    }

    /// Decodes a manufacturer specific payload, as found by a scanner.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() != PAYLOAD_LEN
            || payload[0..2] != NO_MANUFACTURER
            || payload[2] != PAYLOAD_VERSION
        {
            return None;
        }

        let word = |index: usize| {
            let offset = 3 + index * 2;
            [payload[offset], payload[offset + 1]]
        };

        Some(Self {
            temperature: i16::from_le_bytes(word(0)),
            humidity: i16::from_le_bytes(word(1)),
            pm1_0: i16::from_le_bytes(word(2)),
            pm2_5: i16::from_le_bytes(word(3)),
            pm4_0: i16::from_le_bytes(word(4)),
            pm10: i16::from_le_bytes(word(5)),
            co2: u16::from_le_bytes(word(6)),
            voc: i16::from_le_bytes(word(7)),
            nox: i16::from_le_bytes(word(8)),
        })
    }
}

/// Writes one AD structure (length, type, data) into `buffer`.
///
/// Returns the number of bytes written, or `None` if it does not fit.
pub fn fill_adv_data(buffer: &mut [u8], ad_type: AdType, data: &[u8]) -> Option<usize> {
    let len = data.len() + 2;
    if len > buffer.len() || data.len() + 1 > u8::MAX as usize {
        return None;
    }

    buffer[0] = (data.len() + 1) as u8;
    buffer[1] = ad_type as u8;
    buffer[2..len].copy_from_slice(data);
    Some(len)
}

/// Advertisement frame: discoverable flags followed by the measurement payload.
pub fn advertising_data(advertisement: &Advertisement) -> Vec<u8, MAX_ADV_DATA_LEN> {
    let mut buffer = [0u8; MAX_ADV_DATA_LEN];
    let mut offset = 0;

    // 3 + 2 + PAYLOAD_LEN always fits into a legacy frame
    offset += fill_adv_data(&mut buffer, AdType::Flags, &[DISCOVERABLE_FLAGS]).unwrap_or(0);
    offset += fill_adv_data(
        &mut buffer[offset..],
        AdType::ManufacturerSpecific,
        &advertisement.to_bytes(),
    )
    .unwrap_or(0);

    Vec::from_slice(&buffer[..offset]).unwrap_or_default()
}

/// Scan response frame carrying the appearance and the complete local name.
pub fn scan_response(name: &str, appearance: u16) -> Option<Vec<u8, MAX_ADV_DATA_LEN>> {
    let mut buffer = [0u8; MAX_ADV_DATA_LEN];
    let mut offset = fill_adv_data(&mut buffer, AdType::Appearance, &appearance.to_le_bytes())?;
    offset += fill_adv_data(
        &mut buffer[offset..],
        AdType::CompleteLocalName,
        name.as_bytes(),
    )?;

    Vec::from_slice(&buffer[..offset]).ok()
}
