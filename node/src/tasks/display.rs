use core::fmt::{self, Write};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_time::{Duration, Timer};
use heapless::String;
use shared::Reading;

use crate::fmt::Debug2Format;
use crate::store::ReadingWatch;

/// Character cells on the display.
pub const DISPLAY_WIDTH: usize = 8;

/// Room for a full line of multi-byte glyphs.
pub type Line = String<{ DISPLAY_WIDTH * 2 }>;

/// An eight character text display.
pub trait TextDisplay {
    type Error: core::fmt::Debug;

    fn show(&mut self, text: &str) -> Result<(), Self::Error>;
}

/// One screen of the rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Co2,
    /// Temperature and humidity side by side.
    Climate,
    Pm4_0,
    Pm10,
    Voc,
    Nox,
}

impl Field {
    pub fn next(&self) -> Self {
        match self {
            Field::Co2 => Field::Climate,
            Field::Climate => Field::Pm4_0,
            Field::Pm4_0 => Field::Pm10,
            Field::Pm10 => Field::Voc,
            Field::Voc => Field::Nox,
            Field::Nox => Field::Co2,
        }
    }

    /// Formats the field for the display, truncating readings to whole units.
    pub fn render(&self, reading: &Reading) -> Result<Line, RenderError> {
        let mut line = Line::new();
        match self {
            Field::Co2 => write!(line, "CO2{:>5}", reading.co2_ppm),
            Field::Climate => climate(&mut line, reading),
            Field::Pm4_0 => write!(line, "P4 {:>5}", reading.pm4_0 as i32),
            Field::Pm10 => write!(line, "P10 {:>4}", reading.pm10 as i32),
            Field::Voc => write!(line, "UOC {:>4}", reading.voc_index as i32),
            Field::Nox => write!(line, "noH {:>4}", reading.nox_index as i32),
        }
        .map_err(|_| RenderError::TooWide)?;

        if line.chars().count() > DISPLAY_WIDTH {
            return Err(RenderError::TooWide);
        }
        Ok(line)
    }
}

/// Drops the degree glyphs when a three digit value would not fit otherwise.
fn climate(line: &mut Line, reading: &Reading) -> fmt::Result {
    let temperature = reading.temperature as i32;
    let humidity = reading.humidity as i32;

    write!(line, "{:>2}°C{:>2}°o", temperature, humidity)?;
    if line.chars().count() > DISPLAY_WIDTH {
        line.clear();
        write!(line, "{:>3}C{:>3}o", temperature, humidity)?;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RenderError {
    TooWide,
}

#[derive(Debug)]
pub enum PresentError<E> {
    Render(RenderError),
    Display(E),
}

/// Shows one field of each new reading, moving to the next field every time.
pub struct DisplayPresenter<'a, D, M: RawMutex, const N: usize> {
    display: D,
    watch: ReadingWatch<'a, M, N>,
    field: Field,
    period: Duration,
}

impl<'a, D, M, const N: usize> DisplayPresenter<'a, D, M, N>
where
    D: TextDisplay,
    M: RawMutex,
{
    pub fn new(display: D, watch: ReadingWatch<'a, M, N>, period: Duration) -> Self {
        Self {
            display,
            watch,
            field: Field::Co2,
            period,
        }
    }

    /// The field the next [`Self::present`] shows.
    pub fn field(&self) -> Field {
        self.field
    }

    /// Shows the current field and moves on, also when it could not be shown.
    pub fn present(&mut self, reading: &Reading) -> Result<(), PresentError<D::Error>> {
        let field = self.field;
        self.field = field.next();

        let line = field.render(reading).map_err(PresentError::Render)?;
        self.display.show(&line).map_err(PresentError::Display)
    }

    pub async fn run(mut self) {
        loop {
            let reading = self.watch.changed().await;

            let field = self.field;
            if let Err(e) = self.present(&reading) {
                warn!("display: skipped {:?}: {:?}", field, Debug2Format(&e));
            }

            Timer::after(self.period).await;
        }
    }
}
