//! Temperature sensor types
//!
//! `Tout` (0x07) is an unsigned 8-bit code covering -75 °C to 125 °C at
//! roughly 0.8 °C per LSB, with code 0 at -75 °C.

/// Temperature in °C per LSB
pub const TEMP_CELSIUS_PER_LSB: f32 = 0.8;

/// Temperature at code 0 in °C
pub const TEMP_OFFSET_CELSIUS: f32 = -75.0;

/// Single temperature reading
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureSample {
    /// Raw `Tout` code
    pub raw: u8,
    /// Temperature in °C
    pub celsius: f32,
}

impl TemperatureSample {
    /// Convert a raw `Tout` code
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        // Unsigned per the datasheet; a signed reading would put 128..=255 below -75 °C
        Self {
            raw,
            celsius: f32::from(raw) * TEMP_CELSIUS_PER_LSB + TEMP_OFFSET_CELSIUS,
        }
    }
}
