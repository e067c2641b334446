#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod device;
pub mod interface;
pub mod registers;
pub mod sensors;

// Re-export main types
pub use device::{DeviceStatus, Mmc5983maDriver};
pub use interface::{CsLink, I2cInterface, LinkError, LinkInterface, SerialLink, SpiInterface};
pub use registers::{ControlBits, MeasurementKind, Register};
pub use sensors::{
    Bandwidth, DriverConfig, Measurement, PhysicalSample, RawSample, Resolution,
    TemperatureSample, DEFAULT_MAX_POLLS, MIN_STATUS_READ_NS,
};

/// MMC5983MA 7-bit I2C address (fixed, no address pins)
pub const I2C_ADDRESS: u8 = 0x30;

/// Expected value of the `Product ID 1` register
///
/// Identical to the device's I2C address.
pub const PRODUCT_ID_VALUE: u8 = 0x30;

/// Driver errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device, passed through unchanged
    Bus(E),
    /// Product ID did not match [`PRODUCT_ID_VALUE`]
    ///
    /// Wrong device, wiring fault or a dead bus. Not retried by the driver.
    IdentityMismatch {
        /// Value the device should report
        expected: u8,
        /// Value actually read
        actual: u8,
    },
    /// Measurement-done flag not observed within the configured poll bound
    ///
    /// The whole trigger/poll/read cycle may be retried from scratch.
    Timeout,
    /// Temperature read requested while disabled in [`DriverConfig`]
    TemperatureDisabled,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
