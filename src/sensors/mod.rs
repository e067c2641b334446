//! Measurement types and driver configuration for the MMC5983MA
//!
//! - Magnetometer (3-axis, 16/18-bit output)
//! - Temperature sensor
//!
//! All sensor operations are performed through methods on `Mmc5983maDriver`.

pub mod magnetometer;
pub mod temperature;

// Re-export main types
pub use magnetometer::{
    Bandwidth, PhysicalSample, RawSample, Resolution, MIN_STATUS_READ_NS,
};
pub use temperature::TemperatureSample;

/// Default bound on status polls per measurement
///
/// The loop does not sleep between polls, so the bound is sized for the
/// fastest bus: twice the 8 ms measurement time of the slowest bandwidth
/// with every status read taking [`MIN_STATUS_READ_NS`] (10 MHz SPI).
/// Slower buses only make the wait longer.
pub const DEFAULT_MAX_POLLS: u32 = 2 * Bandwidth::Hz100.polls_to_cover();

/// Driver configuration
///
/// Pure host-side state: changing it never touches the bus and only affects
/// reads started afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverConfig {
    /// Output resolution used to decode field bursts
    pub resolution: Resolution,
    /// Whether temperature reads are allowed
    pub temperature_enabled: bool,
    /// Maximum number of status reads while waiting for a measurement
    pub max_polls: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Bits18,
            temperature_enabled: true,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }
}

/// One field reading plus an optional temperature reading
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Magnetic field in µT
    pub field: PhysicalSample,
    /// Temperature, present when enabled in [`DriverConfig`]
    pub temperature: Option<TemperatureSample>,
}
