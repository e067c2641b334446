//! Magnetic field types, configuration and decode math
//!
//! The MMC5983MA reports each axis as an 18-bit offset-binary code. The top
//! 16 bits live in two output registers per axis, and the two least
//! significant bits of all three axes are packed into `XYZout2` (0x06).

use crate::registers::FIELD_BURST_LEN;

/// Output resolution used when decoding a field burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 16-bit output, 4096 counts/G
    Bits16,
    /// 18-bit output, 16384 counts/G
    #[default]
    Bits18,
}

impl Resolution {
    /// Raw code corresponding to zero field
    #[must_use]
    pub const fn null_offset(self) -> i32 {
        match self {
            Self::Bits16 => 1 << 15,
            Self::Bits18 => 1 << 17,
        }
    }

    /// Sensitivity in microtesla per LSB
    #[must_use]
    pub const fn ut_per_lsb(self) -> f32 {
        // 1 G = 100 µT
        match self {
            Self::Bits16 => 100.0 / 4096.0,
            Self::Bits18 => 100.0 / 16384.0,
        }
    }

    /// Largest raw code this resolution can produce
    #[must_use]
    pub const fn max_code(self) -> u32 {
        match self {
            Self::Bits16 => 0xFFFF,
            Self::Bits18 => 0x3_FFFF,
        }
    }
}

/// Shortest possible status read in nanoseconds
///
/// Address byte plus one data byte, 16 SPI clocks at the 10 MHz maximum.
/// Real transports add chip select and driver overhead on top.
pub const MIN_STATUS_READ_NS: u32 = 1_600;

/// Output bandwidth (Internal Control 1, BW[1:0])
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    /// 100 Hz, 8 ms measurement time
    #[default]
    Hz100 = 0,
    /// 200 Hz, 4 ms measurement time
    Hz200 = 1,
    /// 400 Hz, 2 ms measurement time
    Hz400 = 2,
    /// 800 Hz, 0.5 ms measurement time
    Hz800 = 3,
}

impl Bandwidth {
    /// Measurement duration in microseconds
    #[must_use]
    pub const fn measurement_time_us(self) -> u32 {
        match self {
            Self::Hz100 => 8000,
            Self::Hz200 => 4000,
            Self::Hz400 => 2000,
            Self::Hz800 => 500,
        }
    }

    /// Status polls needed to span one measurement when every poll takes
    /// only [`MIN_STATUS_READ_NS`]
    #[must_use]
    pub const fn polls_to_cover(self) -> u32 {
        let time_ns = self.measurement_time_us() * 1000;
        time_ns.div_ceil(MIN_STATUS_READ_NS)
    }

    /// Decode the BW field
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Hz100,
            1 => Self::Hz200,
            2 => Self::Hz400,
            _ => Self::Hz800,
        }
    }
}

/// Undecoded per-axis output codes from a single burst read
///
/// Values are the bit-exact register concatenation for the resolution they
/// were decoded with (offset binary, zero field at mid-scale).
///
/// The codes are unsigned. [`RawSample::to_physical`] subtracts the null
/// offset before scaling, so a field below mid-scale comes out negative.
/// Scaling the raw code directly (as some vendor sample code does with
/// `code * 0.0625`) never yields a negative value and is off by the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// X-axis output code
    pub x: u32,
    /// Y-axis output code
    pub y: u32,
    /// Z-axis output code
    pub z: u32,
    /// Resolution the codes were decoded with
    pub resolution: Resolution,
}

impl RawSample {
    /// Decode a 7-byte output burst starting at `Xout0`
    ///
    /// 18-bit: `(hi << 10) | (lo << 2) | residual`, with the residual pair
    /// for X, Y, Z taken from bits [7:6], [5:4], [3:2] of the last byte.
    /// 16-bit: `(hi << 8) | lo`; the residual byte is ignored.
    #[must_use]
    pub fn from_burst(data: &[u8; FIELD_BURST_LEN], resolution: Resolution) -> Self {
        let axis = |i: usize| -> u32 {
            let hi = u32::from(data[2 * i]);
            let lo = u32::from(data[2 * i + 1]);
            match resolution {
                Resolution::Bits16 => (hi << 8) | lo,
                Resolution::Bits18 => {
                    let residual = u32::from(data[6] >> (6 - 2 * i)) & 0x03;
                    (hi << 10) | (lo << 2) | residual
                }
            }
        };

        Self {
            x: axis(0),
            y: axis(1),
            z: axis(2),
            resolution,
        }
    }

    /// Signed codes relative to the zero-field offset
    #[must_use]
    pub fn centered(&self) -> [i32; 3] {
        let offset = self.resolution.null_offset();
        // Codes are at most 18 bits wide, the casts are lossless
        [
            self.x as i32 - offset,
            self.y as i32 - offset,
            self.z as i32 - offset,
        ]
    }

    /// Convert to microtesla using the resolution's fixed scale
    #[must_use]
    pub fn to_physical(&self) -> PhysicalSample {
        let scale = self.resolution.ut_per_lsb();
        let [x, y, z] = self.centered();
        #[allow(clippy::cast_precision_loss)]
        PhysicalSample {
            x: x as f32 * scale,
            y: y as f32 * scale,
            z: z as f32 * scale,
        }
    }
}

/// Magnetic field in microteslas (µT)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhysicalSample {
    /// X-axis magnetic field in µT
    pub x: f32,
    /// Y-axis magnetic field in µT
    pub y: f32,
    /// Z-axis magnetic field in µT
    pub z: f32,
}

impl PhysicalSample {
    /// Magnitude of the field vector in µT
    #[must_use]
    pub fn magnitude(&self) -> f32 {
        libm::sqrtf(self.x * self.x + self.y * self.y + self.z * self.z)
    }
}
