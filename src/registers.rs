//! Register definitions for the MMC5983MA
//!
//! The MMC5983MA exposes a flat map of 6-bit register addresses. Axis output
//! lives at 0x00-0x06, followed by temperature, status and the four internal
//! control registers. The product ID sits apart at 0x2F.
//!
//! Registers the driver inspects field-by-field are declared with the
//! `device-driver` DSL below. Raw addressing (burst reads, generic writes)
//! goes through [`Register`], and control register 0 commands are built with
//! [`ControlBits`].

device_driver::create_device!(
    device_name: Mmc5983ma,
    dsl: {
        config {
            type RegisterAddressType = u8;
            type DefaultByteOrder = BE;
        }

        /// Status - Device status (0x08)
        register Status {
            const ADDRESS = 0x08;
            const SIZE_BITS = 8;

            /// Magnetic measurement finished (cleared by a new TM_M command)
            meas_m_done: bool = 0,
            /// Temperature measurement finished (cleared by a new TM_T command)
            meas_t_done: bool = 1,
            reserved_3_2: uint = 2..4,
            /// OTP shadow registers refreshed
            otp_read_done: bool = 4,
            reserved_7_5: uint = 5..8,
        },

        /// Internal Control 1 (0x0A), write-only on the device
        register InternalControl1 {
            type Access = WO;
            const ADDRESS = 0x0A;
            const SIZE_BITS = 8;

            /// Output bandwidth select (0=100Hz, 1=200Hz, 2=400Hz, 3=800Hz)
            bw: uint = 0..2,
            /// Disable X channel
            x_inhibit: bool = 2,
            /// Disable Y and Z channels
            yz_inhibit: uint = 3..5,
            reserved_6_5: uint = 5..7,
            /// Software reset (self-clearing, 10ms power-on time)
            sw_rst: bool = 7,
        },

        /// Product ID 1 (0x2F)
        /// Expected value: 0x30
        register ProductId {
            const ADDRESS = 0x2F;
            const SIZE_BITS = 8;

            /// Product ID (should read 0x30)
            product_id: uint = 0..8,
        },
    }
);

/// Register addresses of the MMC5983MA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Xout [17:10]
    Xout0 = 0x00,
    /// Xout [9:2]
    Xout1 = 0x01,
    /// Yout [17:10]
    Yout0 = 0x02,
    /// Yout [9:2]
    Yout1 = 0x03,
    /// Zout [17:10]
    Zout0 = 0x04,
    /// Zout [9:2]
    Zout1 = 0x05,
    /// Xout[1:0], Yout[1:0], Zout[1:0] packed into bits [7:2]
    XyzOut2 = 0x06,
    /// Temperature output
    Tout = 0x07,
    /// Device status
    Status = 0x08,
    /// Internal control 0 (write-only command register)
    InternalControl0 = 0x09,
    /// Internal control 1
    InternalControl1 = 0x0A,
    /// Internal control 2
    InternalControl2 = 0x0B,
    /// Internal control 3 (reserved)
    InternalControl3 = 0x0C,
    /// Product ID 1
    ProductId = 0x2F,
}

impl Register {
    /// Register address on the bus
    #[must_use]
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// Number of bytes in one magnetic output burst (`Xout0` through `XyzOut2`)
pub const FIELD_BURST_LEN: usize = 7;

/// Measurement kind started by a trigger command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementKind {
    /// Magnetic field (TM_M)
    Field,
    /// Temperature (TM_T)
    Temperature,
}

/// Command bits of Internal Control 0 (0x09)
///
/// Every bit in this register is self-clearing on the device side, so each
/// write is a one-shot command rather than persistent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlBits(u8);

impl ControlBits {
    /// Take magnetic field measurement
    pub const TM_M: Self = Self(0b0000_0001);
    /// Take temperature measurement
    pub const TM_T: Self = Self(0b0000_0010);
    /// Interrupt on measurement done
    pub const INT_MEAS_DONE_EN: Self = Self(0b0000_0100);
    /// Set coil pulse (500ns)
    pub const SET: Self = Self(0b0000_1000);
    /// Reset coil pulse (500ns)
    pub const RESET: Self = Self(0b0001_0000);
    /// Automatic set/reset enable
    pub const AUTO_SR_EN: Self = Self(0b0010_0000);
    /// Reread OTP calibration data
    pub const OTP_READ: Self = Self(0b0100_0000);

    /// No bits set
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Wrap a raw register value (bit 7 is reserved and dropped)
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & 0x7F)
    }

    /// Raw register value
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether all bits of `other` are set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two bit sets
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Clear the bits of `other`
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Build a trigger command for `measurement`
    ///
    /// TM_M and TM_T must never be high in the same write, so both are
    /// stripped from `other` before the requested one is set.
    #[must_use]
    pub const fn trigger(measurement: MeasurementKind, other: Self) -> Self {
        let base = other.difference(Self::TM_M.union(Self::TM_T));
        match measurement {
            MeasurementKind::Field => base.union(Self::TM_M),
            MeasurementKind::Temperature => base.union(Self::TM_T),
        }
    }
}

impl core::ops::BitOr for ControlBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
