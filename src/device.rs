//! High-level driver API for the MMC5983MA
//!
//! Every measurement is one strictly ordered cycle:
//!
//! 1. read status (advisory only, a stale done flag is expected)
//! 2. write the trigger bit to Internal Control 0
//! 3. poll status until the matching done flag is set, bounded by
//!    [`DriverConfig::max_polls`]
//! 4. burst-read the output registers in a single transaction
//!
//! The device clears the trigger bit and the done flag itself. The driver
//! never writes the trigger back to zero.
//!
//! Cycles cannot overlap: every method takes `&mut self`, so a second read on
//! the same handle can only start after the first has returned.

use crate::registers::{
    ControlBits, MeasurementKind, Mmc5983ma as RegisterDevice, Register, FIELD_BURST_LEN,
};
use crate::sensors::{
    Bandwidth, DriverConfig, Measurement, PhysicalSample, RawSample, Resolution,
    TemperatureSample,
};
use crate::{Error, PRODUCT_ID_VALUE};

// Only import RegisterInterface when not using async feature
#[cfg(not(feature = "async"))]
use device_driver::RegisterInterface;

#[cfg(feature = "async")]
use device_driver::AsyncRegisterInterface;

/// Power-on time after a software reset
const SOFT_RESET_WAIT_MS: u32 = 10;

/// Decoded Status register (0x08)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceStatus {
    /// Magnetic measurement done
    pub field_done: bool,
    /// Temperature measurement done
    pub temperature_done: bool,
    /// OTP shadow registers refreshed
    pub otp_read_done: bool,
}

impl DeviceStatus {
    /// Done flag for the given measurement kind
    #[must_use]
    pub const fn is_done(&self, kind: MeasurementKind) -> bool {
        match kind {
            MeasurementKind::Field => self.field_done,
            MeasurementKind::Temperature => self.temperature_done,
        }
    }
}

/// Main driver for the MMC5983MA
pub struct Mmc5983maDriver<I> {
    device: RegisterDevice<I>,
    config: DriverConfig,
    /// Host-side copy of BW[1:0], Internal Control 1 is write-only
    bandwidth: Bandwidth,
    last_raw: Option<RawSample>,
    last_field: Option<PhysicalSample>,
    last_temperature: Option<TemperatureSample>,
}

impl<I> Mmc5983maDriver<I> {
    /// Create a new driver with the default configuration
    ///
    /// No bus traffic happens here. Call `init()` to verify the device.
    pub fn new(interface: I) -> Self {
        Self::with_config(interface, DriverConfig::default())
    }

    /// Create a new driver with the given configuration
    pub fn with_config(interface: I, config: DriverConfig) -> Self {
        Self {
            device: RegisterDevice::new(interface),
            config,
            bandwidth: Bandwidth::default(),
            last_raw: None,
            last_field: None,
            last_temperature: None,
        }
    }

    /// Select the output resolution for subsequent field reads
    ///
    /// No bus traffic. Idempotent.
    pub fn set_output_resolution(&mut self, resolution: Resolution) {
        self.config.resolution = resolution;
    }

    /// Currently selected output resolution
    #[must_use]
    pub const fn output_resolution(&self) -> Resolution {
        self.config.resolution
    }

    /// Enable or disable temperature reads
    pub fn enable_temperature(&mut self, enable: bool) {
        self.config.temperature_enabled = enable;
    }

    /// Set the maximum number of status polls per measurement
    ///
    /// Zero is treated as one, the bound is always finite.
    pub fn set_max_polls(&mut self, max_polls: u32) {
        self.config.max_polls = max_polls;
    }

    /// Current driver configuration
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Replace the driver configuration
    pub fn set_config(&mut self, config: DriverConfig) {
        self.config = config;
    }

    /// Output bandwidth last written by `set_bandwidth()`
    ///
    /// Internal Control 1 cannot be read back, so this is the driver's copy.
    /// It is [`Bandwidth::Hz100`] after construction and after `soft_reset()`.
    /// No bus traffic.
    #[must_use]
    pub const fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    /// Most recent raw field sample
    #[must_use]
    pub const fn last_raw(&self) -> Option<&RawSample> {
        self.last_raw.as_ref()
    }

    /// Most recent field sample in µT
    #[must_use]
    pub const fn last_field(&self) -> Option<&PhysicalSample> {
        self.last_field.as_ref()
    }

    /// Most recent temperature sample
    #[must_use]
    pub const fn last_temperature(&self) -> Option<&TemperatureSample> {
        self.last_temperature.as_ref()
    }

    /// Consume the driver and return the underlying interface
    pub fn release(self) -> I {
        self.device.interface
    }

    /// Get a reference to the underlying register device (for advanced usage)
    pub const fn device(&self) -> &RegisterDevice<I> {
        &self.device
    }

    const fn poll_bound(&self) -> u32 {
        if self.config.max_polls == 0 {
            1
        } else {
            self.config.max_polls
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn size_bits(len: usize) -> u32 {
    (len * 8) as u32
}

#[cfg(not(feature = "async"))]
impl<I> Mmc5983maDriver<I>
where
    I: RegisterInterface<AddressType = u8>,
{
    /// Verify the device identity
    ///
    /// Reads `Product ID 1` and compares it against [`PRODUCT_ID_VALUE`]. The
    /// bus must already be configured. No retries.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The product ID does not match (`Error::IdentityMismatch`)
    pub fn init(&mut self) -> Result<(), Error<I::Error>> {
        let actual = self.read_product_id()?;

        #[cfg(feature = "defmt")]
        defmt::debug!("MMC5983MA product ID: 0x{:02X}", actual);

        if actual != PRODUCT_ID_VALUE {
            return Err(Error::IdentityMismatch {
                expected: PRODUCT_ID_VALUE,
                actual,
            });
        }

        Ok(())
    }

    /// Read the `Product ID 1` register
    ///
    /// Should return 0x30 for a valid MMC5983MA
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_product_id(&mut self) -> Result<u8, Error<I::Error>> {
        let reg = self.device.product_id().read()?;
        Ok(reg.product_id())
    }

    /// Read the Status register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_status(&mut self) -> Result<DeviceStatus, Error<I::Error>> {
        let reg = self.device.status().read()?;
        Ok(DeviceStatus {
            field_done: reg.meas_m_done(),
            temperature_done: reg.meas_t_done(),
            otp_read_done: reg.otp_read_done(),
        })
    }

    /// Read consecutive registers in one bus transaction
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_registers(
        &mut self,
        start: Register,
        buffer: &mut [u8],
    ) -> Result<(), Error<I::Error>> {
        self.device
            .interface
            .read_register(start.addr(), size_bits(buffer.len()), buffer)?;
        Ok(())
    }

    /// Write consecutive registers in one bus transaction
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn write_registers(&mut self, start: Register, data: &[u8]) -> Result<(), Error<I::Error>> {
        self.device
            .interface
            .write_register(start.addr(), size_bits(data.len()), data)?;
        Ok(())
    }

    /// Write a command to Internal Control 0
    fn write_control(&mut self, bits: ControlBits) -> Result<(), Error<I::Error>> {
        self.write_registers(Register::InternalControl0, &[bits.bits()])
    }

    /// Poll status until `done` holds, returning the number of reads taken
    fn wait_for(
        &mut self,
        done: impl Fn(&DeviceStatus) -> bool,
    ) -> Result<u32, Error<I::Error>> {
        for attempt in 1..=self.poll_bound() {
            let status = self.read_status()?;
            if done(&status) {
                return Ok(attempt);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("MMC5983MA: no measurement done after {} polls", self.poll_bound());

        Err(Error::Timeout)
    }

    /// Trigger a measurement and wait for it to complete
    fn measure(&mut self, kind: MeasurementKind) -> Result<(), Error<I::Error>> {
        // Advisory: the done flag stays high until the next trigger
        let status = self.read_status()?;
        if status.is_done(kind) {
            #[cfg(feature = "defmt")]
            defmt::trace!("MMC5983MA: stale done flag before {} trigger", kind);
        }

        self.write_control(ControlBits::trigger(kind, ControlBits::empty()))?;

        let _polls = self.wait_for(|s| s.is_done(kind))?;

        #[cfg(feature = "defmt")]
        defmt::trace!("MMC5983MA: {} ready after {} polls", kind, _polls);

        Ok(())
    }

    /// Run a field measurement and return the undecoded output codes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The measurement does not complete within the poll bound (`Error::Timeout`)
    pub fn read_raw_field(&mut self) -> Result<RawSample, Error<I::Error>> {
        let resolution = self.config.resolution;

        self.measure(MeasurementKind::Field)?;

        // Single burst: the device only guarantees a consistent snapshot
        // across one multi-byte read
        let mut buffer = [0u8; FIELD_BURST_LEN];
        self.read_registers(Register::Xout0, &mut buffer)?;

        let raw = RawSample::from_burst(&buffer, resolution);
        self.last_raw = Some(raw);
        Ok(raw)
    }

    /// Run a field measurement and return it in µT
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The measurement does not complete within the poll bound (`Error::Timeout`)
    pub fn read_field(&mut self) -> Result<PhysicalSample, Error<I::Error>> {
        let field = self.read_raw_field()?.to_physical();
        self.last_field = Some(field);
        Ok(field)
    }

    /// Run a temperature measurement
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Temperature is disabled in the configuration (`Error::TemperatureDisabled`)
    /// - Communication with the device fails
    /// - The measurement does not complete within the poll bound (`Error::Timeout`)
    pub fn read_temperature(&mut self) -> Result<TemperatureSample, Error<I::Error>> {
        if !self.config.temperature_enabled {
            return Err(Error::TemperatureDisabled);
        }

        self.measure(MeasurementKind::Temperature)?;

        let mut buffer = [0u8; 1];
        self.read_registers(Register::Tout, &mut buffer)?;

        let sample = TemperatureSample::from_raw(buffer[0]);
        self.last_temperature = Some(sample);
        Ok(sample)
    }

    /// Read the field, then the temperature if enabled
    ///
    /// The two measurements are separate trigger cycles.
    ///
    /// # Errors
    ///
    /// Returns an error if either measurement fails.
    pub fn read_measurement(&mut self) -> Result<Measurement, Error<I::Error>> {
        let field = self.read_field()?;
        let temperature = if self.config.temperature_enabled {
            Some(self.read_temperature()?)
        } else {
            None
        };
        Ok(Measurement { field, temperature })
    }

    /// Pulse the set coil, then the reset coil
    ///
    /// Restores the sensing element after exposure to a strong field and
    /// cancels offset drift. The host decides when to call this.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails. If the set
    /// write fails, no reset is issued.
    pub fn degauss(&mut self) -> Result<(), Error<I::Error>> {
        self.write_control(ControlBits::SET)?;
        self.write_control(ControlBits::RESET)?;

        #[cfg(feature = "defmt")]
        defmt::debug!("MMC5983MA: set/reset done");

        Ok(())
    }

    /// Reload the factory calibration from OTP
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The OTP-read-done flag is not observed within the poll bound
    pub fn reread_calibration(&mut self) -> Result<(), Error<I::Error>> {
        self.write_control(ControlBits::OTP_READ)?;
        self.wait_for(|s| s.otp_read_done)?;
        Ok(())
    }

    /// Set the output bandwidth
    ///
    /// Clears the channel-inhibit bits.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_bandwidth(&mut self, bandwidth: Bandwidth) -> Result<(), Error<I::Error>> {
        self.device.internal_control_1().write(|w| {
            w.set_bw(bandwidth as u8);
        })?;
        self.bandwidth = bandwidth;
        Ok(())
    }

    /// Software reset
    ///
    /// Resets all registers, waits the 10 ms power-on time and verifies the
    /// device identity again.
    /// The driver's bandwidth copy returns to [`Bandwidth::Hz100`] once the
    /// reset command has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The product ID does not match after reset
    pub fn soft_reset<D>(&mut self, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        self.device.internal_control_1().write(|w| {
            w.set_sw_rst(true);
        })?;
        self.bandwidth = Bandwidth::default();
        delay.delay_ms(SOFT_RESET_WAIT_MS);
        self.init()
    }
}

#[cfg(feature = "async")]
impl<I> Mmc5983maDriver<I>
where
    I: AsyncRegisterInterface<AddressType = u8>,
{
    /// Verify the device identity
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The product ID does not match (`Error::IdentityMismatch`)
    pub async fn init(&mut self) -> Result<(), Error<I::Error>> {
        let actual = self.read_product_id().await?;

        #[cfg(feature = "defmt")]
        defmt::debug!("MMC5983MA product ID: 0x{:02X}", actual);

        if actual != PRODUCT_ID_VALUE {
            return Err(Error::IdentityMismatch {
                expected: PRODUCT_ID_VALUE,
                actual,
            });
        }

        Ok(())
    }

    /// Read the `Product ID 1` register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn read_product_id(&mut self) -> Result<u8, Error<I::Error>> {
        let reg = self.device.product_id().read_async().await?;
        Ok(reg.product_id())
    }

    /// Read the Status register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn read_status(&mut self) -> Result<DeviceStatus, Error<I::Error>> {
        let reg = self.device.status().read_async().await?;
        Ok(DeviceStatus {
            field_done: reg.meas_m_done(),
            temperature_done: reg.meas_t_done(),
            otp_read_done: reg.otp_read_done(),
        })
    }

    /// Read consecutive registers in one bus transaction
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn read_registers(
        &mut self,
        start: Register,
        buffer: &mut [u8],
    ) -> Result<(), Error<I::Error>> {
        self.device
            .interface
            .read_register(start.addr(), size_bits(buffer.len()), buffer)
            .await?;
        Ok(())
    }

    /// Write consecutive registers in one bus transaction
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn write_registers(
        &mut self,
        start: Register,
        data: &[u8],
    ) -> Result<(), Error<I::Error>> {
        self.device
            .interface
            .write_register(start.addr(), size_bits(data.len()), data)
            .await?;
        Ok(())
    }

    async fn write_control(&mut self, bits: ControlBits) -> Result<(), Error<I::Error>> {
        self.write_registers(Register::InternalControl0, &[bits.bits()])
            .await
    }

    async fn wait_for(
        &mut self,
        done: impl Fn(&DeviceStatus) -> bool,
    ) -> Result<u32, Error<I::Error>> {
        for attempt in 1..=self.poll_bound() {
            let status = self.read_status().await?;
            if done(&status) {
                return Ok(attempt);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("MMC5983MA: no measurement done after {} polls", self.poll_bound());

        Err(Error::Timeout)
    }

    async fn measure(&mut self, kind: MeasurementKind) -> Result<(), Error<I::Error>> {
        let status = self.read_status().await?;
        if status.is_done(kind) {
            #[cfg(feature = "defmt")]
            defmt::trace!("MMC5983MA: stale done flag before {} trigger", kind);
        }

        self.write_control(ControlBits::trigger(kind, ControlBits::empty()))
            .await?;

        let _polls = self.wait_for(|s| s.is_done(kind)).await?;

        #[cfg(feature = "defmt")]
        defmt::trace!("MMC5983MA: {} ready after {} polls", kind, _polls);

        Ok(())
    }

    /// Run a field measurement and return the undecoded output codes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The measurement does not complete within the poll bound (`Error::Timeout`)
    pub async fn read_raw_field(&mut self) -> Result<RawSample, Error<I::Error>> {
        let resolution = self.config.resolution;

        self.measure(MeasurementKind::Field).await?;

        let mut buffer = [0u8; FIELD_BURST_LEN];
        self.read_registers(Register::Xout0, &mut buffer).await?;

        let raw = RawSample::from_burst(&buffer, resolution);
        self.last_raw = Some(raw);
        Ok(raw)
    }

    /// Run a field measurement and return it in µT
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The measurement does not complete within the poll bound (`Error::Timeout`)
    pub async fn read_field(&mut self) -> Result<PhysicalSample, Error<I::Error>> {
        let field = self.read_raw_field().await?.to_physical();
        self.last_field = Some(field);
        Ok(field)
    }

    /// Run a temperature measurement
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Temperature is disabled in the configuration (`Error::TemperatureDisabled`)
    /// - Communication with the device fails
    /// - The measurement does not complete within the poll bound (`Error::Timeout`)
    pub async fn read_temperature(&mut self) -> Result<TemperatureSample, Error<I::Error>> {
        if !self.config.temperature_enabled {
            return Err(Error::TemperatureDisabled);
        }

        self.measure(MeasurementKind::Temperature).await?;

        let mut buffer = [0u8; 1];
        self.read_registers(Register::Tout, &mut buffer).await?;

        let sample = TemperatureSample::from_raw(buffer[0]);
        self.last_temperature = Some(sample);
        Ok(sample)
    }

    /// Read the field, then the temperature if enabled
    ///
    /// # Errors
    ///
    /// Returns an error if either measurement fails.
    pub async fn read_measurement(&mut self) -> Result<Measurement, Error<I::Error>> {
        let field = self.read_field().await?;
        let temperature = if self.config.temperature_enabled {
            Some(self.read_temperature().await?)
        } else {
            None
        };
        Ok(Measurement { field, temperature })
    }

    /// Pulse the set coil, then the reset coil
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn degauss(&mut self) -> Result<(), Error<I::Error>> {
        self.write_control(ControlBits::SET).await?;
        self.write_control(ControlBits::RESET).await?;

        #[cfg(feature = "defmt")]
        defmt::debug!("MMC5983MA: set/reset done");

        Ok(())
    }

    /// Reload the factory calibration from OTP
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The OTP-read-done flag is not observed within the poll bound
    pub async fn reread_calibration(&mut self) -> Result<(), Error<I::Error>> {
        self.write_control(ControlBits::OTP_READ).await?;
        self.wait_for(|s| s.otp_read_done).await?;
        Ok(())
    }

    /// Set the output bandwidth
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub async fn set_bandwidth(&mut self, bandwidth: Bandwidth) -> Result<(), Error<I::Error>> {
        self.device
            .internal_control_1()
            .write_async(|w| {
                w.set_bw(bandwidth as u8);
            })
            .await?;
        self.bandwidth = bandwidth;
        Ok(())
    }

    /// Software reset
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Communication with the device fails
    /// - The product ID does not match after reset
    pub async fn soft_reset<D>(&mut self, delay: &mut D) -> Result<(), Error<I::Error>>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        self.device
            .internal_control_1()
            .write_async(|w| {
                w.set_sw_rst(true);
            })
            .await?;
        self.bandwidth = Bandwidth::default();
        delay.delay_ms(SOFT_RESET_WAIT_MS).await;
        self.init().await
    }
}
