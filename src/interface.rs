//! Bus interface implementations for the MMC5983MA
//!
//! The driver talks to the device through `device-driver`'s
//! [`RegisterInterface`]. This module provides three transports:
//!
//! - [`SpiInterface`] over an `embedded-hal` `SpiDevice` (chip select handled
//!   by the device implementation)
//! - [`LinkInterface`] over any [`SerialLink`], a byte-exchange primitive with
//!   explicit select/deselect, e.g. [`CsLink`] for a bare `SpiBus` plus a GPIO
//! - [`I2cInterface`] over an `embedded-hal` I2C bus
//!
//! # SPI framing
//!
//! The first byte after chip select carries the register address, with bit 7
//! set for a read and clear for a write. Every following byte is data. While
//! reading, [`READ_DUMMY_BYTE`] is clocked out.
//!
//! # Bus mode
//!
//! The datasheet specifies SPI mode 3, but boards have been observed to only
//! respond reliably in mode 0. Mode and clock (max 10 MHz) are the caller's
//! responsibility and should be validated on the target hardware.

use crate::I2C_ADDRESS;
use device_driver::RegisterInterface;

/// Address bit marking an SPI read
pub const SPI_READ_BIT: u8 = 0x80;

/// Byte clocked out during the data phase of a read
///
/// 0x1F does not map to a writable register, so a device that latches MOSI
/// during reads cannot be disturbed.
pub const READ_DUMMY_BYTE: u8 = 0x1F;

/// Raw byte-exchange channel with explicit chip select
///
/// Implementors must be reliable and ordered; the driver performs no retries.
pub trait SerialLink {
    /// Transport error
    type Error;

    /// Assert chip select
    ///
    /// # Errors
    ///
    /// Returns an error if the select line cannot be driven.
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Release chip select
    ///
    /// # Errors
    ///
    /// Returns an error if the select line cannot be driven.
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Clock out `out` and return the byte clocked in at the same time
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    fn exchange_byte(&mut self, out: u8) -> Result<u8, Self::Error>;
}

/// [`RegisterInterface`] over a [`SerialLink`]
///
/// Every register access is one select/deselect bracket. The link is always
/// deselected before returning, including when the address or data phase
/// fails; in that case the transfer error is reported, not a deselect error.
pub struct LinkInterface<L> {
    link: L,
}

impl<L: SerialLink> LinkInterface<L> {
    /// Create a new interface over the given link
    pub const fn new(link: L) -> Self {
        Self { link }
    }

    /// Consume the interface and return the link
    pub fn release(self) -> L {
        self.link
    }

    /// Run `f` with the device selected, deselecting on every exit path
    fn bracketed<T>(
        &mut self,
        f: impl FnOnce(&mut L) -> Result<T, L::Error>,
    ) -> Result<T, L::Error> {
        if let Err(e) = self.link.select() {
            let _ = self.link.deselect();
            return Err(e);
        }

        let result = f(&mut self.link);
        let deselected = self.link.deselect();

        let value = result?;
        deselected?;
        Ok(value)
    }
}

impl<L: SerialLink> RegisterInterface for LinkInterface<L> {
    type Error = L::Error;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len()
        self.bracketed(|link| {
            link.exchange_byte(SPI_READ_BIT | address)?;
            for byte in read_data.iter_mut() {
                *byte = link.exchange_byte(READ_DUMMY_BYTE)?;
            }
            Ok(())
        })
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len()
        self.bracketed(|link| {
            link.exchange_byte(address & !SPI_READ_BIT)?;
            for &byte in write_data {
                link.exchange_byte(byte)?;
            }
            Ok(())
        })
    }
}

/// Blocking link under the async API
///
/// Byte exchange on a [`SerialLink`] is synchronous, so each access completes
/// before the future resolves.
#[cfg(feature = "async")]
impl<L: SerialLink> device_driver::AsyncRegisterInterface for LinkInterface<L> {
    type Error = L::Error;
    type AddressType = u8;

    async fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        RegisterInterface::read_register(self, address, size_bits, read_data)
    }

    async fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        RegisterInterface::write_register(self, address, size_bits, write_data)
    }
}

/// Error of a [`CsLink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError<S, P> {
    /// SPI bus error
    Spi(S),
    /// Chip select pin error
    Pin(P),
}

/// [`SerialLink`] over an exclusively owned `SpiBus` and an active-low chip
/// select pin
pub struct CsLink<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> CsLink<SPI, CS> {
    /// Create a new link
    ///
    /// The bus must already be configured for the device's SPI mode and
    /// clock rate.
    pub const fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    /// Consume the link and return the bus and chip select pin
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> SerialLink for CsLink<SPI, CS>
where
    SPI: embedded_hal::spi::SpiBus,
    CS: embedded_hal::digital::OutputPin,
{
    type Error = LinkError<SPI::Error, CS::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(LinkError::Pin)
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        // Drain the bus before releasing CS so the last byte is not cut off
        let flushed = self.spi.flush().map_err(LinkError::Spi);
        self.cs.set_high().map_err(LinkError::Pin)?;
        flushed
    }

    fn exchange_byte(&mut self, out: u8) -> Result<u8, Self::Error> {
        let mut buf = [out];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(LinkError::Spi)?;
        Ok(buf[0])
    }
}

/// SPI interface for the MMC5983MA
///
/// # Note on Chip Select
///
/// This interface uses the `SpiDevice` trait from `embedded-hal`, which
/// asserts CS for the duration of each transaction and releases it
/// afterwards, including on error.
///
/// If using `embedded-hal-bus`, you would typically create an `SpiDevice` like:
/// ```ignore
/// let spi_device = embedded_hal_bus::spi::ExclusiveDevice::new(spi_bus, cs_pin, delay);
/// let interface = SpiInterface::new(spi_device);
/// ```
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI> {
    /// Create a new SPI interface with the given SPI device
    pub const fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Consume the interface and return the SPI device
    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI, E> RegisterInterface for SpiInterface<SPI>
where
    SPI: embedded_hal::spi::SpiDevice<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for SPI
        read_data.fill(READ_DUMMY_BYTE);

        let read_address = [SPI_READ_BIT | address];
        let mut operations = [
            embedded_hal::spi::Operation::Write(&read_address),
            embedded_hal::spi::Operation::TransferInPlace(read_data),
        ];

        self.spi.transaction(&mut operations)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for SPI
        let write_address = [address & !SPI_READ_BIT];
        let mut operations = [
            embedded_hal::spi::Operation::Write(&write_address),
            embedded_hal::spi::Operation::Write(write_data),
        ];

        self.spi.transaction(&mut operations)
    }
}

#[cfg(feature = "async")]
impl<SPI, E> device_driver::AsyncRegisterInterface for SpiInterface<SPI>
where
    SPI: embedded_hal_async::spi::SpiDevice<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    async fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for SPI
        read_data.fill(READ_DUMMY_BYTE);

        let read_address = [SPI_READ_BIT | address];
        let mut operations = [
            embedded_hal_async::spi::Operation::Write(&read_address),
            embedded_hal_async::spi::Operation::TransferInPlace(read_data),
        ];

        self.spi.transaction(&mut operations).await
    }

    async fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for SPI
        let write_address = [address & !SPI_READ_BIT];
        let mut operations = [
            embedded_hal_async::spi::Operation::Write(&write_address),
            embedded_hal_async::spi::Operation::Write(write_data),
        ];

        self.spi.transaction(&mut operations).await
    }
}

/// I2C interface for the MMC5983MA
///
/// The device has a single fixed 7-bit address, [`I2C_ADDRESS`] (0x30).
pub struct I2cInterface<I2C> {
    i2c: I2C,
}

impl<I2C> I2cInterface<I2C> {
    /// Create a new I2C interface at the device's fixed address
    pub const fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Consume the interface and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> RegisterInterface for I2cInterface<I2C>
where
    I2C: embedded_hal::i2c::I2c<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for I2C
        self.i2c.write_read(I2C_ADDRESS, &[address], read_data)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for I2C
        // Adjacent writes are sent back to back without a repeated start
        let register = [address];
        let mut operations = [
            embedded_hal::i2c::Operation::Write(&register),
            embedded_hal::i2c::Operation::Write(write_data),
        ];

        self.i2c.transaction(I2C_ADDRESS, &mut operations)
    }
}

#[cfg(feature = "async")]
impl<I2C, E> device_driver::AsyncRegisterInterface for I2cInterface<I2C>
where
    I2C: embedded_hal_async::i2c::I2c<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    async fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for I2C
        self.i2c
            .write_read(I2C_ADDRESS, &[address], read_data)
            .await
    }

    async fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for I2C
        let register = [address];
        let mut operations = [
            embedded_hal_async::i2c::Operation::Write(&register),
            embedded_hal_async::i2c::Operation::Write(write_data),
        ];

        self.i2c.transaction(I2C_ADDRESS, &mut operations).await
    }
}
