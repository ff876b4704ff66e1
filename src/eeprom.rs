//! AT24C32-class EEPROM on DS3231 modules.
//!
//! The EEPROM sits on the same bus as the RTC at its own address. Its memory
//! is addressed with a 16-bit big-endian pointer and organised in 32-byte
//! pages. A write that runs past the end of a page wraps to the start of the
//! same page on the device, so such writes are rejected here; use
//! [`page_chunks`] to split larger buffers.
//!
//! After every write the device ignores the bus for its internal write
//! cycle. [`Eeprom::write`] waits for it before returning;
//! [`Eeprom::begin_write`] instead hands out a [`WriteCycle`] guard that
//! borrows the handle until the cycle is over.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::{CodecError, Error, Field};

/// Addressable bytes exposed by this driver.
pub const EEPROM_CAPACITY: usize = 1024;
/// Page size in bytes.
pub const EEPROM_PAGE_SIZE: usize = 32;
/// Internal write cycle time in milliseconds.
pub const EEPROM_WRITE_CYCLE_MS: u32 = 10;

/// Width of the memory pointer sent before a read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressWidth {
    /// Only the low-order address byte is sent. Matches parts (and older
    /// drivers) that use a single-byte pointer for reads.
    OneByte,
    /// Big-endian two-byte pointer.
    #[default]
    TwoBytes,
}

fn check_bounds(address: u16, length: usize) -> Result<(), CodecError> {
    if length == 0 || length > EEPROM_PAGE_SIZE {
        return Err(CodecError::OutOfRange(Field::EepromLength));
    }
    if usize::from(address) >= EEPROM_CAPACITY {
        return Err(CodecError::OutOfRange(Field::EepromAddress));
    }
    if usize::from(address) + length > EEPROM_CAPACITY {
        return Err(CodecError::OutOfRange(Field::EepromLength));
    }
    Ok(())
}

fn check_page(address: u16, length: usize) -> Result<(), CodecError> {
    if usize::from(address) % EEPROM_PAGE_SIZE + length > EEPROM_PAGE_SIZE {
        return Err(CodecError::CrossesPage { address, length });
    }
    Ok(())
}

/// EEPROM handle borrowing the bus and a delay provider.
pub struct Eeprom<'a, I2C, D> {
    i2c: &'a mut I2C,
    delay: &'a mut D,
    address: u8,
    width: AddressWidth,
}

impl<'a, I2C: I2c, D: DelayNs> Eeprom<'a, I2C, D> {
    /// Creates a handle for the EEPROM at `address`.
    pub fn new(i2c: &'a mut I2C, delay: &'a mut D, address: u8, width: AddressWidth) -> Self {
        Self {
            i2c,
            delay,
            address,
            width,
        }
    }

    /// Reads `buf.len()` bytes starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::OutOfRange` (before any bus traffic) if the
    /// length is not 1-32 or the span leaves the memory, or `Error::I2c` on
    /// bus failure.
    pub fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        check_bounds(address, buf.len())?;
        let pointer = address.to_be_bytes();
        let pointer: &[u8] = match self.width {
            AddressWidth::OneByte => &pointer[1..],
            AddressWidth::TwoBytes => &pointer,
        };
        self.i2c
            .write_read(self.address, pointer, buf)
            .map_err(Error::I2c)?;
        trace!("EEPROM: read {} = {:?}", address, buf);
        Ok(())
    }

    /// Writes `data` starting at `address` and waits for the write cycle.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::OutOfRange` or `CodecError::CrossesPage` (before
    /// any bus traffic) for an invalid span, or `Error::I2c` on bus failure.
    pub fn write(&mut self, address: u16, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        self.send(address, data)?;
        self.delay.delay_ms(EEPROM_WRITE_CYCLE_MS);
        Ok(())
    }

    /// Writes `data` starting at `address` and returns a guard for the
    /// device's write cycle. The wait happens when the guard is finished or
    /// dropped; until then the guard holds the handle and its bus borrow.
    ///
    /// # Errors
    ///
    /// As for [`Eeprom::write`]. No guard is returned and no wait is needed
    /// if the write was not sent.
    pub fn begin_write(
        &mut self,
        address: u16,
        data: &[u8],
    ) -> Result<WriteCycle<'_, 'a, I2C, D>, Error<I2C::Error>> {
        self.send(address, data)?;
        Ok(WriteCycle { eeprom: self })
    }

    fn send(&mut self, address: u16, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        check_bounds(address, data.len())?;
        check_page(address, data.len())?;

        let mut payload = [0u8; EEPROM_PAGE_SIZE + 2];
        payload[..2].copy_from_slice(&address.to_be_bytes());
        payload[2..2 + data.len()].copy_from_slice(data);
        trace!("EEPROM: write {} = {:?}", address, data);
        self.i2c
            .write(self.address, &payload[..2 + data.len()])
            .map_err(Error::I2c)
    }
}

/// An EEPROM write cycle in progress.
///
/// Dropping the guard blocks for the cycle time, after which the handle can
/// be used again.
pub struct WriteCycle<'e, 'a, I2C: I2c, D: DelayNs> {
    eeprom: &'e mut Eeprom<'a, I2C, D>,
}

impl<I2C: I2c, D: DelayNs> WriteCycle<'_, '_, I2C, D> {
    /// Waits for the write cycle to end.
    pub fn finish(self) {}
}

impl<I2C: I2c, D: DelayNs> Drop for WriteCycle<'_, '_, I2C, D> {
    fn drop(&mut self) {
        self.eeprom.delay.delay_ms(EEPROM_WRITE_CYCLE_MS);
    }
}

/// Splits a write into page-aligned pieces.
///
/// Each item is the start address and the bytes to write there; no piece
/// crosses a page boundary. Bounds are not checked here.
pub fn page_chunks(address: u16, data: &[u8]) -> PageChunks<'_> {
    PageChunks { address, data }
}

/// Iterator returned by [`page_chunks`].
#[derive(Clone, Debug)]
pub struct PageChunks<'d> {
    address: u16,
    data: &'d [u8],
}

impl<'d> Iterator for PageChunks<'d> {
    type Item = (u16, &'d [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let room = EEPROM_PAGE_SIZE - usize::from(self.address) % EEPROM_PAGE_SIZE;
        let (chunk, rest) = self.data.split_at(room.min(self.data.len()));
        let start = self.address;
        // room is at most 32, so this cannot overflow a valid address
        self.address = self.address.wrapping_add(chunk.len() as u16);
        self.data = rest;
        Some((start, chunk))
    }
}
