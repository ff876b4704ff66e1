//! Die temperature of the DS3231.
//!
//! The TCXO measures the die temperature every 64 seconds and stores it as a
//! 10-bit two's-complement value in registers 0x11 (integer part) and 0x12
//! (fraction in the top two bits), 0.25 degC resolution.

use embedded_hal::i2c::I2c;

use crate::error::Error;
use crate::registers::{RegAddr, Registers};

/// Raw temperature reading in 1/256 degC.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(i16);

impl Temperature {
    /// Builds a reading from the MSB and LSB temperature registers.
    #[must_use]
    pub fn from_registers(raw: [u8; 2]) -> Self {
        Temperature(i16::from_be_bytes(raw))
    }

    /// Raw value in 1/256 degC.
    #[must_use]
    pub fn raw(self) -> i16 {
        self.0
    }

    /// Temperature in degrees Celsius.
    #[must_use]
    pub fn celsius(self) -> f32 {
        f32::from(self.0) / 256.0
    }
}

/// Temperature registers of a DS3231.
pub struct Thermometer<'a, I2C> {
    regs: Registers<'a, I2C>,
}

impl<'a, I2C: I2c> Thermometer<'a, I2C> {
    /// Creates a thermometer handle for the DS3231 at `address`.
    pub fn new(i2c: &'a mut I2C, address: u8) -> Self {
        Self {
            regs: Registers::new(i2c, address),
        }
    }

    /// Reads both temperature registers in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn read_raw(&mut self) -> Result<Temperature, Error<I2C::Error>> {
        let mut raw = [0u8; 2];
        self.regs.read_block(RegAddr::MSBTemp, &mut raw)?;
        let temperature = Temperature::from_registers(raw);
        debug!("DS3231: temperature {:?}", temperature.raw());
        Ok(temperature)
    }

    /// Reads the temperature in degrees Celsius.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn read(&mut self) -> Result<f32, Error<I2C::Error>> {
        Ok(self.read_raw()?.celsius())
    }
}
