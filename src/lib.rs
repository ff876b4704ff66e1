//! A platform-agnostic driver for DS3231 real-time clock modules with an
//! AT24C32-class EEPROM, built on [`embedded-hal`] 1.0.
//!
//! [`Ds3231`] owns the I2C bus and a delay provider and lends short-lived
//! handles for each part of the module:
//!
//! - [`Clock`]: calendar time and the oscillator-stop flag
//! - [`Alarms`]: the two alarm channels and their flags
//! - [`Outputs`]: the INT/SQW and 32kHz pins
//! - [`Thermometer`]: the die temperature
//! - [`Eeprom`]: the on-board EEPROM
//!
//! Every handle borrows the bus mutably, so only one can exist at a time and
//! each operation runs to completion before the next starts. To share the
//! bus with other devices, pass in a shared bus implementation such as the
//! ones from `embedded-hal-bus`.
//!
//! # Example
//!
//! ```ignore
//! use ds3231_at24::{CalendarTime, Ds3231};
//!
//! let mut rtc = Ds3231::new(i2c, delay);
//! rtc.clock().write(&CalendarTime::new(2024, 3, 14, 5, 15, 30, 7)?)?;
//! let reading = rtc.clock().read()?;
//! if reading.oscillator_stopped {
//!     // time may be invalid
//! }
//! rtc.eeprom().write(0, b"Hello")?;
//! ```
//!
//! # Features
//!
//! - `log`: log register traffic with the `log` crate
//! - `defmt`: log with `defmt` and derive `defmt::Format` for public types
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
#![no_std]

mod fmt;

pub mod alarm;
pub mod bcd;
pub mod calendar;
pub mod eeprom;
pub mod error;
pub mod output;
pub mod registers;
pub mod temperature;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

pub use alarm::{Alarm1, Alarm1Mode, Alarm2, Alarm2Mode, AlarmChannel, AlarmDay, Alarms};
pub use calendar::{CalendarTime, Clock, ClockReading};
pub use eeprom::{AddressWidth, Eeprom, WriteCycle};
pub use error::{CodecError, Error, Field};
pub use output::{Outputs, SquareWave};
pub use temperature::{Temperature, Thermometer};

/// Default I2C address of the DS3231.
pub const DEFAULT_RTC_ADDRESS: u8 = 0x68;
/// Default I2C address of the EEPROM on common DS3231 modules (A0-A2 high).
pub const DEFAULT_EEPROM_ADDRESS: u8 = 0x57;

/// Bus addresses and EEPROM addressing mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// DS3231 address
    pub rtc_address: u8,
    /// EEPROM address
    pub eeprom_address: u8,
    /// Pointer width used for EEPROM reads
    pub eeprom_address_width: AddressWidth,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rtc_address: DEFAULT_RTC_ADDRESS,
            eeprom_address: DEFAULT_EEPROM_ADDRESS,
            eeprom_address_width: AddressWidth::TwoBytes,
        }
    }
}

impl Config {
    /// Sets the DS3231 address.
    #[must_use]
    pub fn with_rtc_address(mut self, address: u8) -> Self {
        self.rtc_address = address;
        self
    }

    /// Sets the EEPROM address.
    #[must_use]
    pub fn with_eeprom_address(mut self, address: u8) -> Self {
        self.eeprom_address = address;
        self
    }

    /// Sets the pointer width used for EEPROM reads.
    #[must_use]
    pub fn with_eeprom_address_width(mut self, width: AddressWidth) -> Self {
        self.eeprom_address_width = width;
        self
    }
}

/// DS3231 module: the RTC and its EEPROM on one bus.
pub struct Ds3231<I2C, D> {
    i2c: I2C,
    delay: D,
    config: Config,
}

impl<I2C: I2c, D: DelayNs> Ds3231<I2C, D> {
    /// Creates a driver using the default addresses.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_config(i2c, delay, Config::default())
    }

    /// Creates a driver with explicit addresses.
    pub fn with_config(i2c: I2C, delay: D, config: Config) -> Self {
        debug!(
            "DS3231: rtc at {:?}, eeprom at {:?}",
            config.rtc_address, config.eeprom_address
        );
        Self { i2c, delay, config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Timekeeping registers and the oscillator-stop flag.
    pub fn clock(&mut self) -> Clock<'_, I2C> {
        Clock::new(&mut self.i2c, self.config.rtc_address)
    }

    /// Both alarm channels and their flags.
    pub fn alarms(&mut self) -> Alarms<'_, I2C> {
        Alarms::new(&mut self.i2c, self.config.rtc_address)
    }

    /// INT/SQW and 32kHz output pins.
    pub fn outputs(&mut self) -> Outputs<'_, I2C> {
        Outputs::new(&mut self.i2c, self.config.rtc_address)
    }

    /// Die temperature registers.
    pub fn thermometer(&mut self) -> Thermometer<'_, I2C> {
        Thermometer::new(&mut self.i2c, self.config.rtc_address)
    }

    /// The on-board EEPROM, using the configured address and pointer width.
    pub fn eeprom(&mut self) -> Eeprom<'_, I2C, D> {
        Eeprom::new(
            &mut self.i2c,
            &mut self.delay,
            self.config.eeprom_address,
            self.config.eeprom_address_width,
        )
    }

    /// Raw register access, for registers without a dedicated handle such as
    /// the aging offset.
    pub fn registers(&mut self) -> registers::Registers<'_, I2C> {
        registers::Registers::new(&mut self.i2c, self.config.rtc_address)
    }

    /// Releases the bus and the delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}
