//! Error types for the DS3231/AT24C32 driver.
//!
//! Every operation returns [`Error`], which either carries the bus error
//! unchanged or a [`CodecError`] describing why a value could not be encoded
//! or a register could not be decoded. Input validation always happens before
//! any bus traffic, so a `CodecError::Validation` or `CodecError::OutOfRange`
//! means nothing was written.

use core::fmt;

use crate::alarm::AlarmChannel;
use crate::registers::RegAddr;

/// A field that failed validation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// Calendar year (2000-2099)
    Year,
    /// Month (1-12)
    Month,
    /// Day of month, checked against the month and leap year
    Day,
    /// Day of week (1-7)
    Weekday,
    /// Hour (0-23)
    Hour,
    /// Minute (0-59)
    Minute,
    /// Second (0-59)
    Second,
    /// Alarm date of month (1-31)
    AlarmDate,
    /// Alarm day of week (1-7)
    AlarmWeekday,
    /// EEPROM start address (0-1023)
    EepromAddress,
    /// EEPROM transfer length (1-32, and must fit below the end of memory)
    EepromLength,
}

/// Errors raised while encoding or decoding register contents.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// A caller-supplied value is outside its legal domain.
    Validation(Field),
    /// A caller-supplied address or length is outside the addressable range.
    OutOfRange(Field),
    /// An EEPROM write would wrap inside a 32-byte page.
    CrossesPage {
        /// Start address of the rejected write
        address: u16,
        /// Length of the rejected write
        length: usize,
    },
    /// The alarm mask bits do not form a defined match mode.
    UnknownMatchMode {
        /// Alarm channel that was decoded
        channel: AlarmChannel,
        /// Mask bits, A1M1/A2M2 in bit 0
        bits: u8,
    },
    /// The device returned a register value outside the decode space.
    CorruptedRegister {
        /// Register that held the value
        register: RegAddr,
        /// Raw register value
        value: u8,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Validation(field) => write!(f, "invalid value for {:?}", field),
            CodecError::OutOfRange(field) => write!(f, "{:?} out of range", field),
            CodecError::CrossesPage { address, length } => write!(
                f,
                "write of {} bytes at {:#06x} crosses an EEPROM page",
                length, address
            ),
            CodecError::UnknownMatchMode { channel, bits } => {
                write!(f, "unknown match mode {:#06b} on {:?}", bits, channel)
            }
            CodecError::CorruptedRegister { register, value } => {
                write!(f, "register {:?} holds undecodable value {:#04x}", register, value)
            }
        }
    }
}

/// Driver error.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Error reported by the I2C bus, passed through unchanged
    I2c(E),
    /// Encoding, validation or decoding error
    Codec(CodecError),
}

impl<E> From<CodecError> for Error<E> {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}
