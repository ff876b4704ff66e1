//! Register definitions and bitfield structures for the DS3231 RTC.
//!
//! This module contains the register addresses, the bitfield views of the
//! registers that carry flags next to their data, and [`Registers`], the
//! lowest-level handle that moves register bytes over I2C.

use bitfield::bitfield;
use embedded_hal::i2c::I2c;

use crate::error::Error;

/// Number of registers in the DS3231 register map (0x00-0x12).
pub(crate) const REGISTER_COUNT: usize = 0x13;

/// Register addresses for the DS3231 RTC.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59)
    Seconds = 0x00,
    /// Minutes register (0-59)
    Minutes = 0x01,
    /// Hours register (1-12 + AM/PM or 0-23)
    Hours = 0x02,
    /// Day register (1-7)
    Day = 0x03,
    /// Date register (1-31)
    Date = 0x04,
    /// Month register (1-12) with century flag
    Month = 0x05,
    /// Year register (0-99)
    Year = 0x06,
    /// Alarm 1 seconds register
    Alarm1Seconds = 0x07,
    /// Alarm 1 minutes register
    Alarm1Minutes = 0x08,
    /// Alarm 1 hours register
    Alarm1Hours = 0x09,
    /// Alarm 1 day/date register
    Alarm1DayDate = 0x0A,
    /// Alarm 2 minutes register
    Alarm2Minutes = 0x0B,
    /// Alarm 2 hours register
    Alarm2Hours = 0x0C,
    /// Alarm 2 day/date register
    Alarm2DayDate = 0x0D,
    /// Control register
    Control = 0x0E,
    /// Control/Status register
    ControlStatus = 0x0F,
    /// Aging offset register
    AgingOffset = 0x10,
    /// Temperature MSB register
    MSBTemp = 0x11,
    /// Temperature LSB register
    LSBTemp = 0x12,
}

/// Hour format stored in an hours register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 24-hour format (0-23)
    TwentyFourHour = 0,
    /// 12-hour format (1-12 + AM/PM)
    TwelveHour = 1,
}
impl From<u8> for TimeRepresentation {
    /// Creates a `TimeRepresentation` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => TimeRepresentation::TwentyFourHour,
            1 => TimeRepresentation::TwelveHour,
            _ => panic!("Invalid value for TimeRepresentation: {}", v),
        }
    }
}
impl From<TimeRepresentation> for u8 {
    fn from(v: TimeRepresentation) -> Self {
        v as u8
    }
}

/// Function of the shared INT/SQW pin (INTCN bit).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptControl {
    /// Output square wave on INT/SQW pin
    SquareWave = 0,
    /// Output interrupt signal on INT/SQW pin
    Interrupt = 1,
}
impl From<u8> for InterruptControl {
    /// Creates an `InterruptControl` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => InterruptControl::SquareWave,
            1 => InterruptControl::Interrupt,
            _ => panic!("Invalid value for InterruptControl: {}", v),
        }
    }
}
impl From<InterruptControl> for u8 {
    fn from(v: InterruptControl) -> Self {
        v as u8
    }
}

/// Rate select bits (RS2:RS1) of the control register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWaveFrequency {
    /// 1 Hz square wave output
    Hz1 = 0b00,
    /// 1.024 kHz square wave output
    Hz1024 = 0b01,
    /// 4.096 kHz square wave output
    Hz4096 = 0b10,
    /// 8.192 kHz square wave output
    Hz8192 = 0b11,
}
impl From<u8> for SquareWaveFrequency {
    /// Creates a `SquareWaveFrequency` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0b00, 0b01, 0b10, or 0b11.
    fn from(v: u8) -> Self {
        match v {
            0b00 => SquareWaveFrequency::Hz1,
            0b01 => SquareWaveFrequency::Hz1024,
            0b10 => SquareWaveFrequency::Hz4096,
            0b11 => SquareWaveFrequency::Hz8192,
            _ => panic!("Invalid value for SquareWaveFrequency: {}", v),
        }
    }
}
impl From<SquareWaveFrequency> for u8 {
    fn from(v: SquareWaveFrequency) -> Self {
        v as u8
    }
}

/// Day/Date select for alarm registers (DY/DT bit).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DayDateSelect {
    /// Match against date of the month (1-31)
    Date = 0,
    /// Match against day of the week (1-7)
    Day = 1,
}
impl From<u8> for DayDateSelect {
    /// Creates a `DayDateSelect` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => DayDateSelect::Date,
            1 => DayDateSelect::Day,
            _ => panic!("Invalid value for DayDateSelect: {}", v),
        }
    }
}
impl From<DayDateSelect> for u8 {
    fn from(v: DayDateSelect) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Hours register with format selection and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Time representation format (12/24 hour)
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    /// PM flag in 12-hour mode, 20-hour bit in 24-hour mode
    pub pm_or_twenty_hours, set_pm_or_twenty_hours: 5, 5;
    /// BCD hour digits in 12-hour mode (1-12)
    pub hours12, set_hours12: 4, 0;
    /// BCD hour digits in 24-hour mode (0-23)
    pub hours24, set_hours24: 5, 0;
}
from_register_u8!(Hours);

bitfield! {
    /// Month register (1-12) with century flag and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Month(u8);
    impl Debug;
    /// Century flag, toggled by the device when the year wraps from 99 to 00
    pub century, set_century: 7;
    /// BCD month digits
    pub month, set_month: 4, 0;
}
from_register_u8!(Month);

bitfield! {
    /// Control register for device configuration.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control(u8);
    impl Debug;
    /// Stop the oscillator when on battery power (EOSC, active high)
    pub disable_oscillator, set_disable_oscillator: 7;
    /// Enable square wave output on battery power
    pub battery_backed_square_wave, set_battery_backed_square_wave: 6;
    /// Force temperature conversion
    pub convert_temperature, set_convert_temperature: 5;
    /// Square wave output frequency selection
    pub from into SquareWaveFrequency, square_wave_frequency, set_square_wave_frequency: 4, 3;
    /// INT/SQW pin function control
    pub from into InterruptControl, interrupt_control, set_interrupt_control: 2, 2;
    /// Enable alarm 2 interrupt
    pub alarm2_interrupt_enable, set_alarm2_interrupt_enable: 1;
    /// Enable alarm 1 interrupt
    pub alarm1_interrupt_enable, set_alarm1_interrupt_enable: 0;
}
from_register_u8!(Control);

bitfield! {
    /// Status register for device state and flags.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Status(u8);
    impl Debug;
    /// Oscillator stop flag
    pub oscillator_stop_flag, set_oscillator_stop_flag: 7;
    /// Enable 32kHz output
    pub enable_32khz_output, set_enable_32khz_output: 3;
    /// Device busy flag
    pub busy, set_busy: 2;
    /// Alarm 2 triggered flag
    pub alarm2_flag, set_alarm2_flag: 1;
    /// Alarm 1 triggered flag
    pub alarm1_flag, set_alarm1_flag: 0;
}
from_register_u8!(Status);

impl Status {
    /// Returns the value to write back after a read-modify-write.
    ///
    /// Alarm flags ignore writes of 1, so both are written high: a flag raised
    /// between the read and the write is then left untouched.
    #[must_use]
    pub fn released_flags(self) -> Self {
        let mut value = self;
        value.set_alarm1_flag(true);
        value.set_alarm2_flag(true);
        value
    }
}

bitfield! {
    /// Aging offset register for oscillator adjustment.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AgingOffset(u8);
    impl Debug;
    /// Aging offset value (-128 to +127)
    pub i8, aging_offset, set_aging_offset: 7, 0;
}
from_register_u8!(AgingOffset);

// Alarm register types with mask bits and special control bits

bitfield! {
    /// Alarm Seconds register with mask bit (only used by Alarm 1).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmSeconds(u8);
    impl Debug;
    /// Alarm mask bit 1 (A1M1)
    pub alarm_mask1, set_alarm_mask1: 7;
    /// BCD seconds digits
    pub seconds, set_seconds: 6, 0;
}
from_register_u8!(AlarmSeconds);

bitfield! {
    /// Alarm Minutes register with mask bit (used by both Alarm 1 and Alarm 2).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmMinutes(u8);
    impl Debug;
    /// Alarm mask bit 2 (A1M2/A2M2)
    pub alarm_mask2, set_alarm_mask2: 7;
    /// BCD minutes digits
    pub minutes, set_minutes: 6, 0;
}
from_register_u8!(AlarmMinutes);

bitfield! {
    /// Alarm Hours register with mask bit and time format control (used by both Alarm 1 and Alarm 2).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmHours(u8);
    impl Debug;
    /// Alarm mask bit 3 (A1M3/A2M3)
    pub alarm_mask3, set_alarm_mask3: 7;
    /// Time representation format (12/24 hour)
    pub from into TimeRepresentation, time_representation, set_time_representation: 6, 6;
    /// PM flag in 12-hour mode
    pub pm, set_pm: 5;
    /// BCD hour digits in 12-hour mode (1-12)
    pub hours12, set_hours12: 4, 0;
    /// BCD hour digits in 24-hour mode (0-23)
    pub hours24, set_hours24: 5, 0;
}
from_register_u8!(AlarmHours);

bitfield! {
    /// Alarm Day/Date register with mask bit and DY/DT control (used by both Alarm 1 and Alarm 2).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmDayDate(u8);
    impl Debug;
    /// Alarm mask bit 4 (A1M4/A2M4)
    pub alarm_mask4, set_alarm_mask4: 7;
    /// Day/Date select (1=day of week, 0=date of month)
    pub from into DayDateSelect, day_date_select, set_day_date_select: 6, 6;
    /// BCD date digits (DY/DT=0) or day of week (DY/DT=1)
    pub day_or_date, set_day_or_date: 5, 0;
}
from_register_u8!(AlarmDayDate);

/// Raw register access to a DS3231.
///
/// Every higher-level component goes through this handle, so all register
/// traffic shares one place for addressing and tracing.
pub struct Registers<'a, I2C> {
    i2c: &'a mut I2C,
    address: u8,
}

macro_rules! register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        $(
            paste::paste! {
                #[doc = concat!("Reads the ", stringify!($name), " register.")]
                pub fn $name(&mut self) -> Result<$typ, Error<I2C::Error>> {
                    Ok(<$typ>::from(self.read($regaddr)?))
                }

                #[doc = concat!("Writes the ", stringify!($name), " register.")]
                pub fn [<set_ $name>](&mut self, value: $typ) -> Result<(), Error<I2C::Error>> {
                    self.write($regaddr, value.into())
                }
            }
        )+
    };
}

impl<'a, I2C: I2c> Registers<'a, I2C> {
    /// Creates a register handle for the DS3231 at `address`.
    pub fn new(i2c: &'a mut I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Reads consecutive registers starting at `start` into `buf`.
    ///
    /// # Errors
    /// Returns `Error::I2c` if the bus transaction fails.
    pub fn read_block(&mut self, start: RegAddr, buf: &mut [u8]) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write_read(self.address, &[start as u8], buf)
            .map_err(Error::I2c)?;
        trace!("DS3231: read {:?} = {:?}", start, buf);
        Ok(())
    }

    /// Writes `data` to consecutive registers starting at `start` in one
    /// transaction.
    ///
    /// # Errors
    /// Returns `Error::I2c` if the bus transaction fails.
    ///
    /// # Panics
    /// Panics if `data` is longer than the register map.
    pub fn write_block(&mut self, start: RegAddr, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        let mut payload = [0u8; REGISTER_COUNT + 1];
        payload[0] = start as u8;
        payload[1..=data.len()].copy_from_slice(data);
        trace!("DS3231: write {:?} = {:?}", start, data);
        self.i2c
            .write(self.address, &payload[..=data.len()])
            .map_err(Error::I2c)
    }

    /// Reads a single register.
    ///
    /// # Errors
    /// Returns `Error::I2c` if the bus transaction fails.
    pub fn read(&mut self, reg: RegAddr) -> Result<u8, Error<I2C::Error>> {
        let mut data = [0];
        self.read_block(reg, &mut data)?;
        Ok(data[0])
    }

    /// Writes a single register.
    ///
    /// # Errors
    /// Returns `Error::I2c` if the bus transaction fails.
    pub fn write(&mut self, reg: RegAddr, value: u8) -> Result<(), Error<I2C::Error>> {
        self.write_block(reg, &[value])
    }

    register_access!(
        (control, RegAddr::Control, Control),
        (status, RegAddr::ControlStatus, Status),
        (aging_offset, RegAddr::AgingOffset, AgingOffset)
    );

    /// Read-modify-write of the control register. Returns the value written.
    ///
    /// # Errors
    /// Returns `Error::I2c` if either bus transaction fails.
    pub fn modify_control<F: FnOnce(&mut Control)>(
        &mut self,
        f: F,
    ) -> Result<Control, Error<I2C::Error>> {
        let mut control = self.control()?;
        f(&mut control);
        self.set_control(control)?;
        Ok(control)
    }

    /// Read-modify-write of the status register that never clears an alarm
    /// flag unless `f` does so explicitly. Returns the value written.
    ///
    /// # Errors
    /// Returns `Error::I2c` if either bus transaction fails.
    pub fn modify_status<F: FnOnce(&mut Status)>(
        &mut self,
        f: F,
    ) -> Result<Status, Error<I2C::Error>> {
        let mut status = self.status()?.released_flags();
        f(&mut status);
        self.set_status(status)?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use alloc::vec;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = 0x68;

    #[test]
    fn test_day_date_select_conversions() {
        assert_eq!(DayDateSelect::from(0), DayDateSelect::Date);
        assert_eq!(DayDateSelect::from(1), DayDateSelect::Day);
        assert_eq!(u8::from(DayDateSelect::Date), 0);
        assert_eq!(u8::from(DayDateSelect::Day), 1);
    }

    #[test]
    #[should_panic(expected = "Invalid value for DayDateSelect: 2")]
    fn test_invalid_day_date_select_conversion() {
        let _ = DayDateSelect::from(2);
    }

    #[test]
    fn test_hours_register_views() {
        // 24-hour 23:00
        let hours = Hours::from(0x23);
        assert_eq!(
            hours.time_representation(),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(hours.hours24(), 0x23);

        // 12-hour 11 PM
        let hours = Hours::from(0x71);
        assert_eq!(hours.time_representation(), TimeRepresentation::TwelveHour);
        assert_eq!(hours.pm_or_twenty_hours(), 1);
        assert_eq!(hours.hours12(), 0x11);
    }

    #[test]
    fn test_month_century_flag() {
        let month = Month::from(0x92);
        assert!(month.century());
        assert_eq!(month.month(), 0x12);
    }

    #[test]
    fn test_control_register_fields() {
        let mut control = Control::from(0b0001_0100);
        assert_eq!(
            control.square_wave_frequency(),
            SquareWaveFrequency::Hz4096
        );
        assert_eq!(control.interrupt_control(), InterruptControl::Interrupt);
        control.set_square_wave_frequency(SquareWaveFrequency::Hz8192);
        control.set_alarm1_interrupt_enable(true);
        assert_eq!(u8::from(control), 0b0001_1101);
    }

    #[test]
    fn test_status_released_flags() {
        let status = Status::from(0b1000_1000).released_flags();
        assert_eq!(u8::from(status), 0b1000_1011);
    }

    #[test]
    fn test_register_access() {
        let mut i2c = I2cMock::new(&[
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::AgingOffset as u8],
                vec![0xFE],
            ),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::AgingOffset as u8, 0x05]),
        ]);
        let mut regs = Registers::new(&mut i2c, DEVICE_ADDRESS);

        assert_eq!(regs.aging_offset().unwrap().aging_offset(), -2);
        let mut offset = AgingOffset::default();
        offset.set_aging_offset(5);
        regs.set_aging_offset(offset).unwrap();
        i2c.done();
    }

    #[test]
    fn test_modify_status_keeps_alarm_flags() {
        let mut i2c = I2cMock::new(&[
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8],
                vec![0b1000_0000],
            ),
            I2cTrans::write(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8, 0b1000_1011],
            ),
        ]);
        let mut regs = Registers::new(&mut i2c, DEVICE_ADDRESS);

        let written = regs
            .modify_status(|s| s.set_enable_32khz_output(true))
            .unwrap();
        assert!(written.oscillator_stop_flag());
        i2c.done();
    }

    #[test]
    fn test_bus_error_is_propagated() {
        let mut i2c = I2cMock::new(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Control as u8],
            vec![0],
        )
        .with_error(ErrorKind::Other)]);
        let mut regs = Registers::new(&mut i2c, DEVICE_ADDRESS);

        assert_eq!(regs.control(), Err(Error::I2c(ErrorKind::Other)));
        i2c.done();
    }
}
