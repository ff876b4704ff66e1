//! Alarm configuration for the DS3231 RTC.
//!
//! The DS3231 has two independent alarms. Each alarm compares a subset of its
//! fields against the running clock; the subset is selected by mask bits
//! stored in bit 7 of every alarm register. This module exposes one closed
//! enum per channel whose variants carry exactly the fields that mode
//! compares, so an undefined mask combination cannot be built and is rejected
//! when it is read back from the device.
//!
//! # Alarm 1 (registers 0x07-0x0A)
//! - [`Alarm1Mode::EverySecond`] - every second
//! - [`Alarm1Mode::MatchSecond`] - once a minute
//! - [`Alarm1Mode::MatchMinuteSecond`] - once an hour
//! - [`Alarm1Mode::MatchHourMinuteSecond`] - once a day
//! - [`Alarm1Mode::MatchDayHourMinuteSecond`] - once a month or week
//!
//! # Alarm 2 (registers 0x0B-0x0D, always at second 00)
//! - [`Alarm2Mode::EveryMinute`]
//! - [`Alarm2Mode::MatchMinute`]
//! - [`Alarm2Mode::MatchHourMinute`]
//! - [`Alarm2Mode::MatchDayHourMinute`]
//!
//! Fields a mode does not compare are written as zero. Alarm hours are
//! always written in 24-hour form; 12-hour registers are normalized on read.

use embedded_hal::i2c::I2c;

use crate::bcd;
use crate::calendar::hour_from_12;
use crate::error::{CodecError, Error, Field};
use crate::registers::{
    AlarmDayDate, AlarmHours, AlarmMinutes, AlarmSeconds, Control, DayDateSelect, RegAddr,
    Registers, Status, TimeRepresentation,
};

/// One of the two alarm channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmChannel {
    /// Alarm 1, seconds resolution
    Alarm1,
    /// Alarm 2, minute resolution
    Alarm2,
}

impl AlarmChannel {
    fn flag(self, status: Status) -> bool {
        match self {
            AlarmChannel::Alarm1 => status.alarm1_flag(),
            AlarmChannel::Alarm2 => status.alarm2_flag(),
        }
    }

    fn clear_flag(self, status: &mut Status) {
        match self {
            AlarmChannel::Alarm1 => status.set_alarm1_flag(false),
            AlarmChannel::Alarm2 => status.set_alarm2_flag(false),
        }
    }

    fn interrupt_enabled(self, control: Control) -> bool {
        match self {
            AlarmChannel::Alarm1 => control.alarm1_interrupt_enable(),
            AlarmChannel::Alarm2 => control.alarm2_interrupt_enable(),
        }
    }

    fn set_interrupt_enabled(self, control: &mut Control, enabled: bool) {
        match self {
            AlarmChannel::Alarm1 => control.set_alarm1_interrupt_enable(enabled),
            AlarmChannel::Alarm2 => control.set_alarm2_interrupt_enable(enabled),
        }
    }
}

/// Day an alarm matches on. The variant sets the DY/DT bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmDay {
    /// Date of month (1-31)
    Date(u8),
    /// Day of week (1-7, 1 = Sunday)
    Weekday(u8),
}

/// Alarm 1 match modes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm1Mode {
    /// Trigger every second (A1M4:A1M1 = 1111)
    EverySecond,
    /// Trigger when seconds match (1110)
    MatchSecond {
        /// Seconds value (0-59)
        second: u8,
    },
    /// Trigger when minutes and seconds match (1100)
    MatchMinuteSecond {
        /// Minutes value (0-59)
        minute: u8,
        /// Seconds value (0-59)
        second: u8,
    },
    /// Trigger when hours, minutes and seconds match (1000)
    MatchHourMinuteSecond {
        /// Hours value (0-23)
        hour: u8,
        /// Minutes value (0-59)
        minute: u8,
        /// Seconds value (0-59)
        second: u8,
    },
    /// Trigger when day, hours, minutes and seconds match (0000)
    MatchDayHourMinuteSecond {
        /// Date of month or day of week
        day: AlarmDay,
        /// Hours value (0-23)
        hour: u8,
        /// Minutes value (0-59)
        minute: u8,
        /// Seconds value (0-59)
        second: u8,
    },
}

/// Alarm 2 match modes. Alarm 2 always fires at second 00.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm2Mode {
    /// Trigger every minute (A2M4:A2M2 = 111)
    EveryMinute,
    /// Trigger when minutes match (110)
    MatchMinute {
        /// Minutes value (0-59)
        minute: u8,
    },
    /// Trigger when hours and minutes match (100)
    MatchHourMinute {
        /// Hours value (0-23)
        hour: u8,
        /// Minutes value (0-59)
        minute: u8,
    },
    /// Trigger when day, hours and minutes match (000)
    MatchDayHourMinute {
        /// Date of month or day of week
        day: AlarmDay,
        /// Hours value (0-23)
        hour: u8,
        /// Minutes value (0-59)
        minute: u8,
    },
}

/// Alarm 1 configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alarm1 {
    /// Fields compared against the clock
    pub mode: Alarm1Mode,
    /// Assert INT/SQW when the alarm fires (A1IE)
    pub interrupt_enabled: bool,
}

/// Alarm 2 configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alarm2 {
    /// Fields compared against the clock
    pub mode: Alarm2Mode,
    /// Assert INT/SQW when the alarm fires (A2IE)
    pub interrupt_enabled: bool,
}

/// Field values shared by both channels; unused fields are zero.
#[derive(Default)]
struct AlarmFields {
    second: u8,
    minute: u8,
    hour: u8,
    day: Option<AlarmDay>,
}

impl AlarmFields {
    fn validate(&self) -> Result<(), CodecError> {
        if self.second > 59 {
            return Err(CodecError::Validation(Field::Second));
        }
        if self.minute > 59 {
            return Err(CodecError::Validation(Field::Minute));
        }
        if self.hour > 23 {
            return Err(CodecError::Validation(Field::Hour));
        }
        match self.day {
            Some(AlarmDay::Date(date)) if !(1..=31).contains(&date) => {
                Err(CodecError::Validation(Field::AlarmDate))
            }
            Some(AlarmDay::Weekday(day)) if !(1..=7).contains(&day) => {
                Err(CodecError::Validation(Field::AlarmWeekday))
            }
            _ => Ok(()),
        }
    }
}

fn encode(value: u8, field: Field) -> Result<u8, CodecError> {
    bcd::encode(value).map_err(|_| CodecError::Validation(field))
}

fn encode_seconds(second: u8, masked: bool) -> Result<AlarmSeconds, CodecError> {
    let mut reg = AlarmSeconds::default();
    reg.set_seconds(encode(second, Field::Second)?);
    reg.set_alarm_mask1(masked);
    Ok(reg)
}

fn encode_minutes(minute: u8, masked: bool) -> Result<AlarmMinutes, CodecError> {
    let mut reg = AlarmMinutes::default();
    reg.set_minutes(encode(minute, Field::Minute)?);
    reg.set_alarm_mask2(masked);
    Ok(reg)
}

fn encode_hours(hour: u8, masked: bool) -> Result<AlarmHours, CodecError> {
    let mut reg = AlarmHours::default();
    reg.set_time_representation(TimeRepresentation::TwentyFourHour);
    reg.set_hours24(encode(hour, Field::Hour)?);
    reg.set_alarm_mask3(masked);
    Ok(reg)
}

fn encode_day(day: Option<AlarmDay>, masked: bool) -> Result<AlarmDayDate, CodecError> {
    let mut reg = AlarmDayDate::default();
    match day {
        Some(AlarmDay::Date(date)) => {
            reg.set_day_date_select(DayDateSelect::Date);
            reg.set_day_or_date(encode(date, Field::AlarmDate)?);
        }
        Some(AlarmDay::Weekday(day)) => {
            reg.set_day_date_select(DayDateSelect::Day);
            reg.set_day_or_date(day);
        }
        None => {}
    }
    reg.set_alarm_mask4(masked);
    Ok(reg)
}

fn corrupted(register: RegAddr, value: u8) -> CodecError {
    CodecError::CorruptedRegister { register, value }
}

fn decode_bcd(
    bits: u8,
    raw: u8,
    register: RegAddr,
    range: core::ops::RangeInclusive<u8>,
) -> Result<u8, CodecError> {
    let value = bcd::decode(bits).map_err(|_| corrupted(register, raw))?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(corrupted(register, raw))
    }
}

fn decode_seconds(reg: AlarmSeconds, register: RegAddr) -> Result<u8, CodecError> {
    decode_bcd(reg.seconds(), reg.into(), register, 0..=59)
}

fn decode_minutes(reg: AlarmMinutes, register: RegAddr) -> Result<u8, CodecError> {
    decode_bcd(reg.minutes(), reg.into(), register, 0..=59)
}

fn decode_hours(reg: AlarmHours, register: RegAddr) -> Result<u8, CodecError> {
    match reg.time_representation() {
        TimeRepresentation::TwentyFourHour => {
            decode_bcd(reg.hours24(), reg.into(), register, 0..=23)
        }
        TimeRepresentation::TwelveHour => {
            let hour12 = decode_bcd(reg.hours12(), reg.into(), register, 1..=12)?;
            Ok(hour_from_12(hour12, reg.pm()))
        }
    }
}

fn decode_day(reg: AlarmDayDate, register: RegAddr) -> Result<AlarmDay, CodecError> {
    match reg.day_date_select() {
        DayDateSelect::Day => {
            let day = reg.day_or_date();
            if (1..=7).contains(&day) {
                Ok(AlarmDay::Weekday(day))
            } else {
                Err(corrupted(register, reg.into()))
            }
        }
        DayDateSelect::Date => Ok(AlarmDay::Date(decode_bcd(
            reg.day_or_date(),
            reg.into(),
            register,
            1..=31,
        )?)),
    }
}

impl Alarm1Mode {
    /// Mask bits A1M4..A1M1 for this mode, A1M1 in bit 0.
    #[must_use]
    pub fn mask_bits(&self) -> u8 {
        match self {
            Alarm1Mode::EverySecond => 0b1111,
            Alarm1Mode::MatchSecond { .. } => 0b1110,
            Alarm1Mode::MatchMinuteSecond { .. } => 0b1100,
            Alarm1Mode::MatchHourMinuteSecond { .. } => 0b1000,
            Alarm1Mode::MatchDayHourMinuteSecond { .. } => 0b0000,
        }
    }

    fn fields(&self) -> AlarmFields {
        match *self {
            Alarm1Mode::EverySecond => AlarmFields::default(),
            Alarm1Mode::MatchSecond { second } => AlarmFields {
                second,
                ..AlarmFields::default()
            },
            Alarm1Mode::MatchMinuteSecond { minute, second } => AlarmFields {
                second,
                minute,
                ..AlarmFields::default()
            },
            Alarm1Mode::MatchHourMinuteSecond {
                hour,
                minute,
                second,
            } => AlarmFields {
                second,
                minute,
                hour,
                day: None,
            },
            Alarm1Mode::MatchDayHourMinuteSecond {
                day,
                hour,
                minute,
                second,
            } => AlarmFields {
                second,
                minute,
                hour,
                day: Some(day),
            },
        }
    }

    /// Validates the fields this mode compares.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` naming the first invalid field.
    pub fn validate(&self) -> Result<(), CodecError> {
        self.fields().validate()
    }

    /// Encodes the mode into the four Alarm 1 registers.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` if a field is out of range.
    pub fn to_registers(&self) -> Result<[u8; 4], CodecError> {
        let fields = self.fields();
        fields.validate()?;
        let bits = self.mask_bits();
        Ok([
            encode_seconds(fields.second, bits & 0b0001 != 0)?.into(),
            encode_minutes(fields.minute, bits & 0b0010 != 0)?.into(),
            encode_hours(fields.hour, bits & 0b0100 != 0)?.into(),
            encode_day(fields.day, bits & 0b1000 != 0)?.into(),
        ])
    }

    /// Decodes the four Alarm 1 registers.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownMatchMode` for an undefined mask
    /// combination, or `CodecError::CorruptedRegister` for a field the mode
    /// compares that does not hold a valid value.
    pub fn from_registers(raw: &[u8; 4]) -> Result<Self, CodecError> {
        let seconds = AlarmSeconds::from(raw[0]);
        let minutes = AlarmMinutes::from(raw[1]);
        let hours = AlarmHours::from(raw[2]);
        let day_date = AlarmDayDate::from(raw[3]);
        let bits = u8::from(seconds.alarm_mask1())
            | u8::from(minutes.alarm_mask2()) << 1
            | u8::from(hours.alarm_mask3()) << 2
            | u8::from(day_date.alarm_mask4()) << 3;

        let second = || decode_seconds(seconds, RegAddr::Alarm1Seconds);
        let minute = || decode_minutes(minutes, RegAddr::Alarm1Minutes);
        let hour = || decode_hours(hours, RegAddr::Alarm1Hours);

        match bits {
            0b1111 => Ok(Alarm1Mode::EverySecond),
            0b1110 => Ok(Alarm1Mode::MatchSecond { second: second()? }),
            0b1100 => Ok(Alarm1Mode::MatchMinuteSecond {
                minute: minute()?,
                second: second()?,
            }),
            0b1000 => Ok(Alarm1Mode::MatchHourMinuteSecond {
                hour: hour()?,
                minute: minute()?,
                second: second()?,
            }),
            0b0000 => Ok(Alarm1Mode::MatchDayHourMinuteSecond {
                day: decode_day(day_date, RegAddr::Alarm1DayDate)?,
                hour: hour()?,
                minute: minute()?,
                second: second()?,
            }),
            _ => Err(CodecError::UnknownMatchMode {
                channel: AlarmChannel::Alarm1,
                bits,
            }),
        }
    }
}

impl Alarm2Mode {
    /// Mask bits A2M4..A2M2 for this mode, A2M2 in bit 0.
    #[must_use]
    pub fn mask_bits(&self) -> u8 {
        match self {
            Alarm2Mode::EveryMinute => 0b111,
            Alarm2Mode::MatchMinute { .. } => 0b110,
            Alarm2Mode::MatchHourMinute { .. } => 0b100,
            Alarm2Mode::MatchDayHourMinute { .. } => 0b000,
        }
    }

    fn fields(&self) -> AlarmFields {
        match *self {
            Alarm2Mode::EveryMinute => AlarmFields::default(),
            Alarm2Mode::MatchMinute { minute } => AlarmFields {
                minute,
                ..AlarmFields::default()
            },
            Alarm2Mode::MatchHourMinute { hour, minute } => AlarmFields {
                minute,
                hour,
                ..AlarmFields::default()
            },
            Alarm2Mode::MatchDayHourMinute { day, hour, minute } => AlarmFields {
                second: 0,
                minute,
                hour,
                day: Some(day),
            },
        }
    }

    /// Validates the fields this mode compares.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` naming the first invalid field.
    pub fn validate(&self) -> Result<(), CodecError> {
        self.fields().validate()
    }

    /// Encodes the mode into the three Alarm 2 registers.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` if a field is out of range.
    pub fn to_registers(&self) -> Result<[u8; 3], CodecError> {
        let fields = self.fields();
        fields.validate()?;
        let bits = self.mask_bits();
        Ok([
            encode_minutes(fields.minute, bits & 0b001 != 0)?.into(),
            encode_hours(fields.hour, bits & 0b010 != 0)?.into(),
            encode_day(fields.day, bits & 0b100 != 0)?.into(),
        ])
    }

    /// Decodes the three Alarm 2 registers.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownMatchMode` for an undefined mask
    /// combination, or `CodecError::CorruptedRegister` for a field the mode
    /// compares that does not hold a valid value.
    pub fn from_registers(raw: &[u8; 3]) -> Result<Self, CodecError> {
        let minutes = AlarmMinutes::from(raw[0]);
        let hours = AlarmHours::from(raw[1]);
        let day_date = AlarmDayDate::from(raw[2]);
        let bits = u8::from(minutes.alarm_mask2())
            | u8::from(hours.alarm_mask3()) << 1
            | u8::from(day_date.alarm_mask4()) << 2;

        let minute = || decode_minutes(minutes, RegAddr::Alarm2Minutes);
        let hour = || decode_hours(hours, RegAddr::Alarm2Hours);

        match bits {
            0b111 => Ok(Alarm2Mode::EveryMinute),
            0b110 => Ok(Alarm2Mode::MatchMinute { minute: minute()? }),
            0b100 => Ok(Alarm2Mode::MatchHourMinute {
                hour: hour()?,
                minute: minute()?,
            }),
            0b000 => Ok(Alarm2Mode::MatchDayHourMinute {
                day: decode_day(day_date, RegAddr::Alarm2DayDate)?,
                hour: hour()?,
                minute: minute()?,
            }),
            _ => Err(CodecError::UnknownMatchMode {
                channel: AlarmChannel::Alarm2,
                bits,
            }),
        }
    }
}

/// Alarm registers and alarm flags of a DS3231.
pub struct Alarms<'a, I2C> {
    regs: Registers<'a, I2C>,
}

impl<'a, I2C: I2c> Alarms<'a, I2C> {
    /// Creates an alarm handle for the DS3231 at `address`.
    pub fn new(i2c: &'a mut I2C, address: u8) -> Self {
        Self {
            regs: Registers::new(i2c, address),
        }
    }

    /// Programs Alarm 1, sets or clears its interrupt enable bit, and clears
    /// a stale triggered flag.
    ///
    /// Enabling the interrupt does not change INTCN: the interrupt only
    /// reaches the INT/SQW pin while the square wave is off.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` (before any bus traffic) for an
    /// invalid field, or `Error::I2c` on bus failure.
    pub fn set_alarm1(&mut self, alarm: &Alarm1) -> Result<(), Error<I2C::Error>> {
        let raw = alarm.mode.to_registers()?;
        debug!("DS3231: set {:?}", alarm);
        self.regs.write_block(RegAddr::Alarm1Seconds, &raw)?;
        self.set_interrupt(AlarmChannel::Alarm1, alarm.interrupt_enabled)?;
        self.check_and_clear(AlarmChannel::Alarm1)?;
        Ok(())
    }

    /// Programs Alarm 2. See [`Alarms::set_alarm1`].
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` (before any bus traffic) for an
    /// invalid field, or `Error::I2c` on bus failure.
    pub fn set_alarm2(&mut self, alarm: &Alarm2) -> Result<(), Error<I2C::Error>> {
        let raw = alarm.mode.to_registers()?;
        debug!("DS3231: set {:?}", alarm);
        self.regs.write_block(RegAddr::Alarm2Minutes, &raw)?;
        self.set_interrupt(AlarmChannel::Alarm2, alarm.interrupt_enabled)?;
        self.check_and_clear(AlarmChannel::Alarm2)?;
        Ok(())
    }

    /// Reads back the Alarm 1 configuration.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownMatchMode` or
    /// `CodecError::CorruptedRegister` if the registers cannot be decoded, or
    /// `Error::I2c` on bus failure.
    pub fn alarm1(&mut self) -> Result<Alarm1, Error<I2C::Error>> {
        let mut raw = [0u8; 4];
        self.regs.read_block(RegAddr::Alarm1Seconds, &mut raw)?;
        let mode = Alarm1Mode::from_registers(&raw)?;
        let control = self.regs.control()?;
        Ok(Alarm1 {
            mode,
            interrupt_enabled: AlarmChannel::Alarm1.interrupt_enabled(control),
        })
    }

    /// Reads back the Alarm 2 configuration.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::UnknownMatchMode` or
    /// `CodecError::CorruptedRegister` if the registers cannot be decoded, or
    /// `Error::I2c` on bus failure.
    pub fn alarm2(&mut self) -> Result<Alarm2, Error<I2C::Error>> {
        let mut raw = [0u8; 3];
        self.regs.read_block(RegAddr::Alarm2Minutes, &mut raw)?;
        let mode = Alarm2Mode::from_registers(&raw)?;
        let control = self.regs.control()?;
        Ok(Alarm2 {
            mode,
            interrupt_enabled: AlarmChannel::Alarm2.interrupt_enabled(control),
        })
    }

    /// Sets or clears the interrupt enable bit of `channel`.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn set_interrupt(
        &mut self,
        channel: AlarmChannel,
        enabled: bool,
    ) -> Result<(), Error<I2C::Error>> {
        self.regs
            .modify_control(|control| channel.set_interrupt_enabled(control, enabled))?;
        Ok(())
    }

    /// Returns the triggered flag of `channel` without clearing it.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn is_triggered(&mut self, channel: AlarmChannel) -> Result<bool, Error<I2C::Error>> {
        Ok(channel.flag(self.regs.status()?))
    }

    /// Returns true and clears the flag if `channel` has fired since the last
    /// call. Only that flag is cleared; nothing is written when it is not set.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn check_and_clear(&mut self, channel: AlarmChannel) -> Result<bool, Error<I2C::Error>> {
        let status = self.regs.status()?;
        if !channel.flag(status) {
            return Ok(false);
        }
        let mut cleared = status.released_flags();
        channel.clear_flag(&mut cleared);
        self.regs.set_status(cleared)?;
        debug!("DS3231: {:?} fired, flag cleared", channel);
        Ok(true)
    }
}
