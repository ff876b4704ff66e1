//! Calendar time and the DS3231 timekeeping registers.
//!
//! The DS3231 keeps time in seven consecutive BCD registers
//! (seconds, minutes, hours, day, date, month, year). [`CalendarTime`] is the
//! validated, always 24-hour view of that block and [`Clock`] moves it over
//! the bus.
//!
//! # Register Model
//!
//! - The hours register may be in 12-hour mode if something else configured
//!   the device; reads normalize it, writes always select 24-hour mode.
//! - Only years 2000-2099 are representable. The century flag in the month
//!   register is ignored on read and cleared on write.
//! - Day of week is 1-7 with 1 = Sunday.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use embedded_hal::i2c::I2c;

use crate::bcd;
use crate::error::{CodecError, Error, Field};
use crate::registers::{Hours, Month, RegAddr, Registers, TimeRepresentation};

/// First year the clock can hold.
pub const YEAR_MIN: u16 = 2000;
/// Last year the clock can hold.
pub const YEAR_MAX: u16 = 2099;

/// A naive local date and time as kept by the DS3231.
///
/// Fields are public so values can be built freely; [`CalendarTime::validate`]
/// (called by [`Clock::write`]) rejects anything the device cannot hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    /// Year (2000-2099)
    pub year: u16,
    /// Month (1-12)
    pub month: u8,
    /// Day of month (1-28/29/30/31)
    pub day: u8,
    /// Day of week (1-7, 1 = Sunday)
    pub weekday: u8,
    /// Hour (0-23)
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
}

/// Result of reading the clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockReading {
    /// Time held in the timekeeping registers
    pub time: CalendarTime,
    /// The oscillator stopped at some point since the flag was last cleared,
    /// so `time` should not be trusted
    pub oscillator_stopped: bool,
}

fn encode_field(value: u8, field: Field) -> Result<u8, CodecError> {
    bcd::encode(value).map_err(|_| CodecError::Validation(field))
}

fn decode_field(
    bits: u8,
    raw: u8,
    register: RegAddr,
    range: core::ops::RangeInclusive<u8>,
) -> Result<u8, CodecError> {
    let corrupted = CodecError::CorruptedRegister {
        register,
        value: raw,
    };
    let value = bcd::decode(bits).map_err(|_| corrupted)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(corrupted)
    }
}

/// Converts a 12-hour register reading to 0-23.
pub(crate) fn hour_from_12(hour12: u8, pm: bool) -> u8 {
    match (hour12, pm) {
        (12, false) => 0,    // 12 AM = 0:xx
        (12, true) => 12,    // 12 PM = 12:xx
        (h, false) => h,     // 1-11 AM = 1-11:xx
        (h, true) => h + 12, // 1-11 PM = 13-23:xx
    }
}

fn days_valid(year: u16, month: u8, day: u8) -> bool {
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day)).is_some()
}

impl CalendarTime {
    /// Creates a validated calendar time.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` naming the first invalid field.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        weekday: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, CodecError> {
        let time = Self {
            year,
            month,
            day,
            weekday,
            hour,
            minute,
            second,
        };
        time.validate()?;
        Ok(time)
    }

    /// Checks every field against the range the device can hold.
    ///
    /// The day is checked against the month length using Gregorian leap
    /// years (divisible by 4, and not by 100 unless also by 400).
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` naming the first invalid field.
    pub fn validate(&self) -> Result<(), CodecError> {
        if !(YEAR_MIN..=YEAR_MAX).contains(&self.year) {
            return Err(CodecError::Validation(Field::Year));
        }
        if !(1..=12).contains(&self.month) {
            return Err(CodecError::Validation(Field::Month));
        }
        if self.day == 0 || !days_valid(self.year, self.month, self.day) {
            return Err(CodecError::Validation(Field::Day));
        }
        if !(1..=7).contains(&self.weekday) {
            return Err(CodecError::Validation(Field::Weekday));
        }
        if self.hour > 23 {
            return Err(CodecError::Validation(Field::Hour));
        }
        if self.minute > 59 {
            return Err(CodecError::Validation(Field::Minute));
        }
        if self.second > 59 {
            return Err(CodecError::Validation(Field::Second));
        }
        Ok(())
    }

    /// Encodes the time into the seven timekeeping registers.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` if any field is out of range.
    pub fn to_registers(&self) -> Result<[u8; 7], CodecError> {
        self.validate()?;

        let mut hours = Hours::default();
        hours.set_time_representation(TimeRepresentation::TwentyFourHour);
        hours.set_hours24(encode_field(self.hour, Field::Hour)?);

        let mut month = Month::default();
        month.set_month(encode_field(self.month, Field::Month)?);

        // validate() bounds year to 2000-2099
        let year = (self.year - YEAR_MIN) as u8;

        Ok([
            encode_field(self.second, Field::Second)?,
            encode_field(self.minute, Field::Minute)?,
            hours.into(),
            self.weekday,
            encode_field(self.day, Field::Day)?,
            month.into(),
            encode_field(year, Field::Year)?,
        ])
    }

    /// Decodes the seven timekeeping registers.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::CorruptedRegister` if a register holds malformed
    /// BCD or a value outside its range.
    pub fn from_registers(raw: &[u8; 7]) -> Result<Self, CodecError> {
        let second = decode_field(raw[0] & 0x7F, raw[0], RegAddr::Seconds, 0..=59)?;
        let minute = decode_field(raw[1] & 0x7F, raw[1], RegAddr::Minutes, 0..=59)?;

        let hours = Hours::from(raw[2]);
        let hour = match hours.time_representation() {
            TimeRepresentation::TwentyFourHour => {
                decode_field(hours.hours24(), raw[2], RegAddr::Hours, 0..=23)?
            }
            TimeRepresentation::TwelveHour => {
                let hour12 = decode_field(hours.hours12(), raw[2], RegAddr::Hours, 1..=12)?;
                hour_from_12(hour12, hours.pm_or_twenty_hours() != 0)
            }
        };

        let weekday = raw[3];
        if !(1..=7).contains(&weekday) {
            return Err(CodecError::CorruptedRegister {
                register: RegAddr::Day,
                value: weekday,
            });
        }

        let day = decode_field(raw[4] & 0x3F, raw[4], RegAddr::Date, 1..=31)?;
        let month_reg = Month::from(raw[5]);
        if month_reg.century() {
            debug!("DS3231: ignoring century flag");
        }
        let month = decode_field(month_reg.month(), raw[5], RegAddr::Month, 1..=12)?;
        let year = YEAR_MIN + u16::from(decode_field(raw[6], raw[6], RegAddr::Year, 0..=99)?);

        if !days_valid(year, month, day) {
            return Err(CodecError::CorruptedRegister {
                register: RegAddr::Date,
                value: raw[4],
            });
        }

        Ok(Self {
            year,
            month,
            day,
            weekday,
            hour,
            minute,
            second,
        })
    }

    /// Converts to a chrono `NaiveDateTime`. The weekday field is not used.
    #[must_use]
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?
        .and_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )
    }
}

impl TryFrom<NaiveDateTime> for CalendarTime {
    type Error = CodecError;

    /// Converts from chrono, deriving the weekday from the date.
    fn try_from(datetime: NaiveDateTime) -> Result<Self, Self::Error> {
        let year = u16::try_from(datetime.year())
            .ok()
            .filter(|y| (YEAR_MIN..=YEAR_MAX).contains(y))
            .ok_or(CodecError::Validation(Field::Year))?;
        // chrono guarantees the remaining fields fit in a u8
        let narrow = |v: u32, field| u8::try_from(v).map_err(|_| CodecError::Validation(field));
        Ok(Self {
            year,
            month: narrow(datetime.month(), Field::Month)?,
            day: narrow(datetime.day(), Field::Day)?,
            weekday: narrow(datetime.weekday().number_from_sunday(), Field::Weekday)?,
            hour: narrow(datetime.hour(), Field::Hour)?,
            minute: narrow(datetime.minute(), Field::Minute)?,
            second: narrow(datetime.second(), Field::Second)?,
        })
    }
}

/// Timekeeping registers of a DS3231.
pub struct Clock<'a, I2C> {
    regs: Registers<'a, I2C>,
}

impl<'a, I2C: I2c> Clock<'a, I2C> {
    /// Creates a clock handle for the DS3231 at `address`.
    pub fn new(i2c: &'a mut I2C, address: u8) -> Self {
        Self {
            regs: Registers::new(i2c, address),
        }
    }

    /// Reads the current time and the oscillator-stop flag.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure or `CodecError::CorruptedRegister`
    /// if the registers do not hold a valid time.
    pub fn read(&mut self) -> Result<ClockReading, Error<I2C::Error>> {
        // Status first: after an oscillator stop the time registers may not
        // decode, and the flag must still be reported.
        let oscillator_stopped = self.regs.status()?.oscillator_stop_flag();
        if oscillator_stopped {
            warn!("DS3231: oscillator stop flag set, time may be invalid");
        }
        let mut raw = [0u8; 7];
        self.regs.read_block(RegAddr::Seconds, &mut raw)?;
        let time = CalendarTime::from_registers(&raw)?;
        debug!("DS3231: time {:?}", time);
        Ok(ClockReading {
            time,
            oscillator_stopped,
        })
    }

    /// Writes `time` to the timekeeping registers in a single transaction,
    /// then clears the oscillator-stop flag.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Validation` (before any bus traffic) if `time` is
    /// invalid, or `Error::I2c` on bus failure.
    pub fn write(&mut self, time: &CalendarTime) -> Result<(), Error<I2C::Error>> {
        let raw = time.to_registers()?;
        debug!("DS3231: set time {:?}", time);
        self.regs.write_block(RegAddr::Seconds, &raw)?;
        self.clear_oscillator_stop()
    }

    /// Returns the oscillator-stop flag.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn oscillator_stopped(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.regs.status()?.oscillator_stop_flag())
    }

    /// Clears the oscillator-stop flag if it is set.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn clear_oscillator_stop(&mut self) -> Result<(), Error<I2C::Error>> {
        let status = self.regs.status()?;
        if !status.oscillator_stop_flag() {
            return Ok(());
        }
        let mut cleared = status.released_flags();
        cleared.set_oscillator_stop_flag(false);
        self.regs.set_status(cleared)
    }

    /// Returns true while a temperature conversion is in progress.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn busy(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.regs.status()?.busy())
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

    fn time(year: u16, month: u8, day: u8) -> CalendarTime {
        CalendarTime {
            year,
            month,
            day,
            weekday: 1,
            hour: 12,
            minute: 0,
            second: 0,
        }
    }

    #[test]
    fn test_validate_month_lengths() {
        assert_eq!(
            time(2024, 4, 31).validate(),
            Err(CodecError::Validation(Field::Day))
        );
        assert_eq!(
            time(2023, 2, 29).validate(),
            Err(CodecError::Validation(Field::Day))
        );
        assert_eq!(time(2024, 2, 29).validate(), Ok(()));
        assert_eq!(time(2000, 2, 29).validate(), Ok(()));
        assert_eq!(time(2024, 12, 31).validate(), Ok(()));
    }

    #[test]
    fn test_validate_names_field() {
        let mut t = time(2024, 1, 1);
        t.year = 2100;
        assert_eq!(t.validate(), Err(CodecError::Validation(Field::Year)));
        let mut t = time(2024, 13, 1);
        assert_eq!(t.validate(), Err(CodecError::Validation(Field::Month)));
        t = time(2024, 1, 0);
        assert_eq!(t.validate(), Err(CodecError::Validation(Field::Day)));
        t = time(2024, 1, 1);
        t.weekday = 8;
        assert_eq!(t.validate(), Err(CodecError::Validation(Field::Weekday)));
        t = time(2024, 1, 1);
        t.hour = 24;
        assert_eq!(t.validate(), Err(CodecError::Validation(Field::Hour)));
        t = time(2024, 1, 1);
        t.minute = 60;
        assert_eq!(t.validate(), Err(CodecError::Validation(Field::Minute)));
        t = time(2024, 1, 1);
        t.second = 60;
        assert_eq!(t.validate(), Err(CodecError::Validation(Field::Second)));
    }

    #[test]
    fn test_to_registers_layout() {
        let t = CalendarTime::new(2024, 3, 14, 5, 15, 30, 7).unwrap();
        assert_eq!(
            t.to_registers().unwrap(),
            [0x07, 0x30, 0x15, 0x05, 0x14, 0x03, 0x24]
        );
    }

    #[test]
    fn test_registers_round_trip_every_date() {
        let mut date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
        let mut count = 0;
        while date <= last {
            let seconds = date.ordinal();
            let dt = date
                .and_hms_opt(seconds % 24, seconds % 60, (seconds * 7) % 60)
                .unwrap();
            let t = CalendarTime::try_from(dt).unwrap();
            let raw = t.to_registers().unwrap();
            assert_eq!(CalendarTime::from_registers(&raw), Ok(t));
            count += 1;
            date = date.succ_opt().unwrap();
        }
        // 100 years, 25 of them leap years
        assert_eq!(count, 36_525);
    }

    #[test]
    fn test_twelve_hour_registers_normalized() {
        // 12:05 AM
        let raw = [0x00, 0x05, 0x52, 0x01, 0x01, 0x01, 0x24];
        assert_eq!(CalendarTime::from_registers(&raw).unwrap().hour, 0);
        // 12:05 PM
        let raw = [0x00, 0x05, 0x72, 0x01, 0x01, 0x01, 0x24];
        assert_eq!(CalendarTime::from_registers(&raw).unwrap().hour, 12);
        // 11 PM
        let raw = [0x00, 0x05, 0x71, 0x01, 0x01, 0x01, 0x24];
        assert_eq!(CalendarTime::from_registers(&raw).unwrap().hour, 23);
        // 9 AM
        let raw = [0x00, 0x05, 0x49, 0x01, 0x01, 0x01, 0x24];
        assert_eq!(CalendarTime::from_registers(&raw).unwrap().hour, 9);
    }

    #[test]
    fn test_century_flag_ignored() {
        let raw = [0x00, 0x00, 0x00, 0x01, 0x01, 0x81, 0x00];
        assert_eq!(CalendarTime::from_registers(&raw).unwrap().year, 2000);
    }

    #[test]
    fn test_corrupted_registers() {
        // Month 0x1A is not BCD
        let raw = [0x00, 0x00, 0x00, 0x01, 0x01, 0x1A, 0x24];
        assert_eq!(
            CalendarTime::from_registers(&raw),
            Err(CodecError::CorruptedRegister {
                register: RegAddr::Month,
                value: 0x1A
            })
        );
        // Month 13
        let raw = [0x00, 0x00, 0x00, 0x01, 0x01, 0x13, 0x24];
        assert!(matches!(
            CalendarTime::from_registers(&raw),
            Err(CodecError::CorruptedRegister {
                register: RegAddr::Month,
                ..
            })
        ));
        // Weekday 0
        let raw = [0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x24];
        assert!(matches!(
            CalendarTime::from_registers(&raw),
            Err(CodecError::CorruptedRegister {
                register: RegAddr::Day,
                ..
            })
        ));
        // 31 April
        let raw = [0x00, 0x00, 0x00, 0x01, 0x31, 0x04, 0x24];
        assert_eq!(
            CalendarTime::from_registers(&raw),
            Err(CodecError::CorruptedRegister {
                register: RegAddr::Date,
                value: 0x31
            })
        );
    }

    #[test]
    fn test_chrono_conversions() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 14)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap();
        let t = CalendarTime::try_from(dt).unwrap();
        // 2024-03-14 was a Thursday
        assert_eq!(t.weekday, 5);
        assert_eq!(t.to_naive_datetime(), Some(dt));

        let too_late = NaiveDate::from_ymd_opt(2100, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            CalendarTime::try_from(too_late),
            Err(CodecError::Validation(Field::Year))
        );
    }

    #[test]
    fn test_read_reports_oscillator_stop() {
        let mut i2c = I2cMock::new(&[
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8],
                vec![0x88],
            ),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Seconds as u8],
                vec![0x00, 0x30, 0x15, 0x05, 0x14, 0x03, 0x24],
            ),
        ]);
        let mut clock = Clock::new(&mut i2c, DEVICE_ADDRESS);

        let reading = clock.read().unwrap();
        assert!(reading.oscillator_stopped);
        assert_eq!(
            reading.time,
            CalendarTime::new(2024, 3, 14, 5, 15, 30, 0).unwrap()
        );
        i2c.done();
    }

    #[test]
    fn test_status_read_before_corrupted_time() {
        let mut i2c = I2cMock::new(&[
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8],
                vec![0x80],
            ),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Seconds as u8],
                vec![0x00, 0x00, 0x00, 0x01, 0x01, 0x1A, 0x24],
            ),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8],
                vec![0x80],
            ),
        ]);
        let mut clock = Clock::new(&mut i2c, DEVICE_ADDRESS);

        assert_eq!(
            clock.read(),
            Err(Error::Codec(CodecError::CorruptedRegister {
                register: RegAddr::Month,
                value: 0x1A
            }))
        );
        assert!(clock.oscillator_stopped().unwrap());
        i2c.done();
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let t = CalendarTime::new(2024, 2, 29, 5, 23, 59, 58).unwrap();
        let raw = t.to_registers().unwrap();
        let mut payload = vec![RegAddr::Seconds as u8];
        payload.extend_from_slice(&raw);

        let mut i2c = I2cMock::new(&[
            I2cTrans::write(DEVICE_ADDRESS, payload),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8],
                vec![0x00],
            ),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8],
                vec![0x00],
            ),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8], raw.to_vec()),
        ]);
        let mut clock = Clock::new(&mut i2c, DEVICE_ADDRESS);

        clock.write(&t).unwrap();
        let reading = clock.read().unwrap();
        assert_eq!(reading.time, t);
        assert!(!reading.oscillator_stopped);
        i2c.done();
    }

    #[test]
    fn test_write_clears_oscillator_stop() {
        let t = CalendarTime::new(2024, 1, 1, 2, 0, 0, 0).unwrap();
        let mut payload = vec![RegAddr::Seconds as u8];
        payload.extend_from_slice(&t.to_registers().unwrap());

        let mut i2c = I2cMock::new(&[
            I2cTrans::write(DEVICE_ADDRESS, payload),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8],
                vec![0x89],
            ),
            I2cTrans::write(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8, 0x0B],
            ),
        ]);
        let mut clock = Clock::new(&mut i2c, DEVICE_ADDRESS);

        clock.write(&t).unwrap();
        i2c.done();
    }

    #[test]
    fn test_invalid_write_issues_no_transaction() {
        let mut i2c = I2cMock::new(&[]);
        let mut clock = Clock::new(&mut i2c, DEVICE_ADDRESS);

        assert_eq!(
            clock.write(&time(2024, 4, 31)),
            Err(Error::Codec(CodecError::Validation(Field::Day)))
        );
        assert_eq!(
            clock.write(&time(2023, 2, 29)),
            Err(Error::Codec(CodecError::Validation(Field::Day)))
        );
        i2c.done();
    }

    #[test]
    fn test_read_propagates_bus_error() {
        let mut i2c = I2cMock::new(&[
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::ControlStatus as u8],
                vec![0x00],
            ),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8], vec![0; 7])
                .with_error(ErrorKind::Other),
        ]);
        let mut clock = Clock::new(&mut i2c, DEVICE_ADDRESS);

        assert_eq!(clock.read(), Err(Error::I2c(ErrorKind::Other)));
        i2c.done();
    }

    #[test]
    fn test_busy_flag() {
        let mut i2c = I2cMock::new(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::ControlStatus as u8],
            vec![0x04],
        )]);
        let mut clock = Clock::new(&mut i2c, DEVICE_ADDRESS);

        assert!(clock.busy().unwrap());
        i2c.done();
    }
}
