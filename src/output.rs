//! INT/SQW and 32kHz output control.
//!
//! The INT/SQW pin is shared between the square-wave generator and the alarm
//! interrupt output. Selecting a square-wave frequency hands the pin to the
//! generator and disables both alarm interrupts; [`SquareWave::Off`] hands it
//! back to the interrupt logic without touching the enable bits.

use embedded_hal::i2c::I2c;

use crate::error::Error;
use crate::registers::{Control, InterruptControl, Registers, SquareWaveFrequency};

/// INT/SQW pin setting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWave {
    /// Pin drives the alarm interrupt (INTCN = 1)
    Off,
    /// 1 Hz
    Hz1,
    /// 1.024 kHz
    Hz1024,
    /// 4.096 kHz
    Hz4096,
    /// 8.192 kHz
    Hz8192,
}

impl SquareWave {
    fn frequency(self) -> Option<SquareWaveFrequency> {
        match self {
            SquareWave::Off => None,
            SquareWave::Hz1 => Some(SquareWaveFrequency::Hz1),
            SquareWave::Hz1024 => Some(SquareWaveFrequency::Hz1024),
            SquareWave::Hz4096 => Some(SquareWaveFrequency::Hz4096),
            SquareWave::Hz8192 => Some(SquareWaveFrequency::Hz8192),
        }
    }

    fn from_control(control: Control) -> Self {
        match (control.interrupt_control(), control.square_wave_frequency()) {
            (InterruptControl::Interrupt, _) => SquareWave::Off,
            (InterruptControl::SquareWave, SquareWaveFrequency::Hz1) => SquareWave::Hz1,
            (InterruptControl::SquareWave, SquareWaveFrequency::Hz1024) => SquareWave::Hz1024,
            (InterruptControl::SquareWave, SquareWaveFrequency::Hz4096) => SquareWave::Hz4096,
            (InterruptControl::SquareWave, SquareWaveFrequency::Hz8192) => SquareWave::Hz8192,
        }
    }
}

/// Output pin control of a DS3231.
pub struct Outputs<'a, I2C> {
    regs: Registers<'a, I2C>,
}

impl<'a, I2C: I2c> Outputs<'a, I2C> {
    /// Creates an output handle for the DS3231 at `address`.
    pub fn new(i2c: &'a mut I2C, address: u8) -> Self {
        Self {
            regs: Registers::new(i2c, address),
        }
    }

    /// Configures the INT/SQW pin with one control register update.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn set_square_wave(&mut self, wave: SquareWave) -> Result<(), Error<I2C::Error>> {
        let control = self.regs.modify_control(|control| match wave.frequency() {
            None => control.set_interrupt_control(InterruptControl::Interrupt),
            Some(frequency) => {
                control.set_interrupt_control(InterruptControl::SquareWave);
                control.set_square_wave_frequency(frequency);
                control.set_alarm1_interrupt_enable(false);
                control.set_alarm2_interrupt_enable(false);
            }
        })?;
        debug!("DS3231: square wave {:?}, control {:?}", wave, u8::from(control));
        Ok(())
    }

    /// Returns the current INT/SQW pin setting.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn square_wave(&mut self) -> Result<SquareWave, Error<I2C::Error>> {
        Ok(SquareWave::from_control(self.regs.control()?))
    }

    /// Keeps the square wave running on battery power (BBSQW).
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn set_battery_backed_square_wave(
        &mut self,
        enabled: bool,
    ) -> Result<(), Error<I2C::Error>> {
        self.regs
            .modify_control(|control| control.set_battery_backed_square_wave(enabled))?;
        Ok(())
    }

    /// Enables or disables the 32kHz output pin. Alarm flags are preserved.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn set_32khz_output(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.regs
            .modify_status(|status| status.set_enable_32khz_output(enabled))?;
        Ok(())
    }

    /// Returns true if the 32kHz output pin is enabled.
    ///
    /// # Errors
    ///
    /// Returns `Error::I2c` on bus failure.
    pub fn is_32khz_output_enabled(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.regs.status()?.enable_32khz_output())
    }
}
