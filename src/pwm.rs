//! PWM peripheral adapters
//!
//! Two realizations sit behind [`PwmOutput`]:
//! - [`RegisterPwm`] programs a 16-bit timer register by register through [`TimerRegisters`]
//! - [`HalPwm`] hands levels to a HAL channel implementing [`SetDutyCycle`], which already
//!   serializes its own mode/duty setup
//!
//! The firmware picks one at build time.

use embedded_hal::pwm::SetDutyCycle;
use ufmt::derive::uDebug;

/// Failures reported by a PWM adapter
///
/// None of these are recoverable for a fan controller; the firmware halts on any of them
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum PwmError {
    /// The channel was already configured and is owned elsewhere
    AlreadyConfigured,
    /// A level was written before [`PwmOutput::configure`] succeeded
    NotConfigured,
    /// The timer cannot produce the requested frequency
    UnsupportedFrequency,
    /// The timer period is too short to resolve the requested number of levels
    UnsupportedResolution,
    /// A level above the configured maximum
    LevelOutOfRange,
    /// The underlying HAL channel reported an error
    Peripheral,
}

/// A single PWM output channel
pub trait PwmOutput {
    /// Claim the channel and set its frequency and level resolution
    ///
    /// Must succeed exactly once, before the first [`PwmOutput::write`]
    ///
    /// # Errors
    /// See [`PwmError`]
    fn configure(&mut self, frequency_hz: u32, resolution_bits: u8) -> Result<(), PwmError>;

    /// Output `level / (2^resolution_bits - 1)` of the period as active
    ///
    /// # Errors
    /// See [`PwmError`]
    fn write(&mut self, level: u16) -> Result<(), PwmError>;
}

/// Levels spanned by `resolution_bits`, or `None` if the count is unusable
const fn max_level(resolution_bits: u8) -> Option<u16> {
    if resolution_bits == 0 || resolution_bits > 15 {
        None
    } else {
        Some((1 << resolution_bits) - 1)
    }
}

/// Register-level steps of a timer running phase-correct PWM with a programmable TOP
///
/// The steps are only ever invoked by [`RegisterPwm`], inside [`TimerRegisters::masked`] and in
/// declaration order. Some timers (ATmega TC1 among them) only double-buffer the compare
/// register once a PWM waveform mode is active, so the compare value must not be written
/// before the mode and TOP are in place or a stale value gets latched.
pub trait TimerRegisters {
    /// Run `f` with interrupts disabled
    fn masked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R;

    /// Stop the counter clock and reset the count
    fn stop(&mut self);

    /// Select phase-correct PWM with TOP taken from the period register
    fn set_waveform_mode(&mut self);

    /// Write the period (TOP) register
    fn set_top(&mut self, top: u16);

    /// Write the output compare (duty) register
    fn set_compare(&mut self, compare: u16);

    /// Route the compare match to the output pin
    fn enable_output(&mut self);

    /// Restart the counter clock
    fn start(&mut self);
}

/// [`PwmOutput`] that programs a timer directly
///
/// `configure` only validates and stages the period; every `write` reprograms the whole
/// register set in one masked critical section so no interrupt handler or the timer itself
/// ever observes a half-written configuration.
pub struct RegisterPwm<T> {
    timer: T,
    clock_hz: u32,
    top: Option<u16>,
    max_level: u16,
}

impl<T> RegisterPwm<T>
where
    T: TimerRegisters,
{
    /// Wrap a timer counting at `clock_hz`
    pub const fn new(timer: T, clock_hz: u32) -> Self {
        Self {
            timer,
            clock_hz,
            top: None,
            max_level: 0,
        }
    }

    /// Period register value in use, once configured
    #[must_use]
    pub const fn top(&self) -> Option<u16> {
        self.top
    }

    /// Give the timer back
    #[must_use]
    pub fn release(self) -> T {
        self.timer
    }
}

impl<T> PwmOutput for RegisterPwm<T>
where
    T: TimerRegisters,
{
    fn configure(&mut self, frequency_hz: u32, resolution_bits: u8) -> Result<(), PwmError> {
        if self.top.is_some() {
            return Err(PwmError::AlreadyConfigured);
        }

        // Phase-correct mode counts up then down, so one period is 2 * TOP ticks
        let top = self
            .clock_hz
            .checked_div(frequency_hz.saturating_mul(2))
            .filter(|&top| top > 0)
            .and_then(|top| u16::try_from(top).ok())
            .ok_or(PwmError::UnsupportedFrequency)?;

        let max_level = max_level(resolution_bits)
            .filter(|&max| max <= top)
            .ok_or(PwmError::UnsupportedResolution)?;

        self.top = Some(top);
        self.max_level = max_level;
        Ok(())
    }

    fn write(&mut self, level: u16) -> Result<(), PwmError> {
        let top = self.top.ok_or(PwmError::NotConfigured)?;
        if level > self.max_level {
            return Err(PwmError::LevelOutOfRange);
        }

        let compare = (u32::from(level) * u32::from(top) / u32::from(self.max_level)) as u16;

        self.timer.masked(|timer| {
            timer.stop();
            timer.set_waveform_mode();
            timer.set_top(top);
            timer.set_compare(compare);
            timer.enable_output();
            timer.start();
        });

        Ok(())
    }
}

/// [`PwmOutput`] on top of an `embedded-hal` PWM channel
///
/// The HAL fixes the carrier frequency when the channel is built, so `configure` only accepts
/// that frequency.
pub struct HalPwm<P> {
    channel: P,
    frequency_hz: u32,
    max_level: Option<u16>,
}

impl<P> HalPwm<P>
where
    P: SetDutyCycle,
{
    /// Wrap a channel the HAL has already set up to run at `frequency_hz`
    pub const fn new(channel: P, frequency_hz: u32) -> Self {
        Self {
            channel,
            frequency_hz,
            max_level: None,
        }
    }

    /// Give the channel back
    #[must_use]
    pub fn release(self) -> P {
        self.channel
    }
}

impl<P> PwmOutput for HalPwm<P>
where
    P: SetDutyCycle,
{
    fn configure(&mut self, frequency_hz: u32, resolution_bits: u8) -> Result<(), PwmError> {
        if self.max_level.is_some() {
            return Err(PwmError::AlreadyConfigured);
        }
        if frequency_hz != self.frequency_hz {
            return Err(PwmError::UnsupportedFrequency);
        }

        let max_level = max_level(resolution_bits)
            .filter(|&max| max <= self.channel.max_duty_cycle())
            .ok_or(PwmError::UnsupportedResolution)?;

        self.max_level = Some(max_level);
        Ok(())
    }

    fn write(&mut self, level: u16) -> Result<(), PwmError> {
        let max_level = self.max_level.ok_or(PwmError::NotConfigured)?;
        if level > max_level {
            return Err(PwmError::LevelOutOfRange);
        }

        self.channel
            .set_duty_cycle_fraction(level, max_level)
            .map_err(|_| PwmError::Peripheral)
    }
}
