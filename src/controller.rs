//! Cooperative fan controller tick

use ufmt::{uWrite, uwriteln};

use crate::{
    config::FanConfig,
    duty::DutyCycle,
    protocol::{DecodeStats, Frame},
    pwm::{PwmError, PwmOutput},
    watchdog::IdleWatchdog,
};

/// Fan controller state machine
///
/// Owns the duty register; the decoder and watchdog reach it only through [`Controller::tick`].
pub struct Controller<P> {
    config: FanConfig,
    duty: DutyCycle<P>,
    watchdog: IdleWatchdog,
    stats: DecodeStats,
    started: bool,
}

impl<P> Controller<P>
where
    P: PwmOutput,
{
    /// Build a controller around an unconfigured PWM adapter
    pub const fn new(pwm: P, config: FanConfig) -> Self {
        Self {
            duty: DutyCycle::new(pwm, config.max_level()),
            watchdog: IdleWatchdog::new(config.max_idle_ms, config.fallback_level()),
            stats: DecodeStats {
                received: 0,
                control: 0,
                malformed: 0,
                corrupt: 0,
                levels: 0,
            },
            started: false,
            config,
        }
    }

    /// Configure the PWM channel and spin the fan up to full speed
    ///
    /// Must run before the first [`Controller::tick`]; calling it again does nothing.
    ///
    /// # Errors
    /// Any adapter failure; the caller must not keep running the fan without PWM
    pub fn begin<W>(&mut self, now: u32, diag: &mut W) -> Result<(), PwmError>
    where
        W: uWrite + ?Sized,
    {
        if self.started {
            return Ok(());
        }

        self.duty
            .pwm_mut()
            .configure(self.config.frequency_hz, self.config.resolution_bits)?;
        self.duty.apply(self.config.max_level(), now, diag)?;

        self.started = true;
        Ok(())
    }

    /// Drain every byte `poll` has buffered, then check the idle deadline
    ///
    /// `poll` must not block: it returns [`nb::Error::WouldBlock`] once the receive buffer is
    /// empty. Any other read error also ends the drain for this tick.
    ///
    /// # Errors
    /// Any adapter failure while applying a level
    pub fn tick<E, W>(
        &mut self,
        mut poll: impl FnMut() -> nb::Result<u8, E>,
        diag: &mut W,
        now: u32,
    ) -> Result<(), PwmError>
    where
        W: uWrite + ?Sized,
    {
        while let Ok(byte) = poll() {
            self.receive(byte, diag, now)?;
        }

        self.watchdog.check(&mut self.duty, now, diag)?;

        Ok(())
    }

    /// Decode one byte and act on it
    ///
    /// # Errors
    /// Any adapter failure while applying a level
    pub fn receive<W>(&mut self, byte: u8, diag: &mut W, now: u32) -> Result<(), PwmError>
    where
        W: uWrite + ?Sized,
    {
        uwriteln!(diag, "rx {}", byte).ok();

        let frame = Frame::decode(byte);
        self.stats.record(frame);

        match frame {
            Frame::Control => {
                uwriteln!(diag, "PWM ctrl").ok();
            }
            Frame::Level(level) => {
                self.duty.apply(u16::from(level), now, diag)?;
            }
            Frame::Malformed(_) | Frame::Corrupt(_) => {}
        }

        Ok(())
    }

    /// The applied duty level, once [`Controller::begin`] has run
    #[must_use]
    pub const fn level(&self) -> Option<u16> {
        self.duty.current()
    }

    /// Access the duty register (read-only)
    #[must_use]
    pub const fn duty(&self) -> &DutyCycle<P> {
        &self.duty
    }

    /// Decoder counters
    #[must_use]
    pub const fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &FanConfig {
        &self.config
    }
}
