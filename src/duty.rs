//! Duty cycle register: the single owner of the applied fan level

use ufmt::{uWrite, uwriteln};

use crate::pwm::{PwmError, PwmOutput};

/// Marker for "no level applied yet"; outside every valid level so the first apply always
/// reaches the peripheral
const UNSET: u16 = 0xFFFF;

/// Last applied duty level and when it was last (re)confirmed
///
/// [`DutyCycle::apply`] is the only way to change either field.
pub struct DutyCycle<P> {
    pwm: P,
    max_level: u16,
    current: u16,
    last_applied_at: u32,
}

impl<P> DutyCycle<P>
where
    P: PwmOutput,
{
    /// Take ownership of an already configured PWM adapter whose levels top out at `max_level`
    pub const fn new(pwm: P, max_level: u16) -> Self {
        Self {
            pwm,
            max_level,
            current: UNSET,
            last_applied_at: 0,
        }
    }

    /// Apply `level` at time `now` (milliseconds)
    ///
    /// The timestamp is refreshed on every call, even when the level is unchanged: it tracks
    /// host liveness, not output changes. The peripheral is only programmed when the level
    /// differs from the current one. Levels above the maximum are clamped.
    ///
    /// Returns whether the peripheral was programmed.
    ///
    /// # Errors
    /// Propagates the adapter's failure; `current` is left untouched in that case
    pub fn apply<W>(&mut self, level: u16, now: u32, diag: &mut W) -> Result<bool, PwmError>
    where
        W: uWrite + ?Sized,
    {
        let level = level.min(self.max_level);

        self.last_applied_at = now;

        if level == self.current {
            return Ok(false);
        }

        self.pwm.write(level)?;
        self.current = level;

        uwriteln!(diag, "PWM level {}", level).ok();

        Ok(true)
    }

    /// The applied level, or `None` before the first successful apply
    #[must_use]
    pub const fn current(&self) -> Option<u16> {
        if self.current == UNSET {
            None
        } else {
            Some(self.current)
        }
    }

    /// Timestamp of the last apply, changed or not
    #[must_use]
    pub const fn last_applied_at(&self) -> u32 {
        self.last_applied_at
    }

    /// Highest level accepted without clamping
    #[must_use]
    pub const fn max_level(&self) -> u16 {
        self.max_level
    }

    /// Access the PWM adapter for configuration; levels still only change through `apply`
    pub(crate) fn pwm_mut(&mut self) -> &mut P {
        &mut self.pwm
    }

    /// Access the PWM adapter (read-only)
    #[must_use]
    pub const fn pwm(&self) -> &P {
        &self.pwm
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Adapter that remembers every level it was asked to output
    #[derive(Default)]
    pub(crate) struct FakePwm {
        pub configured: Option<(u32, u8)>,
        pub writes: Vec<u16>,
        pub fail: Option<PwmError>,
    }

    impl PwmOutput for FakePwm {
        fn configure(&mut self, frequency_hz: u32, resolution_bits: u8) -> Result<(), PwmError> {
            if let Some(err) = self.fail {
                return Err(err);
            }
            self.configured = Some((frequency_hz, resolution_bits));
            Ok(())
        }

        fn write(&mut self, level: u16) -> Result<(), PwmError> {
            if let Some(err) = self.fail {
                return Err(err);
            }
            self.writes.push(level);
            Ok(())
        }
    }

    #[test]
    fn repeated_level_programs_once() {
        let mut duty = DutyCycle::new(FakePwm::default(), 63);
        let mut diag = String::new();

        assert_eq!(duty.apply(12, 100, &mut diag), Ok(true), "first apply programs");
        assert_eq!(duty.apply(12, 250, &mut diag), Ok(false), "same level is a no-op");

        assert_eq!(duty.pwm().writes, [12], "peripheral programmed twice");
        assert_eq!(duty.last_applied_at(), 250, "timestamp not refreshed on no-op");
        assert_eq!(diag, "PWM level 12\n", "one diagnostic per change");
    }

    #[test]
    fn first_apply_is_never_skipped() {
        for level in [0, 63] {
            let mut duty = DutyCycle::new(FakePwm::default(), 63);
            assert_eq!(duty.current(), None, "fresh register claims a level");
            duty.apply(level, 0, &mut String::new()).unwrap();
            assert_eq!(duty.pwm().writes, [level], "first apply of {level} skipped");
            assert_eq!(duty.current(), Some(level), "current not recorded");
        }
    }

    #[test]
    fn out_of_range_levels_clamp() {
        let mut duty = DutyCycle::new(FakePwm::default(), 63);
        duty.apply(200, 0, &mut String::new()).unwrap();
        assert_eq!(duty.current(), Some(duty.max_level()), "level not clamped");
    }

    #[test]
    fn failed_write_keeps_previous_level() {
        let mut duty = DutyCycle::new(FakePwm::default(), 63);
        duty.apply(30, 0, &mut String::new()).unwrap();

        duty.pwm.fail = Some(PwmError::Peripheral);
        assert_eq!(
            duty.apply(40, 10, &mut String::new()),
            Err(PwmError::Peripheral),
            "error swallowed"
        );
        assert_eq!(duty.current(), Some(30), "level changed despite failed write");
    }
}
