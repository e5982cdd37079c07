//! Host-silence watchdog

use ufmt::{uWrite, uwriteln};

use crate::{
    duty::DutyCycle,
    pwm::{PwmError, PwmOutput},
};

/// Forces a fixed fallback level when no apply happened for too long
///
/// Holds no state of its own: the deadline is measured from the register's last apply, so a
/// fallback apply restarts the countdown just like a host command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleWatchdog {
    max_idle_ms: u32,
    fallback: u16,
}

impl IdleWatchdog {
    /// Watchdog tolerating `max_idle_ms` of silence before applying `fallback`
    #[must_use]
    pub const fn new(max_idle_ms: u32, fallback: u16) -> Self {
        Self {
            max_idle_ms,
            fallback,
        }
    }

    /// Level forced on timeout
    #[must_use]
    pub const fn fallback(&self) -> u16 {
        self.fallback
    }

    /// Check the deadline at `now`, applying the fallback level if it has passed
    ///
    /// Returns whether the watchdog fired.
    ///
    /// # Errors
    /// Propagates a failed fallback apply
    pub fn check<P, W>(
        &self,
        duty: &mut DutyCycle<P>,
        now: u32,
        diag: &mut W,
    ) -> Result<bool, PwmError>
    where
        P: PwmOutput,
        W: uWrite + ?Sized,
    {
        let elapsed = now.wrapping_sub(duty.last_applied_at());
        if elapsed <= self.max_idle_ms {
            return Ok(false);
        }

        uwriteln!(diag, "idle, fallback {}", self.fallback).ok();
        duty.apply(self.fallback, now, diag)?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duty::tests::FakePwm;

    const IDLE: u32 = 5_000;

    fn primed(at: u32) -> DutyCycle<FakePwm> {
        let mut duty = DutyCycle::new(FakePwm::default(), 63);
        duty.apply(63, at, &mut String::new()).unwrap();
        duty
    }

    #[test]
    fn quiet_until_deadline_then_fires_once() {
        let watchdog = IdleWatchdog::new(IDLE, 47);
        let mut duty = primed(1_000);
        let mut diag = String::new();
        assert_eq!(watchdog.fallback(), 47, "fallback level");

        for now in (1_000..=1_000 + IDLE).step_by(10) {
            assert_eq!(watchdog.check(&mut duty, now, &mut diag), Ok(false), "fired at {now}");
        }

        let now = 1_000 + IDLE + 1;
        assert_eq!(watchdog.check(&mut duty, now, &mut diag), Ok(true), "deadline missed");
        assert_eq!(duty.current(), Some(47), "fallback not applied");
        assert_eq!(duty.last_applied_at(), now, "countdown not restarted");

        assert_eq!(
            watchdog.check(&mut duty, now + 1, &mut diag),
            Ok(false),
            "fired again right after fallback"
        );
        assert_eq!(duty.pwm().writes, [63, 47], "unexpected peripheral writes");
        assert_eq!(diag, "idle, fallback 47\nPWM level 47\n", "diagnostics");
    }

    #[test]
    fn repeated_timeouts_refresh_without_reprogramming() {
        let watchdog = IdleWatchdog::new(IDLE, 47);
        let mut duty = primed(0);

        assert_eq!(watchdog.check(&mut duty, IDLE + 1, &mut String::new()), Ok(true), "first");
        assert_eq!(
            watchdog.check(&mut duty, 2 * IDLE + 2, &mut String::new()),
            Ok(true),
            "second"
        );
        assert_eq!(duty.pwm().writes, [63, 47], "same fallback reprogrammed");
    }

    #[test]
    fn survives_clock_rollover() {
        let watchdog = IdleWatchdog::new(IDLE, 47);
        let start = u32::MAX - 100;
        let mut duty = primed(start);

        assert_eq!(
            watchdog.check(&mut duty, start.wrapping_add(IDLE), &mut String::new()),
            Ok(false),
            "rollover tripped the deadline early"
        );
        assert_eq!(
            watchdog.check(&mut duty, start.wrapping_add(IDLE + 1), &mut String::new()),
            Ok(true),
            "rollover hid the deadline"
        );
    }
}
