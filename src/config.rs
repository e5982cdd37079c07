//! Tunables for the fan controller

use ufmt::derive::uDebug;

/// Baud rate of the host link; the host service opens the port as 115200 8N1
pub const BAUD_RATE: u32 = 115_200;

/// Static configuration of the single fan channel
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub struct FanConfig {
    /// PWM carrier frequency
    pub frequency_hz: u32,
    /// Number of bits in a duty level; levels span `0..=2^bits - 1`
    pub resolution_bits: u8,
    /// Longest tolerated host silence before the fallback level is forced
    pub max_idle_ms: u32,
    /// Pause between two controller ticks
    pub poll_interval_ms: u32,
}

/// Reasons a [`FanConfig`] cannot be used
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Frequency of zero
    ZeroFrequency,
    /// Resolution outside `1..=15` bits
    Resolution,
    /// Ticks are too sparse to notice the idle deadline in time
    PollTooSlow,
}

impl FanConfig {
    /// 25 kHz 4-wire fan PWM with 6-bit levels
    pub const DEFAULT: Self = Self {
        frequency_hz: 25_000,
        resolution_bits: 6,
        max_idle_ms: 5_000,
        poll_interval_ms: 10,
    };

    /// Highest duty level, i.e. a fully-on output
    #[must_use]
    pub const fn max_level(&self) -> u16 {
        if self.resolution_bits >= 16 {
            return u16::MAX;
        }
        (1 << self.resolution_bits) - 1
    }

    /// Level the watchdog falls back to: three quarters of [`Self::max_level`], rounded down
    #[must_use]
    pub const fn fallback_level(&self) -> u16 {
        self.max_level() * 3 / 4
    }

    /// Check the configuration for values the controller cannot honour
    ///
    /// # Errors
    /// Returns the first problem found
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if self.resolution_bits == 0 || self.resolution_bits > 15 {
            return Err(ConfigError::Resolution);
        }
        if self.poll_interval_ms.saturating_mul(2) > self.max_idle_ms {
            return Err(ConfigError::PollTooSlow);
        }
        Ok(())
    }
}

impl Default for FanConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_levels() {
        let config = FanConfig::DEFAULT;
        assert_eq!(config.max_level(), 63, "6-bit maximum");
        assert_eq!(config.fallback_level(), 47, "63 * 3 / 4 rounds down");
        assert_eq!(config.validate(), Ok(()), "default must be usable");
    }

    #[test]
    fn rejects_unusable_values() {
        let base = FanConfig::DEFAULT;

        let config = FanConfig { frequency_hz: 0, ..base };
        assert_eq!(config.validate(), Err(ConfigError::ZeroFrequency), "zero Hz");

        let config = FanConfig { resolution_bits: 0, ..base };
        assert_eq!(config.validate(), Err(ConfigError::Resolution), "zero bits");

        let config = FanConfig { resolution_bits: 16, ..base };
        assert_eq!(config.validate(), Err(ConfigError::Resolution), "sentinel collides");

        let config = FanConfig { poll_interval_ms: 3_000, ..base };
        assert_eq!(config.validate(), Err(ConfigError::PollTooSlow), "poll vs idle");
    }
}
