//! Single-byte host command protocol
//!
//! | Byte          | Meaning                                               |
//! |---------------|-------------------------------------------------------|
//! | `1_0000000`   | Control frame; answered with `PWM ctrl`               |
//! | `1_xxxxxxx`   | Malformed control frame (any `x` set); dropped        |
//! | `0_p_llllll`  | Level frame: 6-bit level `l` with parity flag `p`     |
//!
//! Every byte is a complete frame, so there is no framing state to resynchronize.

use ufmt::derive::uDebug;

use crate::parity::{check, parity_bit, PARITY_FLAG};

const REQUEST_BIT: u8 = 0b1000_0000;
const LEVEL_MASK: u8 = 0b0011_1111;

/// Highest level a frame can carry
pub const MAX_FRAME_LEVEL: u8 = LEVEL_MASK;

/// One decoded byte from the host
#[derive(Debug, uDebug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The reserved control marker, `0x80`
    Control,
    /// Request bit set with a non-zero payload; unknown, dropped
    Malformed(u8),
    /// Level frame whose parity flag checks out
    Level(u8),
    /// Level frame with the wrong parity flag; dropped
    Corrupt(u8),
}

impl Frame {
    /// Classify one received byte
    #[must_use]
    pub const fn decode(byte: u8) -> Self {
        if byte & REQUEST_BIT != 0 {
            return match byte & !REQUEST_BIT {
                0 => Self::Control,
                _ => Self::Malformed(byte),
            };
        }

        let level = byte & LEVEL_MASK;
        if check(level, byte & PARITY_FLAG) {
            Self::Level(level)
        } else {
            Self::Corrupt(byte)
        }
    }

    /// Wire byte commanding `level`, clamped to [`MAX_FRAME_LEVEL`]
    #[must_use]
    pub const fn encode_level(level: u8) -> u8 {
        let level = if level > MAX_FRAME_LEVEL {
            MAX_FRAME_LEVEL
        } else {
            level
        };
        level | parity_bit(level)
    }

    /// Wire byte for a duty fraction in `[0.0, 1.0]`; out-of-range input is clamped and the
    /// level rounds down
    #[must_use]
    pub fn encode_fraction(fraction: f32) -> u8 {
        let level = (fraction.clamp(0.0, 1.0) * f32::from(MAX_FRAME_LEVEL)) as u8;
        Self::encode_level(level)
    }

    /// Wire byte of the control marker
    #[must_use]
    pub const fn control() -> u8 {
        REQUEST_BIT
    }
}

/// Running totals of what the decoder has seen
///
/// Purely observational; dropped frames stay dropped whatever these say
#[derive(Debug, uDebug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Bytes classified
    pub received: u32,
    /// Control markers
    pub control: u32,
    /// Malformed control frames dropped
    pub malformed: u32,
    /// Level frames dropped on parity
    pub corrupt: u32,
    /// Level frames forwarded
    pub levels: u32,
}

impl DecodeStats {
    /// Count one decoded frame
    pub fn record(&mut self, frame: Frame) {
        self.received = self.received.saturating_add(1);
        let counter = match frame {
            Frame::Control => &mut self.control,
            Frame::Malformed(_) => &mut self.malformed,
            Frame::Level(_) => &mut self.levels,
            Frame::Corrupt(_) => &mut self.corrupt,
        };
        *counter = counter.saturating_add(1);
    }
}
