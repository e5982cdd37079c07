//! Parity check bit carried by level frames

/// Position of the parity flag within a level frame
pub const PARITY_FLAG: u8 = 0b0100_0000;

const DATA_MASK: u8 = 0b0111_1111;

/// Compute the parity flag for the low 7 bits of `value`
///
/// The flag is set when the data bits hold an even number of ones and clear otherwise, so a
/// level frame (data plus flag) always carries an odd count of ones and the all-zero byte can
/// never pass as a valid level. The returned value is already shifted into [`PARITY_FLAG`]
/// position and can be OR-ed straight into a frame.
#[must_use]
pub const fn parity_bit(value: u8) -> u8 {
    if (value & DATA_MASK).count_ones() % 2 == 0 {
        PARITY_FLAG
    } else {
        0
    }
}

/// Whether `flag` (already masked to [`PARITY_FLAG`]) is the right check bit for `data`
#[must_use]
pub const fn check(data: u8, flag: u8) -> bool {
    parity_bit(data) == flag & PARITY_FLAG
}
