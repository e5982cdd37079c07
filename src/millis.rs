//! Millisecond clock driven by Timer0

use core::cell::Cell;

use arduino_hal::{clock::Clock, pac::TC0, DefaultClock};
use avr_device::interrupt::Mutex;

const PRESCALER: u32 = 64;
const TIMER_COUNTS: u32 = DefaultClock::FREQ / PRESCALER / 1000;

static MILLIS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

#[expect(clippy::allow_attributes, reason = "expect somehow doesn't work")]
#[allow(missing_docs, reason = "macro expansion breaks doc comments")]
mod internal {
    use super::MILLIS;

    #[avr_device::interrupt(atmega32u4)]
    fn TIMER0_COMPA() {
        avr_device::interrupt::free(|cs| {
            let cell = MILLIS.borrow(cs);
            cell.set(cell.get().wrapping_add(1));
        });
    }
}

/// Run Timer0 in CTC mode so it fires once per millisecond
///
/// Interrupts must be enabled afterwards for the clock to advance
pub fn init_millis(tc0: &TC0) {
    tc0.tccr0a().write(|w| w.wgm0().ctc());
    tc0.ocr0a().write(|w| w.set((TIMER_COUNTS - 1) as u8));
    tc0.tccr0b().write(|w| w.cs0().prescale_64());
    tc0.timsk0().write(|w| w.ocie0a().set_bit());

    avr_device::interrupt::free(|cs| {
        MILLIS.borrow(cs).set(0);
    });
}

/// Milliseconds since [`init_millis`]; wraps after about 49.7 days
#[must_use]
pub fn millis() -> u32 {
    avr_device::interrupt::free(|cs| MILLIS.borrow(cs).get())
}
