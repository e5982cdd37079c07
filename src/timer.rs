//! Timer1 register access for the fan's PWM output

use arduino_hal::{
    hal::port::PB5,
    pac::TC1,
    port::{
        mode::{Floating, Input, Output},
        Pin,
    },
};
use fanlink::pwm::TimerRegisters;

/// [TC1] channel A, driving [PB5] (board pin D9)
///
/// The pin is an output from construction on but stays a plain low GPIO until
/// [`TimerRegisters::enable_output`] connects the compare unit to it
pub struct Timer1 {
    tc1: TC1,
    _pin: Pin<Output, PB5>,
}

impl Timer1 {
    /// Take ownership of the timer and its output pin so nothing else can claim them
    #[must_use]
    pub fn new(tc1: TC1, d9: Pin<Input<Floating>, PB5>) -> Self {
        Self {
            tc1,
            _pin: d9.into_output(),
        }
    }
}

impl TimerRegisters for Timer1 {
    fn masked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        avr_device::interrupt::free(|_| f(self))
    }

    fn stop(&mut self) {
        self.tc1.tccr1b().modify(|_, w| w.cs1().no_clock());
        self.tc1.tcnt1().reset();
    }

    fn set_waveform_mode(&mut self) {
        // WGM1 = 0b1010: phase-correct PWM, TOP = ICR1
        self.tc1.tccr1a().modify(|_, w| w.wgm1().set(0b10));
        self.tc1.tccr1b().modify(|_, w| w.wgm1().set(0b10));
    }

    fn set_top(&mut self, top: u16) {
        self.tc1.icr1().write(|w| w.set(top));
    }

    fn set_compare(&mut self, compare: u16) {
        self.tc1.ocr1a().write(|w| w.set(compare));
    }

    fn enable_output(&mut self) {
        self.tc1.tccr1a().modify(|_, w| w.com1a().match_clear());
    }

    fn start(&mut self) {
        self.tc1.tccr1b().modify(|_, w| w.cs1().direct());
    }
}
