//! Serial-commanded fan PWM controller firmware for the Arduino Micro
//!
//! Off-target (host) builds produce an empty binary; the firmware itself only exists for AVR
//!
//! # Pin Configuration
//!
//! - `PB5` (D9): fan PWM, Timer1 channel A
//! - `PD2` (D0): host link RX, USART1
//! - `PD3` (D1): host link TX, USART1
#![cfg_attr(target_arch = "avr", no_std, no_main, feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
use arduino_hal::{entry, prelude::*, usart::BaudrateArduinoExt, Peripherals};
#[cfg(target_arch = "avr")]
use embedded_hal::delay::DelayNs;
#[cfg(target_arch = "avr")]
use fanlink::{
    config::{FanConfig, BAUD_RATE},
    Controller,
};
#[cfg(target_arch = "avr")]
use panic_halt as _;
#[cfg(target_arch = "avr")]
use ufmt::{uDebug, uWrite, uwriteln};

#[cfg(target_arch = "avr")]
pub mod millis;
#[cfg(target_arch = "avr")]
pub mod timer;

#[cfg(target_arch = "avr")]
use crate::millis::{init_millis, millis};

#[cfg(all(target_arch = "avr", not(feature = "simple-pwm")))]
const FAN_CONFIG: FanConfig = FanConfig::DEFAULT;

/// Timer1 under `simple_pwm` runs 8-bit fast PWM: 16 MHz / 64 / 256
#[cfg(all(target_arch = "avr", feature = "simple-pwm"))]
const FAN_CONFIG: FanConfig = FanConfig {
    frequency_hz: 976,
    ..FanConfig::DEFAULT
};

/// Report `err` to the host and stop for good
///
/// Running the fan without confirmed PWM is worse than not running at all
#[cfg(target_arch = "avr")]
fn halt<E, W>(err: E, diag: &mut W) -> !
where
    E: uDebug,
    W: uWrite,
{
    uwriteln!(diag, "fatal: {:?}", err).ok();
    avr_device::interrupt::disable();
    loop {
        avr_device::asm::sleep();
    }
}

#[cfg(target_arch = "avr")]
#[entry]
fn main() -> ! {
    let periphs = Peripherals::take().unwrap();
    let pins = arduino_hal::hal::Pins::new(
        periphs.PORTB,
        periphs.PORTC,
        periphs.PORTD,
        periphs.PORTE,
        periphs.PORTF,
    );

    // Disable USB controller to prevent the production of spurious interrupts
    periphs.USB_DEVICE.usbcon().reset();

    init_millis(&periphs.TC0);

    let serial = arduino_hal::Usart::new(
        periphs.USART1,
        pins.pd2,
        pins.pd3.into_output(),
        BAUD_RATE.into_baudrate(),
    );
    let (mut rx, mut tx) = serial.split();

    #[cfg(not(feature = "simple-pwm"))]
    let pwm = {
        use arduino_hal::clock::Clock;

        fanlink::pwm::RegisterPwm::new(
            timer::Timer1::new(periphs.TC1, pins.pb5),
            arduino_hal::DefaultClock::FREQ,
        )
    };

    #[cfg(feature = "simple-pwm")]
    let pwm = {
        use arduino_hal::simple_pwm::{IntoPwmPin, Prescaler, Timer1Pwm};
        use embedded_hal::pwm::SetDutyCycle;

        let timer1 = Timer1Pwm::new(periphs.TC1, Prescaler::Prescale64);
        let mut d9 = pins.pb5.into_output().into_pwm(&timer1);
        // Full speed from the first PWM cycle; `begin` confirms the same level
        SetDutyCycle::set_duty_cycle_fully_on(&mut d9).ok();
        d9.enable();
        fanlink::pwm::HalPwm::new(d9, FAN_CONFIG.frequency_hz)
    };

    if let Err(err) = FAN_CONFIG.validate() {
        halt(err, &mut tx);
    }

    let mut controller = Controller::new(pwm, FAN_CONFIG);

    // Safety: not called inside avr_device::interrupt::free
    unsafe { avr_device::interrupt::enable() };

    if let Err(err) = controller.begin(millis(), &mut tx) {
        halt(err, &mut tx);
    }

    let mut delay = arduino_hal::Delay::new();

    loop {
        if let Err(err) = controller.tick(|| rx.read(), &mut tx, millis()) {
            halt(err, &mut tx);
        }

        DelayNs::delay_ms(&mut delay, FAN_CONFIG.poll_interval_ms);
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
