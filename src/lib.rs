//! Serial-commanded PWM fan controller
//!
//! The host sends single-byte frames over a serial link (see [`protocol`]); valid level frames
//! set the fan's duty cycle through [`duty::DutyCycle`], and [`watchdog::IdleWatchdog`] drops
//! the fan to a safe level if the host goes quiet. Everything here is hardware-agnostic; the
//! board binary supplies a [`pwm::PwmOutput`], a millisecond clock and the serial port.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod controller;
pub mod duty;
pub mod parity;
pub mod protocol;
pub mod pwm;
pub mod watchdog;

pub use crate::{
    config::FanConfig,
    controller::Controller,
    protocol::Frame,
    pwm::{PwmError, PwmOutput},
};
