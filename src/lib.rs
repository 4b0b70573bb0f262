//! # padcar
//!
//! Drive a Picon Zero RC car from a Linux gamepad.
//!
//! The left stick steers through a servo, the right stick drives the motor,
//! two buttons switch the lights, one button exits and holding another
//! powers the host off.

pub mod actuator;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod power;
