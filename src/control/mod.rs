//! # Control Module
//!
//! Turns controller events into actuator commands.
//!
//! This module handles:
//! - Stick value to servo angle and motor speed conversion ([`range`])
//! - Hold-to-confirm detection for the shutdown button ([`hold`])
//! - The event loop driving the car ([`control_loop`])

pub mod control_loop;
pub mod hold;
pub mod range;
