//! # Actuator Module
//!
//! The outputs of the car: steering servo, drive motor and two lights.
//!
//! This module handles:
//! - The [`Actuators`] trait the control loop drives
//! - Wiring of vehicle functions to board channels ([`ChannelMap`])
//! - The Picon Zero I2C driver
//! - Start-up self tests

pub mod picon_zero;
pub mod self_test;

use crate::config::BoardConfig;
use crate::error::Result;
use crate::lifecycle::Release;

/// How a board channel is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// On/off output
    Digital,
    /// Hobby servo, commanded in degrees
    Servo,
    /// Bidirectional motor, commanded in `[-1, 1]`
    Motor,
}

/// A single command for the actuator set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCommand {
    SetServoAngle { channel: u8, degrees: i32 },
    SetDigitalOutput { channel: u8, on: bool },
    SetMotorSpeed { channel: u8, speed: f32 },
}

/// Set of actuator channels on one board.
///
/// `release` (from [`Release`]) must be safe to call after a partially
/// failed `configure` and more than once.
pub trait Actuators: Release {
    /// Declares how `channel` will be driven. Called once per channel at start-up.
    fn configure(&mut self, channel: u8, kind: OutputKind) -> Result<()>;

    /// Moves a servo channel to `degrees`.
    fn set_servo_angle(&mut self, channel: u8, degrees: i32) -> Result<()>;

    /// Switches a digital channel.
    fn set_digital_output(&mut self, channel: u8, on: bool) -> Result<()>;

    /// Drives a motor channel at `speed` in `[-1, 1]`.
    fn set_motor_speed(&mut self, channel: u8, speed: f32) -> Result<()>;

    /// Returns every configured channel to a safe default: motors stopped,
    /// digital outputs off, servos centred.
    fn reset(&mut self) -> Result<()>;

    /// Dispatches an [`ActuatorCommand`].
    fn command(&mut self, command: ActuatorCommand) -> Result<()> {
        match command {
            ActuatorCommand::SetServoAngle { channel, degrees } => {
                self.set_servo_angle(channel, degrees)
            }
            ActuatorCommand::SetDigitalOutput { channel, on } => {
                self.set_digital_output(channel, on)
            }
            ActuatorCommand::SetMotorSpeed { channel, speed } => {
                self.set_motor_speed(channel, speed)
            }
        }
    }
}

/// Board channels used for each vehicle function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMap {
    pub servo: u8,
    pub motor: u8,
    pub light_1: u8,
    pub light_2: u8,
}

impl ChannelMap {
    /// Channels paired with their kind, in configuration order.
    #[must_use]
    pub fn outputs(&self) -> [(u8, OutputKind); 4] {
        [
            (self.servo, OutputKind::Servo),
            (self.light_1, OutputKind::Digital),
            (self.light_2, OutputKind::Digital),
            (self.motor, OutputKind::Motor),
        ]
    }
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::from(&BoardConfig::default())
    }
}

impl From<&BoardConfig> for ChannelMap {
    fn from(board: &BoardConfig) -> Self {
        Self {
            servo: board.servo_channel,
            motor: board.motor_channel,
            light_1: board.light_1_channel,
            light_2: board.light_2_channel,
        }
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use crate::error::PadcarError;

    /// Actuator set that records every call.
    #[derive(Debug, Default)]
    pub struct RecordingActuators {
        pub configured: Vec<(u8, OutputKind)>,
        pub commands: Vec<ActuatorCommand>,
        pub resets: usize,
        pub releases: usize,
        /// Fail `configure` for this channel
        pub fail_configure: Option<u8>,
        /// Fail every command after this many succeeded
        pub fail_after: Option<usize>,
    }

    impl RecordingActuators {
        pub fn new() -> Self {
            Self::default()
        }

        fn record(&mut self, command: ActuatorCommand) -> Result<()> {
            if let Some(limit) = self.fail_after {
                if self.commands.len() >= limit {
                    return Err(PadcarError::Actuator("mock command failure".to_string()));
                }
            }
            self.commands.push(command);
            Ok(())
        }
    }

    impl Release for RecordingActuators {
        fn resource_name(&self) -> &'static str {
            "recording actuators"
        }

        fn release(&mut self) -> Result<()> {
            self.releases += 1;
            Ok(())
        }
    }

    impl Actuators for RecordingActuators {
        fn configure(&mut self, channel: u8, kind: OutputKind) -> Result<()> {
            if self.fail_configure == Some(channel) {
                return Err(PadcarError::Actuator(format!("mock configure failure on {}", channel)));
            }
            self.configured.push((channel, kind));
            Ok(())
        }

        fn set_servo_angle(&mut self, channel: u8, degrees: i32) -> Result<()> {
            self.record(ActuatorCommand::SetServoAngle { channel, degrees })
        }

        fn set_digital_output(&mut self, channel: u8, on: bool) -> Result<()> {
            self.record(ActuatorCommand::SetDigitalOutput { channel, on })
        }

        fn set_motor_speed(&mut self, channel: u8, speed: f32) -> Result<()> {
            self.record(ActuatorCommand::SetMotorSpeed { channel, speed })
        }

        fn reset(&mut self) -> Result<()> {
            self.resets += 1;
            Ok(())
        }
    }
}
