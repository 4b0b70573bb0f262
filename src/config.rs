//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below, which describe the stock car wiring (steering servo on
//! output 0, lights on outputs 3 and 4, drive motor on motor B).

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::controller::profile::{PadButton, StickAxis};
use crate::error::{PadcarError, Result};

/// Number of output channels on the Picon Zero
pub const OUTPUT_CHANNELS: u8 = 6;

/// Number of motor channels on the Picon Zero
pub const MOTOR_CHANNELS: u8 = 2;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub controls: ControlsConfig,
    pub board: BoardConfig,
    pub startup: StartupConfig,
    pub safety: SafetyConfig,
    pub power: PowerConfig,
    pub logging: LoggingConfig,
}

/// Input device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_device_dir")]
    pub device_dir: String,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Binding of physical controls to vehicle functions
#[derive(Debug, Deserialize, Clone)]
pub struct ControlsConfig {
    #[serde(default = "default_steering_axis")]
    pub steering_axis: StickAxis,

    #[serde(default = "default_throttle_axis")]
    pub throttle_axis: StickAxis,

    /// Negate the throttle axis before driving the motor. Linux joysticks
    /// report stick-forward as negative, so `true` makes forward drive forward.
    #[serde(default = "default_invert_throttle")]
    pub invert_throttle: bool,

    #[serde(default = "default_light_1_button")]
    pub light_1_button: PadButton,

    #[serde(default = "default_light_2_button")]
    pub light_2_button: PadButton,

    #[serde(default = "default_exit_button")]
    pub exit_button: PadButton,

    #[serde(default = "default_shutdown_button")]
    pub shutdown_button: PadButton,

    #[serde(default = "default_shutdown_hold_ms")]
    pub shutdown_hold_ms: u64,

    #[serde(default = "default_stick_deadzone")]
    pub stick_deadzone: f32,
}

/// Picon Zero board wiring
#[derive(Debug, Deserialize, Clone)]
pub struct BoardConfig {
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: u8,

    #[serde(default = "default_address")]
    pub address: u16,

    #[serde(default = "default_motor_channel")]
    pub motor_channel: u8,

    #[serde(default = "default_servo_channel")]
    pub servo_channel: u8,

    #[serde(default = "default_light_1_channel")]
    pub light_1_channel: u8,

    #[serde(default = "default_light_2_channel")]
    pub light_2_channel: u8,

    #[serde(default = "default_servo_center_deg")]
    pub servo_center_deg: i32,

    #[serde(default = "default_servo_max_deflection_deg")]
    pub servo_max_deflection_deg: i32,
}

/// Hardware checks run once before the control loop starts
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    #[serde(default)]
    pub test_servo: bool,

    #[serde(default)]
    pub test_lights: bool,

    #[serde(default = "default_test_step_ms")]
    pub test_step_ms: u64,
}

/// Safety configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SafetyConfig {
    /// Reset all actuators when the active controller disappears
    #[serde(default)]
    pub reset_on_disconnect: bool,
}

/// Power-off command configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PowerConfig {
    #[serde(default = "default_power_command")]
    pub command: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for a daily rolling log file; empty logs to stdout only
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_device_dir() -> String { "/dev/input".to_string() }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_steering_axis() -> StickAxis { StickAxis::LeftStickX }
fn default_throttle_axis() -> StickAxis { StickAxis::RightStickY }
fn default_invert_throttle() -> bool { true }
fn default_light_1_button() -> PadButton { PadButton::West }
fn default_light_2_button() -> PadButton { PadButton::South }
fn default_exit_button() -> PadButton { PadButton::Start }
fn default_shutdown_button() -> PadButton { PadButton::East }
fn default_shutdown_hold_ms() -> u64 { 4000 }
fn default_stick_deadzone() -> f32 { 0.0 }

fn default_i2c_bus() -> u8 { 1 }
fn default_address() -> u16 { 0x22 }
fn default_motor_channel() -> u8 { 1 }
fn default_servo_channel() -> u8 { 0 }
fn default_light_1_channel() -> u8 { 3 }
fn default_light_2_channel() -> u8 { 4 }
fn default_servo_center_deg() -> i32 { 90 }
fn default_servo_max_deflection_deg() -> i32 { 80 }

fn default_test_step_ms() -> u64 { 1000 }

fn default_power_command() -> Vec<String> {
    vec!["sudo".to_string(), "poweroff".to_string()]
}

fn default_log_level() -> String { "info".to_string() }

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_dir: default_device_dir(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            steering_axis: default_steering_axis(),
            throttle_axis: default_throttle_axis(),
            invert_throttle: default_invert_throttle(),
            light_1_button: default_light_1_button(),
            light_2_button: default_light_2_button(),
            exit_button: default_exit_button(),
            shutdown_button: default_shutdown_button(),
            shutdown_hold_ms: default_shutdown_hold_ms(),
            stick_deadzone: default_stick_deadzone(),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            address: default_address(),
            motor_channel: default_motor_channel(),
            servo_channel: default_servo_channel(),
            light_1_channel: default_light_1_channel(),
            light_2_channel: default_light_2_channel(),
            servo_center_deg: default_servo_center_deg(),
            servo_max_deflection_deg: default_servo_max_deflection_deg(),
        }
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            test_servo: false,
            test_lights: false,
            test_step_ms: default_test_step_ms(),
        }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            command: default_power_command(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> PadcarError {
    PadcarError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use padcar::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.input.device_dir.is_empty() {
            return Err(invalid("input device_dir cannot be empty"));
        }

        if self.input.reconnect_interval_ms == 0 || self.input.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        if self.controls.shutdown_hold_ms == 0 || self.controls.shutdown_hold_ms > 60000 {
            return Err(invalid("shutdown_hold_ms must be between 1 and 60000"));
        }

        if !(0.0..=0.25).contains(&self.controls.stick_deadzone) {
            return Err(invalid("stick_deadzone must be between 0.0 and 0.25"));
        }

        if self.controls.steering_axis == self.controls.throttle_axis {
            return Err(invalid("steering_axis and throttle_axis must be different"));
        }

        let buttons = [
            ("light_1_button", self.controls.light_1_button),
            ("light_2_button", self.controls.light_2_button),
            ("exit_button", self.controls.exit_button),
            ("shutdown_button", self.controls.shutdown_button),
        ];
        for (i, (name, button)) in buttons.iter().enumerate() {
            if let Some((other, _)) = buttons[i + 1..].iter().find(|(_, b)| b == button) {
                return Err(invalid(format!("{} and {} are bound to the same button", name, other)));
            }
        }

        if self.board.address > 0x7F {
            return Err(invalid("board address must be a 7-bit I2C address"));
        }

        if self.board.motor_channel >= MOTOR_CHANNELS {
            return Err(invalid(format!("motor_channel must be between 0 and {}", MOTOR_CHANNELS - 1)));
        }

        let outputs = [
            ("servo_channel", self.board.servo_channel),
            ("light_1_channel", self.board.light_1_channel),
            ("light_2_channel", self.board.light_2_channel),
        ];
        for (name, channel) in outputs {
            if channel >= OUTPUT_CHANNELS {
                return Err(invalid(format!(
                    "{} {} is out of bounds (must be 0-{})",
                    name,
                    channel,
                    OUTPUT_CHANNELS - 1
                )));
            }
        }
        if outputs[0].1 == outputs[1].1 || outputs[0].1 == outputs[2].1 || outputs[1].1 == outputs[2].1 {
            return Err(invalid("servo and light channels must be distinct"));
        }

        if self.board.servo_max_deflection_deg < 0 {
            return Err(invalid("servo_max_deflection_deg cannot be negative"));
        }

        let low = self.board.servo_center_deg - self.board.servo_max_deflection_deg;
        let high = self.board.servo_center_deg + self.board.servo_max_deflection_deg;
        if low < 0 || high > 180 {
            return Err(invalid("servo_center_deg +/- servo_max_deflection_deg must stay within 0..=180"));
        }

        if self.startup.test_step_ms > 10000 {
            return Err(invalid("test_step_ms must be at most 10000"));
        }

        if self.power.command.first().map_or(true, |program| program.is_empty()) {
            return Err(invalid("power command cannot be empty"));
        }

        if self.logging.level.is_empty() {
            return Err(invalid("logging level cannot be empty"));
        }

        Ok(())
    }
}
