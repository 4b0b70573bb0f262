//! # Picon Zero Driver
//!
//! 4tronix Picon Zero motor/output board on the Raspberry Pi I2C bus.
//!
//! ## Register Map
//!
//! | Register | Meaning | Value |
//! |----------|---------|-------|
//! | 0, 1 | Motor A, B speed | signed byte, -127..=127 |
//! | 2 + n | Output n mode | 0 digital, 1 PWM, 2 servo, 3 WS2812B |
//! | 8 + n | Output n value | 0/1 (digital), degrees 0..=180 (servo) |
//! | 20 | Board reset | any |
//!
//! Every write is a single SMBus "write byte data" transaction.

use rppal::i2c::I2c;
use tracing::{debug, info};

use super::{Actuators, OutputKind};
use crate::config::{BoardConfig, MOTOR_CHANNELS, OUTPUT_CHANNELS};
use crate::control::range::saturate;
use crate::error::{PadcarError, Result};
use crate::lifecycle::Release;

/// Motor A speed register; motor B is the next one
const REG_MOTOR_BASE: u8 = 0;
/// Output 0 mode register
const REG_OUTPUT_CONFIG_BASE: u8 = 2;
/// Output 0 value register
const REG_OUTPUT_VALUE_BASE: u8 = 8;
/// Board reset register
const REG_RESET: u8 = 20;

/// Output mode: on/off
const MODE_DIGITAL: u8 = 0;
/// Output mode: servo
const MODE_SERVO: u8 = 2;

/// Largest motor register magnitude
pub const MAX_MOTOR_VALUE: f32 = 127.0;

/// Servo centre position in degrees when none is configured
pub const SERVO_CENTRE: u8 = 90;

/// Largest servo angle in degrees
pub const SERVO_MAX_ANGLE: i32 = 180;

/// Register-level access to the board
pub trait RegisterBus {
    /// Writes `value` to `register`.
    fn write_register(&mut self, register: u8, value: u8) -> Result<()>;
}

/// SMBus "write byte data" on the Raspberry Pi bus; failures become `Actuator`.
impl RegisterBus for I2c {
    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.smbus_write_byte(register, value).map_err(|e| {
            PadcarError::Actuator(format!("I2C write of register {} failed: {}", register, e))
        })
    }
}

/// Converts a motor speed into the signed register byte.
#[must_use]
pub fn motor_register_value(speed: f32) -> u8 {
    let value = (saturate(speed) * MAX_MOTOR_VALUE).round() as i8;
    value as u8
}

/// Configured steering centre as a servo register value.
fn servo_centre_from(config: &BoardConfig) -> Result<u8> {
    u8::try_from(config.servo_center_deg)
        .ok()
        .filter(|degrees| i32::from(*degrees) <= SERVO_MAX_ANGLE)
        .ok_or_else(|| {
            PadcarError::Actuator(format!(
                "servo centre {} outside 0..={}",
                config.servo_center_deg, SERVO_MAX_ANGLE
            ))
        })
}

/// Picon Zero board handle
pub struct PiconZero<B: RegisterBus> {
    bus: B,
    outputs: [Option<OutputKind>; OUTPUT_CHANNELS as usize],
    /// Angle servos return to on `reset`
    servo_centre: u8,
    released: bool,
}

impl<B: RegisterBus> std::fmt::Debug for PiconZero<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiconZero")
            .field("outputs", &self.outputs)
            .field("servo_centre", &self.servo_centre)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl PiconZero<I2c> {
    /// Opens the board on the configured I2C bus and address.
    ///
    /// Servos are reset to `servo_center_deg`.
    ///
    /// # Errors
    ///
    /// Returns `Actuator` if the bus cannot be opened or the servo centre is
    /// not a valid angle.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use padcar::actuator::picon_zero::PiconZero;
    /// use padcar::config::BoardConfig;
    ///
    /// let board = PiconZero::open(&BoardConfig::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &BoardConfig) -> Result<Self> {
        let servo_centre = servo_centre_from(config)?;
        let mut i2c = I2c::with_bus(config.i2c_bus).map_err(|e| {
            PadcarError::Actuator(format!("Failed to open I2C bus {}: {}", config.i2c_bus, e))
        })?;
        i2c.set_slave_address(config.address).map_err(|e| {
            PadcarError::Actuator(format!("Failed to select address 0x{:02x}: {}", config.address, e))
        })?;

        info!(
            "Opened Picon Zero on I2C bus {} at 0x{:02x}",
            config.i2c_bus, config.address
        );
        Ok(Self::with_bus(i2c).with_servo_centre(servo_centre))
    }
}

impl<B: RegisterBus> PiconZero<B> {
    /// Wraps an already opened register bus.
    pub fn with_bus(bus: B) -> Self {
        Self {
            bus,
            outputs: [None; OUTPUT_CHANNELS as usize],
            servo_centre: SERVO_CENTRE,
            released: false,
        }
    }

    /// Sets the angle servos return to on `reset`.
    #[must_use]
    pub fn with_servo_centre(mut self, degrees: u8) -> Self {
        self.servo_centre = degrees;
        self
    }

    fn ensure_open(&self) -> Result<()> {
        if self.released {
            return Err(PadcarError::Actuator("board already released".to_string()));
        }
        Ok(())
    }

    fn ensure_output(&self, channel: u8, kind: OutputKind) -> Result<()> {
        self.ensure_open()?;
        match self.outputs.get(channel as usize) {
            Some(Some(configured)) if *configured == kind => Ok(()),
            Some(_) => Err(PadcarError::Actuator(format!(
                "output {} is not configured as {:?}",
                channel, kind
            ))),
            None => Err(PadcarError::Actuator(format!("output {} does not exist", channel))),
        }
    }

    fn ensure_motor(&self, channel: u8) -> Result<()> {
        self.ensure_open()?;
        if channel >= MOTOR_CHANNELS {
            return Err(PadcarError::Actuator(format!("motor {} does not exist", channel)));
        }
        Ok(())
    }
}

impl<B: RegisterBus> Release for PiconZero<B> {
    fn resource_name(&self) -> &'static str {
        "Picon Zero"
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.outputs = [None; OUTPUT_CHANNELS as usize];
        self.bus.write_register(REG_RESET, 0)
    }
}

impl<B: RegisterBus> Actuators for PiconZero<B> {
    fn configure(&mut self, channel: u8, kind: OutputKind) -> Result<()> {
        let mode = match kind {
            OutputKind::Motor => {
                // Motors have dedicated registers and need no mode
                self.ensure_motor(channel)?;
                debug!("Motor {} ready", channel);
                return Ok(());
            }
            OutputKind::Digital => MODE_DIGITAL,
            OutputKind::Servo => MODE_SERVO,
        };

        self.ensure_open()?;
        if channel >= OUTPUT_CHANNELS {
            return Err(PadcarError::Actuator(format!("output {} does not exist", channel)));
        }

        self.bus.write_register(REG_OUTPUT_CONFIG_BASE + channel, mode)?;
        self.outputs[channel as usize] = Some(kind);
        debug!("Output {} configured as {:?}", channel, kind);
        Ok(())
    }

    fn set_servo_angle(&mut self, channel: u8, degrees: i32) -> Result<()> {
        self.ensure_output(channel, OutputKind::Servo)?;
        let angle = u8::try_from(degrees)
            .ok()
            .filter(|angle| i32::from(*angle) <= SERVO_MAX_ANGLE)
            .ok_or_else(|| {
                PadcarError::Actuator(format!("servo angle {} outside 0..={}", degrees, SERVO_MAX_ANGLE))
            })?;
        self.bus.write_register(REG_OUTPUT_VALUE_BASE + channel, angle)
    }

    fn set_digital_output(&mut self, channel: u8, on: bool) -> Result<()> {
        self.ensure_output(channel, OutputKind::Digital)?;
        self.bus.write_register(REG_OUTPUT_VALUE_BASE + channel, u8::from(on))
    }

    fn set_motor_speed(&mut self, channel: u8, speed: f32) -> Result<()> {
        self.ensure_motor(channel)?;
        self.bus
            .write_register(REG_MOTOR_BASE + channel, motor_register_value(speed))
    }

    fn reset(&mut self) -> Result<()> {
        self.ensure_open()?;
        for motor in 0..MOTOR_CHANNELS {
            self.bus.write_register(REG_MOTOR_BASE + motor, 0)?;
        }
        for (channel, kind) in self.outputs.into_iter().enumerate() {
            let register = REG_OUTPUT_VALUE_BASE + channel as u8;
            match kind {
                Some(OutputKind::Digital) => self.bus.write_register(register, 0)?,
                Some(OutputKind::Servo) => self.bus.write_register(register, self.servo_centre)?,
                _ => {}
            }
        }
        debug!("Picon Zero outputs reset");
        Ok(())
    }
}
